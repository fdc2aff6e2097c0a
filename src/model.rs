use chrono::{DateTime, Datelike as _, FixedOffset};
use serde::{Deserialize, Serialize};

pub const UNTITLED: &str = "Untitled";
pub const DATE_NOT_SET: &str = "未设置";

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Reading,
    Finished,
    Archived,
    None,
}

impl BookStatus {
    /// Maps the select label used in the reading-list database.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "进行" => Self::Reading,
            "完成" => Self::Finished,
            "归档" => Self::Archived,
            _ => Self::None,
        }
    }
}

/// The status filter a list request asks for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Shelf {
    Reading,
    #[default]
    Finished,
}

impl Shelf {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reading" => Ok(Self::Reading),
            "" | "finished" => Ok(Self::Finished),
            other => anyhow::bail!("unsupported status: {other}"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reading => "reading",
            Self::Finished => "finished",
        }
    }

    /// Upstream select labels matched by this shelf.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Reading => &["进行"],
            Self::Finished => &["完成", "归档"],
        }
    }
}

impl std::fmt::Display for Shelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: Option<String>,
    pub name: String,
    pub authors: Vec<String>,
    pub category: String,
    pub url: Option<String>,
    pub cover_url: Option<String>,
    pub status: BookStatus,
    pub rating: Option<String>,
    pub rating_date: Option<DateTime<FixedOffset>>,
}

impl BookRecord {
    pub fn untitled(id: Option<String>) -> Self {
        Self {
            id,
            name: UNTITLED.to_owned(),
            authors: Vec::new(),
            category: String::new(),
            url: None,
            cover_url: None,
            status: BookStatus::None,
            rating: None,
            rating_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub books: Vec<BookRecord>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl BookPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    pub content: String,
}

/// Clamps a requested page size to `1..=MAX_PAGE_SIZE`; `None` and zero use the default.
pub fn clamp_page_size(requested: Option<usize>) -> usize {
    match requested {
        Some(0) | None => DEFAULT_PAGE_SIZE,
        Some(n) => n.min(MAX_PAGE_SIZE),
    }
}

/// `YYYY/M/D` in the date's own offset.
pub fn format_date(date: Option<&DateTime<FixedOffset>>) -> String {
    match date {
        Some(date) => format!("{}/{}/{}", date.year(), date.month(), date.day()),
        None => DATE_NOT_SET.to_owned(),
    }
}
