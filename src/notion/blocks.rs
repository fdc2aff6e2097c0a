use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
}

/// One styled run of text.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl RichText {
    pub fn plain(text: &str) -> Self {
        Self {
            plain_text: text.to_owned(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph(Vec<RichText>),
    Heading { level: u8, text: Vec<RichText> },
    BulletedListItem(Vec<RichText>),
    NumberedListItem(Vec<RichText>),
    ToDo { checked: bool, text: Vec<RichText> },
    Quote(Vec<RichText>),
    Code { language: String, text: Vec<RichText> },
    Image { url: String, caption: Vec<RichText> },
    Divider,
    Callout { emoji: Option<String>, text: Vec<RichText> },
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    pub id: Option<String>,
    /// Nested children exist upstream; they are not fetched.
    pub has_children: bool,
    pub kind: BlockKind,
}

impl ContentBlock {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: None,
            has_children: false,
            kind,
        }
    }

    /// Parses one block object. Unknown or malformed blocks become
    /// [`BlockKind::Unsupported`] carrying the upstream type name.
    pub fn from_value(value: &Value) -> Self {
        let kind_name = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let null = Value::Null;
        let payload = value.get(kind_name).unwrap_or(&null);

        let kind = match kind_name {
            "paragraph" => BlockKind::Paragraph(rich_text(payload, "rich_text")),
            "heading_1" => heading(1, payload),
            "heading_2" => heading(2, payload),
            "heading_3" => heading(3, payload),
            "bulleted_list_item" => BlockKind::BulletedListItem(rich_text(payload, "rich_text")),
            "numbered_list_item" => BlockKind::NumberedListItem(rich_text(payload, "rich_text")),
            "to_do" => BlockKind::ToDo {
                checked: payload
                    .get("checked")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                text: rich_text(payload, "rich_text"),
            },
            "quote" => BlockKind::Quote(rich_text(payload, "rich_text")),
            "code" => BlockKind::Code {
                language: payload
                    .get("language")
                    .and_then(Value::as_str)
                    .unwrap_or("plain text")
                    .to_owned(),
                text: rich_text(payload, "rich_text"),
            },
            "image" => BlockKind::Image {
                url: image_url(payload).unwrap_or_default(),
                caption: rich_text(payload, "caption"),
            },
            "divider" => BlockKind::Divider,
            "callout" => BlockKind::Callout {
                emoji: payload
                    .get("icon")
                    .and_then(|icon| icon.get("emoji"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                text: rich_text(payload, "rich_text"),
            },
            other => BlockKind::Unsupported(other.to_owned()),
        };

        Self {
            id: value.get("id").and_then(Value::as_str).map(str::to_owned),
            has_children: value
                .get("has_children")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            kind,
        }
    }
}

pub fn parse_blocks(values: &[Value]) -> Vec<ContentBlock> {
    values.iter().map(ContentBlock::from_value).collect()
}

fn heading(level: u8, payload: &Value) -> BlockKind {
    BlockKind::Heading {
        level,
        text: rich_text(payload, "rich_text"),
    }
}

fn rich_text(payload: &Value, field: &str) -> Vec<RichText> {
    let Some(spans) = payload.get(field).and_then(Value::as_array) else {
        return Vec::new();
    };
    spans
        .iter()
        .filter_map(|span| match serde_json::from_value::<RichText>(span.clone()) {
            Ok(span) => Some(span),
            Err(err) => {
                tracing::debug!(%err, "skip malformed rich text span");
                None
            }
        })
        .collect()
}

fn image_url(payload: &Value) -> Option<String> {
    let source = payload.get("type").and_then(Value::as_str)?;
    if source != "external" && source != "file" {
        return None;
    }
    payload
        .get(source)?
        .get("url")?
        .as_str()
        .map(str::to_owned)
}
