use std::time::Duration;

use anyhow::Context as _;

pub const DEFAULT_API_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_WORKSPACE_DOMAIN: &str = "notion.so";

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub database_id: String,
    pub api_base_url: String,
    pub workspace_domain: String,
    pub list_ttl: Duration,
    pub detail_capacity: usize,
    pub detail_ttl: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("api_base_url", &self.api_base_url)
            .field("workspace_domain", &self.workspace_domain)
            .field("list_ttl", &self.list_ttl)
            .field("detail_capacity", &self.detail_capacity)
            .field("detail_ttl", &self.detail_ttl)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_key = required(&lookup, "NOTION_API_KEY")?;
        let database_id = required(&lookup, "NOTION_THINGS_DATABASE_ID")?;

        let api_base_url = optional(&lookup, "NOTION_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        url::Url::parse(&api_base_url)
            .with_context(|| format!("invalid NOTION_API_BASE_URL={api_base_url:?}"))?;

        let workspace_domain = optional(&lookup, "NOTION_WORKSPACE_DOMAIN")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_WORKSPACE_DOMAIN.to_owned());

        let list_ttl_secs = optional(&lookup, "READSHELF_LIST_TTL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| (60..=86_400).contains(v))
            .unwrap_or(1800);
        let detail_capacity = optional(&lookup, "READSHELF_DETAIL_CAPACITY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| (1..=65_536).contains(v))
            .unwrap_or(crate::lru::DEFAULT_CAPACITY);
        let detail_ttl_secs = optional(&lookup, "READSHELF_DETAIL_TTL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(1800);

        Ok(Self {
            api_key,
            database_id,
            api_base_url,
            workspace_domain,
            list_ttl: Duration::from_secs(list_ttl_secs),
            detail_capacity,
            detail_ttl: Duration::from_secs(detail_ttl_secs),
        })
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<String> {
    optional(lookup, name).with_context(|| format!("{name} is required but not set"))
}
