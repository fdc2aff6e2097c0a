use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;

pub const NOTION_VERSION: &str = "2022-06-28";
pub const BLOCK_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl NotionClient {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build notion http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.api_base_url, &config.api_key)
    }

    pub async fn query_database(
        &self,
        database_id: &str,
        body: &Value,
    ) -> anyhow::Result<QueryResponse> {
        let endpoint = format!("{}/databases/{database_id}/query", self.base_url);
        let request = self.http.post(&endpoint).json(body);
        let raw = self.send(request, &endpoint).await?;
        serde_json::from_str(&raw).context("parse database query response")
    }

    pub async fn retrieve_page(&self, page_id: &str) -> anyhow::Result<Value> {
        let endpoint = format!("{}/pages/{page_id}", self.base_url);
        let request = self.http.get(&endpoint);
        let raw = self.send(request, &endpoint).await?;
        serde_json::from_str(&raw).context("parse page response")
    }

    pub async fn list_block_children(&self, block_id: &str) -> anyhow::Result<QueryResponse> {
        let endpoint = format!("{}/blocks/{block_id}/children", self.base_url);
        let request = self
            .http
            .get(&endpoint)
            .query(&[("page_size", BLOCK_PAGE_SIZE)]);
        let raw = self.send(request, &endpoint).await?;
        serde_json::from_str(&raw).context("parse block children response")
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> anyhow::Result<String> {
        let response = request
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .with_context(|| format!("request {endpoint}"))?;

        let status = response.status();
        let raw = response.text().await.context("read notion response body")?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            anyhow::bail!("Notion API error ({status}): {message}");
        }
        Ok(raw)
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("message")?.as_str()?;
    match value.get("code").and_then(Value::as_str) {
        Some(code) => Some(format!("{code}: {message}")),
        None => Some(message.to_owned()),
    }
}
