use anyhow::Context as _;

use crate::config::Config;
use crate::model::{BookPage, MAX_PAGE_SIZE, Shelf};
use crate::notion::NotionClient;
use crate::notion::schema::{book_from_page, query_body};

/// Guards `fetch_all` against an upstream that never reports the last page.
const MAX_PAGES_PER_WALK: usize = 1000;

/// Queries the reading-list database and normalizes its pages into books.
#[derive(Debug, Clone)]
pub struct RecordFetcher {
    client: NotionClient,
    database_id: String,
}

impl RecordFetcher {
    pub fn new(client: NotionClient, database_id: &str) -> Self {
        Self {
            client,
            database_id: database_id.trim().to_owned(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = NotionClient::from_config(config)?;
        Ok(Self::new(client, &config.database_id))
    }

    pub fn client(&self) -> &NotionClient {
        &self.client
    }

    /// One page of books. The upstream cursor is passed through untouched.
    pub async fn fetch(
        &self,
        shelf: Shelf,
        page_size: usize,
        cursor: Option<&str>,
    ) -> anyhow::Result<BookPage> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let body = query_body(shelf, page_size, cursor);
        let response = self
            .client
            .query_database(&self.database_id, &body)
            .await
            .with_context(|| format!("query {shelf} books"))?;

        let books = response
            .results
            .iter()
            .filter_map(book_from_page)
            .collect::<Vec<_>>();
        let next_cursor = if response.has_more {
            response.next_cursor
        } else {
            None
        };
        tracing::debug!(
            %shelf,
            page_size,
            books = books.len(),
            has_more = response.has_more,
            "fetched book page"
        );

        Ok(BookPage {
            books,
            has_more: response.has_more && next_cursor.is_some(),
            next_cursor,
        })
    }

    /// Follows cursors until the upstream reports no more pages.
    pub async fn fetch_all(&self, shelf: Shelf) -> anyhow::Result<BookPage> {
        let mut books = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES_PER_WALK {
            let page = self.fetch(shelf, MAX_PAGE_SIZE, cursor.as_deref()).await?;
            books.extend(page.books);
            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => {
                    return Ok(BookPage {
                        books,
                        has_more: false,
                        next_cursor: None,
                    });
                }
            }
        }
        anyhow::bail!("upstream kept reporting more pages after {MAX_PAGES_PER_WALK} requests")
    }
}
