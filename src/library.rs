use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::books::RecordFetcher;
use crate::cache::{BookCache, ListKey};
use crate::config::Config;
use crate::model::{BookPage, PageContent, Shelf, clamp_page_size};
use crate::notion::blocks::parse_blocks;
use crate::notion::schema::page_title;
use crate::render::Renderer;

/// How a list response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Hit,
    Miss,
    /// Upstream failed; the last known first page was returned.
    Stale,
    /// Upstream failed and nothing was cached.
    Empty,
}

impl Served {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Stale => "stale",
            Self::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub page: BookPage,
    pub served: Served,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Ready(T),
    Cancelled,
}

/// Cache-fronted access to the reading list and page details.
///
/// Constructed once per process and shared by handle.
#[derive(Debug)]
pub struct Library {
    fetcher: RecordFetcher,
    renderer: Renderer,
    cache: Mutex<BookCache>,
}

impl Library {
    pub fn new(fetcher: RecordFetcher, renderer: Renderer, cache: BookCache) -> Self {
        Self {
            fetcher,
            renderer,
            cache: Mutex::new(cache),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = RecordFetcher::from_config(config).context("build record fetcher")?;
        let renderer = Renderer::new(&config.workspace_domain);
        let cache = BookCache::new(config.list_ttl, config.detail_capacity, config.detail_ttl);
        Ok(Self::new(fetcher, renderer, cache))
    }

    pub fn fetcher(&self) -> &RecordFetcher {
        &self.fetcher
    }

    fn cache(&self) -> MutexGuard<'_, BookCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One page of a shelf. Never fails: upstream errors degrade to the last
    /// known first page, or to an empty page.
    pub async fn list_books(
        &self,
        shelf: Shelf,
        page_size: Option<usize>,
        cursor: Option<&str>,
    ) -> ListOutcome {
        let started = Instant::now();
        let page_size = clamp_page_size(page_size);
        let key = ListKey::new(shelf, page_size, cursor);

        let cached = self.cache().get_list(&key);
        if let Some(page) = cached {
            tracing::debug!(%shelf, page_size, cursor = ?key.cursor, "list cache hit");
            return ListOutcome {
                page,
                served: Served::Hit,
            };
        }
        tracing::debug!(%shelf, page_size, cursor = ?key.cursor, "list cache miss");

        let outcome = match self.fetcher.fetch(shelf, page_size, cursor).await {
            Ok(page) => {
                self.cache().set_list(key, page.clone());
                ListOutcome {
                    page,
                    served: Served::Miss,
                }
            }
            Err(err) => {
                let fallback = self.cache().last_known_first_page(shelf, page_size);
                match fallback {
                    Some(page) => {
                        tracing::warn!(
                            %shelf,
                            error = %format!("{err:#}"),
                            "book fetch failed; serving last known first page"
                        );
                        ListOutcome {
                            page,
                            served: Served::Stale,
                        }
                    }
                    None => {
                        tracing::warn!(
                            %shelf,
                            error = %format!("{err:#}"),
                            "book fetch failed; serving empty page"
                        );
                        ListOutcome {
                            page: BookPage::empty(),
                            served: Served::Empty,
                        }
                    }
                }
            }
        };

        tracing::info!(
            %shelf,
            served = outcome.served.as_str(),
            books = outcome.page.books.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "listed books"
        );
        outcome
    }

    /// Title and rendered HTML of one page.
    ///
    /// Page metadata and blocks are requested concurrently. A cancelled token
    /// aborts the fetch and leaves the cache untouched.
    pub async fn page_content(
        &self,
        page_id: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Fetched<PageContent>> {
        if cancel.is_cancelled() {
            return Ok(Fetched::Cancelled);
        }
        let cached = self.cache().get_book_details(page_id);
        if let Some(content) = cached {
            tracing::debug!(page_id, "detail cache hit");
            return Ok(Fetched::Ready(content));
        }

        let client = self.fetcher.client();
        let fetch = async {
            tokio::try_join!(
                client.retrieve_page(page_id),
                client.list_block_children(page_id),
            )
        };
        let (page, children) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(page_id, "detail fetch cancelled");
                return Ok(Fetched::Cancelled);
            }
            res = fetch => res.with_context(|| format!("fetch page {page_id}"))?,
        };

        let blocks = parse_blocks(&children.results);
        let content = PageContent {
            title: page_title(&page),
            content: self.renderer.render(&blocks),
        };

        if cancel.is_cancelled() {
            return Ok(Fetched::Cancelled);
        }
        self.cache().set_book_details(page_id, content.clone());
        Ok(Fetched::Ready(content))
    }

    pub fn clear_list_cache(&self, shelf: Shelf) {
        self.cache().clear_list_cache(shelf);
    }

    pub fn clear_all(&self) {
        self.cache().clear_all();
    }
}

/// Tracks the page currently being viewed; switching pages or closing the
/// session cancels the previous fetch.
#[derive(Debug, Default)]
pub struct DetailSession {
    current: Option<(String, CancellationToken)>,
}

impl DetailSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, page_id: &str) -> CancellationToken {
        self.close();
        let token = CancellationToken::new();
        self.current = Some((page_id.to_owned(), token.clone()));
        token
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|(page_id, _)| page_id.as_str())
    }

    pub fn close(&mut self) {
        if let Some((page_id, token)) = self.current.take() {
            tracing::debug!(%page_id, "cancel detail fetch");
            token.cancel();
        }
    }
}

impl Drop for DetailSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_another_page_cancels_previous_token() {
        let mut session = DetailSession::new();
        let first = session.select("page-a");
        let second = session.select("page-b");

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(session.current(), Some("page-b"));
    }

    #[test]
    fn dropping_session_cancels_current_token() {
        let token = {
            let mut session = DetailSession::new();
            session.select("page-a")
        };
        assert!(token.is_cancelled());
    }

    #[test]
    fn served_labels() {
        assert_eq!(Served::Hit.as_str(), "hit");
        assert_eq!(Served::Stale.as_str(), "stale");
    }
}
