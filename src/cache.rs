use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::lru::LruCache;
use crate::model::{BookPage, PageContent, Shelf};

pub const DEFAULT_LIST_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_DETAIL_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cursor {
    Start,
    At(String),
}

impl Cursor {
    pub fn from_option(cursor: Option<&str>) -> Self {
        match cursor.map(str::trim) {
            None | Some("") => Self::Start,
            Some(cursor) => Self::At(cursor.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub shelf: Shelf,
    pub page_size: usize,
    pub cursor: Cursor,
}

impl ListKey {
    pub fn new(shelf: Shelf, page_size: usize, cursor: Option<&str>) -> Self {
        Self {
            shelf,
            page_size,
            cursor: Cursor::from_option(cursor),
        }
    }
}

#[derive(Debug, Clone)]
struct Stored<T> {
    value: T,
    stored_at: Instant,
}

impl<T> Stored<T> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Process-local cache for list pages and page details.
///
/// List pages expire after `list_ttl`. Details live in an LRU of bounded size
/// and are dropped on read once older than `detail_ttl`.
#[derive(Debug)]
pub struct BookCache {
    lists: HashMap<ListKey, Stored<BookPage>>,
    details: LruCache<String, Stored<PageContent>>,
    list_ttl: Duration,
    detail_ttl: Duration,
}

impl BookCache {
    pub fn new(list_ttl: Duration, detail_capacity: usize, detail_ttl: Duration) -> Self {
        Self {
            lists: HashMap::new(),
            details: LruCache::new(detail_capacity),
            list_ttl,
            detail_ttl,
        }
    }

    pub fn get_list(&self, key: &ListKey) -> Option<BookPage> {
        self.get_list_at(key, Instant::now())
    }

    pub fn get_list_at(&self, key: &ListKey, now: Instant) -> Option<BookPage> {
        self.lists
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.list_ttl))
            .map(|entry| entry.value.clone())
    }

    pub fn set_list(&mut self, key: ListKey, page: BookPage) {
        self.set_list_at(key, page, Instant::now());
    }

    /// Stores `page` and drops expired entries. Expired first pages are kept
    /// for [`Self::last_known_first_page`].
    pub fn set_list_at(&mut self, key: ListKey, page: BookPage, now: Instant) {
        let ttl = self.list_ttl;
        self.lists
            .retain(|stored, entry| stored.cursor == Cursor::Start || entry.is_fresh(now, ttl));
        self.lists.insert(
            key,
            Stored {
                value: page,
                stored_at: now,
            },
        );
    }

    /// Last stored first page for `shelf`, ignoring expiry.
    ///
    /// Prefers the entry with the same page size and falls back to any page size.
    pub fn last_known_first_page(&self, shelf: Shelf, page_size: usize) -> Option<BookPage> {
        let exact = ListKey::new(shelf, page_size, None);
        if let Some(entry) = self.lists.get(&exact) {
            return Some(entry.value.clone());
        }
        self.lists
            .iter()
            .filter(|(key, _)| key.shelf == shelf && key.cursor == Cursor::Start)
            .max_by_key(|(_, entry)| entry.stored_at)
            .map(|(_, entry)| entry.value.clone())
    }

    pub fn get_book_details(&mut self, page_id: &str) -> Option<PageContent> {
        self.get_book_details_at(page_id, Instant::now())
    }

    pub fn get_book_details_at(&mut self, page_id: &str, now: Instant) -> Option<PageContent> {
        let key = page_id.to_owned();
        let ttl = self.detail_ttl;
        let fresh = self
            .details
            .get(&key)
            .map(|entry| (entry.is_fresh(now, ttl), entry.value.clone()))?;
        match fresh {
            (true, content) => Some(content),
            (false, _) => {
                self.details.delete(&key);
                None
            }
        }
    }

    pub fn set_book_details(&mut self, page_id: &str, content: PageContent) {
        self.set_book_details_at(page_id, content, Instant::now());
    }

    pub fn set_book_details_at(&mut self, page_id: &str, content: PageContent, now: Instant) {
        self.details.set(
            page_id.to_owned(),
            Stored {
                value: content,
                stored_at: now,
            },
        );
    }

    pub fn clear_list_cache(&mut self, shelf: Shelf) {
        self.lists.retain(|key, _| key.shelf != shelf);
    }

    pub fn clear_all(&mut self) {
        self.lists.clear();
        self.details.clear();
    }

    pub fn list_len(&self) -> usize {
        self.lists.len()
    }

    pub fn details_len(&self) -> usize {
        self.details.len()
    }
}

impl Default for BookCache {
    fn default() -> Self {
        Self::new(
            DEFAULT_LIST_TTL,
            crate::lru::DEFAULT_CAPACITY,
            DEFAULT_DETAIL_TTL,
        )
    }
}
