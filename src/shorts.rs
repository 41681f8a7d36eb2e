//! Shorts (short video) feed
//!
//! [`ShortsClient`] fetches single pages of the paginated feed through the
//! session's dispatcher. [`ShortsFeed`] walks that feed one item at a time
//! and loads the next page ahead of time, once the cursor comes within
//! `prefetch_threshold` items of the end of what is loaded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::dispatcher::RequestDispatcher;
use crate::http::request::PendingRequest;

/// A single short video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Short {
    pub id: u64,
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortsPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<Short>,
}

/// Fetches feed pages.
#[derive(Clone)]
pub struct ShortsClient {
    dispatcher: Arc<RequestDispatcher>,
    path: String,
}

impl ShortsClient {
    pub fn new(dispatcher: Arc<RequestDispatcher>, path: impl Into<String>) -> Self {
        Self {
            dispatcher,
            path: path.into(),
        }
    }

    /// Fetches page `page` (1-based).
    pub async fn page(&self, page: u32) -> Result<ShortsPage> {
        tracing::debug!("Fetching shorts page {}", page);
        self.dispatcher
            .send_json(PendingRequest::get(&self.path).query("page", page))
            .await
    }
}

/// Cursor over the whole feed.
pub struct ShortsFeed {
    client: ShortsClient,
    items: Vec<Short>,
    position: usize,
    next_page: Option<u32>,
    prefetch_threshold: usize,
}

impl ShortsFeed {
    pub fn new(client: ShortsClient, prefetch_threshold: usize) -> Self {
        Self {
            client,
            items: Vec::new(),
            position: 0,
            next_page: Some(1),
            prefetch_threshold,
        }
    }

    /// Item under the cursor, `None` until something is loaded.
    pub fn current(&self) -> Option<&Short> {
        self.items.get(self.position)
    }

    /// Zero-based cursor position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of items loaded so far.
    pub fn loaded(&self) -> usize {
        self.items.len()
    }

    /// `false` once the last page has been loaded.
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Loads the first page if nothing is loaded yet and returns the
    /// current item.
    pub async fn start(&mut self) -> Result<Option<&Short>> {
        if self.items.is_empty() && self.has_more() {
            self.load_next().await?;
            self.prefetch().await?;
        }
        Ok(self.current())
    }

    /// Moves to the next item, loading pages as needed.
    ///
    /// At the end of the feed the cursor stays on the last item.
    pub async fn advance(&mut self) -> Result<Option<&Short>> {
        if self.items.is_empty() {
            return self.start().await;
        }
        // Pages may come back empty; keep loading until there is a next
        // item or the feed ends.
        while self.position + 1 >= self.items.len() && self.has_more() {
            self.load_next().await?;
        }
        if self.position + 1 < self.items.len() {
            self.position += 1;
        }
        self.prefetch().await?;
        Ok(self.current())
    }

    /// Moves to the previous item; never goes before the first one.
    pub fn back(&mut self) -> Option<&Short> {
        self.position = self.position.saturating_sub(1);
        self.current()
    }

    async fn prefetch(&mut self) -> Result<()> {
        let remaining = self.items.len().saturating_sub(self.position + 1);
        if remaining < self.prefetch_threshold && self.has_more() {
            self.load_next().await?;
        }
        Ok(())
    }

    async fn load_next(&mut self) -> Result<()> {
        let Some(page_number) = self.next_page else {
            return Ok(());
        };
        let page = self.client.page(page_number).await?;
        self.next_page = page.next.as_ref().map(|_| page_number + 1);
        tracing::debug!(
            "Loaded shorts page {} ({} items, more: {})",
            page_number,
            page.results.len(),
            self.next_page.is_some()
        );
        self.items.extend(page.results);
        Ok(())
    }
}
