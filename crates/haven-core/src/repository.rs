//! Paged, cached list of conversation summaries.
//!
//! The accumulated list only ever grows (page 1 replaces it wholesale
//! on refresh); a failed fetch leaves it untouched. One fetch may be in
//! flight at a time; a call arriving while one is pending is coalesced
//! into a no-op. State lives behind `Cell`/`RefCell` so overlapping
//! futures can share the repository through `&self`.

use std::cell::{Cell, RefCell};

use haven_types::conversation::ConversationSummary;
use haven_types::{ChatError, Result};
use serde_json::Value;

use crate::ports::{Method, TransportPort};

pub struct ConversationRepository {
    conversations: RefCell<Vec<ConversationSummary>>,
    api_base: String,
    page_size: usize,
    /// Next page to fetch; pages are 1-based.
    next_page: Cell<u32>,
    /// Set once the backend returns an empty page.
    exhausted: Cell<bool>,
    in_flight: Cell<bool>,
}

impl ConversationRepository {
    pub fn new(api_base: impl Into<String>, page_size: usize) -> Self {
        Self {
            conversations: RefCell::new(Vec::new()),
            api_base: api_base.into(),
            page_size,
            next_page: Cell::new(1),
            exhausted: Cell::new(false),
            in_flight: Cell::new(false),
        }
    }

    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.conversations.borrow().clone()
    }

    pub fn total(&self) -> usize {
        self.conversations.borrow().len()
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted.get()
    }

    /// Fetch one page. Page 1 replaces the cached list; later pages merge
    /// into it, deduplicating by id. Returns how many entries the page
    /// contained (zero once the list is exhausted, and zero without any
    /// traffic when another fetch is already in flight).
    pub async fn list_page(
        &self,
        transport: &dyn TransportPort,
        token: Option<&str>,
        page: u32,
    ) -> Result<usize> {
        if self.in_flight.get() {
            log::debug!("conversation fetch coalesced (page {} already pending)", page);
            return Ok(0);
        }
        self.in_flight.set(true);
        let result = self.fetch_page(transport, token, page).await;
        self.in_flight.set(false);

        let items = result?;
        let count = items.len();
        if count == 0 {
            self.exhausted.set(true);
        }

        let mut cached = self.conversations.borrow_mut();
        if page == 1 {
            *cached = items;
        } else {
            let fresh: Vec<ConversationSummary> = items
                .into_iter()
                .filter(|c| !cached.iter().any(|have| have.id == c.id))
                .collect();
            cached.extend(fresh);
        }
        cached.sort_by(ConversationSummary::list_ordering);
        drop(cached);
        self.next_page.set(page + 1);

        Ok(count)
    }

    /// Advance the cursor and fetch the next page. Returns `true` when new
    /// entries arrived, `false` once the list is exhausted.
    pub async fn load_more(
        &self,
        transport: &dyn TransportPort,
        token: Option<&str>,
    ) -> Result<bool> {
        if self.exhausted.get() {
            log::debug!("load_more after final page is a no-op");
            return Ok(false);
        }
        let added = self.list_page(transport, token, self.next_page.get()).await?;
        Ok(added > 0)
    }

    /// Start over from page 1, keeping the current cache until the fetch
    /// succeeds.
    pub async fn refresh(
        &self,
        transport: &dyn TransportPort,
        token: Option<&str>,
    ) -> Result<usize> {
        self.exhausted.set(false);
        self.list_page(transport, token, 1).await
    }

    async fn fetch_page(
        &self,
        transport: &dyn TransportPort,
        token: Option<&str>,
        page: u32,
    ) -> Result<Vec<ConversationSummary>> {
        let path = format!(
            "{}/conversations?page={}&per_page={}",
            self.api_base, page, self.page_size
        );
        let resp = transport.request(Method::Get, &path, token, None).await?;

        if resp.status == 401 {
            return Err(ChatError::Auth(resp.message()));
        }
        if !resp.is_success() {
            return Err(ChatError::Fetch(resp.message()));
        }

        let items = resp
            .body
            .get("conversations")
            .cloned()
            .unwrap_or(Value::Null);
        serde_json::from_value(items)
            .map_err(|e| ChatError::Fetch(format!("malformed conversation list: {}", e)))
    }
}
