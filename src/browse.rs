//! Browsing state for one viewer: filters, search text, current page, and the
//! bookkeeping needed to ignore answers that arrive after a newer request.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::catalog::{CatalogApi, CatalogResult, ContentType, FilterSelection, MAX_PAGE};
use crate::models::{Genre, QueryResult, Title};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Hands out increasing tickets; only the most recent one is current.
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    List(FilterSelection),
    Search {
        query: String,
        content_type: ContentType,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseRequest {
    pub ticket: Ticket,
    pub page: u32,
    pub kind: RequestKind,
}

impl BrowseRequest {
    pub async fn run(&self, catalog: &dyn CatalogApi) -> CatalogResult<QueryResult> {
        match &self.kind {
            RequestKind::List(filters) => catalog.list(self.page, filters).await,
            RequestKind::Search {
                query,
                content_type,
            } => catalog.search(query, self.page, *content_type).await,
        }
    }
}

#[derive(Debug)]
pub struct BrowseSession {
    filters: FilterSelection,
    query: String,
    page: u32,
    known_pages: Option<u32>,
    sequence: RequestSequence,
    results: Vec<Title>,
    error: Option<String>,
}

impl Default for BrowseSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowseSession {
    pub fn new() -> Self {
        Self {
            filters: FilterSelection::default(),
            query: String::new(),
            page: 1,
            known_pages: None,
            sequence: RequestSequence::default(),
            results: Vec::new(),
            error: None,
        }
    }

    pub fn filters(&self) -> &FilterSelection {
        &self.filters
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page count from the last accepted answer, already capped.
    pub fn total_pages(&self) -> Option<u32> {
        self.known_pages
    }

    pub fn results(&self) -> &[Title] {
        &self.results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_filters(&mut self, filters: FilterSelection) {
        self.filters = filters;
        self.restart();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.restart();
    }

    /// Moves to `page`, clamped to what the provider will actually serve.
    pub fn set_page(&mut self, page: u32) {
        let last = self
            .known_pages
            .map(|p| p.clamp(1, MAX_PAGE))
            .unwrap_or(MAX_PAGE);
        self.page = page.clamp(1, last);
    }

    pub fn has_next_page(&self) -> bool {
        match self.known_pages {
            Some(total) => self.page < total,
            None => false,
        }
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn next_request(&mut self) -> BrowseRequest {
        let ticket = self.sequence.issue();
        let kind = if self.query.trim().is_empty() {
            RequestKind::List(self.filters.clone())
        } else {
            RequestKind::Search {
                query: self.query.clone(),
                content_type: self.filters.content_type,
            }
        };
        BrowseRequest {
            ticket,
            page: self.page,
            kind,
        }
    }

    /// Takes the answer for `ticket` if it is still the newest request.
    /// Returns `false` and leaves state untouched for stale answers.
    pub fn apply(&mut self, ticket: Ticket, result: CatalogResult<QueryResult>) -> bool {
        if !self.sequence.is_latest(ticket) {
            debug!(?ticket, "discarding stale browse result");
            return false;
        }
        match result {
            Ok(result) => {
                self.known_pages = Some(result.navigable_pages());
                self.results = result.results;
                self.error = None;
            }
            Err(e) => {
                self.results.clear();
                self.error = Some(e.message());
            }
        }
        true
    }

    /// Issues the next request, waits for it and applies the answer. Failures
    /// end up in [`BrowseSession::error`].
    pub async fn refresh(&mut self, catalog: &dyn CatalogApi) -> bool {
        let request = self.next_request();
        let result = request.run(catalog).await;
        self.apply(request.ticket, result)
    }

    fn restart(&mut self) {
        self.page = 1;
        self.known_pages = None;
    }
}

/// Genre vocabulary per content type, fetched on first use and kept for the
/// life of the cache. Failures are not remembered.
#[derive(Debug, Default)]
pub struct GenreCache {
    genres: Mutex<HashMap<ContentType, Vec<Genre>>>,
}

impl GenreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(
        &self,
        catalog: &dyn CatalogApi,
        content_type: ContentType,
    ) -> CatalogResult<Vec<Genre>> {
        if let Some(cached) = self.genres.lock().await.get(&content_type) {
            return Ok(cached.clone());
        }
        let fetched = catalog.genres(content_type).await?;
        self.genres
            .lock()
            .await
            .insert(content_type, fetched.clone());
        Ok(fetched)
    }
}

/// Names for `ids`, in the order given, skipping ids the vocabulary lacks.
pub fn genre_names(genres: &[Genre], ids: &[i32]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| genres.iter().find(|g| g.id == *id))
        .map(|g| g.name.clone())
        .collect()
}
