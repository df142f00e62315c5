use async_trait::async_trait;

use crate::models::{CastMember, Genre, QueryResult, TitleDetails};

mod client;
mod error;
mod images;
mod query;

pub use client::TmdbCatalog;
pub use error::{CatalogError, CatalogResult, GENERIC_FAILURE};
pub use images::{ImageBase, ImageSize, DEFAULT_BACKDROP_SIZE, DEFAULT_POSTER_SIZE};
pub use query::{ContentType, FilterSelection, MAX_PAGE};

/// Read-only view of the remote catalog. Every call is a single request with no
/// retry; callers racing several calls must discard stale answers themselves.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list(&self, page: u32, filters: &FilterSelection) -> CatalogResult<QueryResult>;
    async fn search(
        &self,
        query: &str,
        page: u32,
        content_type: ContentType,
    ) -> CatalogResult<QueryResult>;
    async fn details(&self, content_type: ContentType, id: i32) -> CatalogResult<TitleDetails>;
    async fn credits(&self, content_type: ContentType, id: i32)
        -> CatalogResult<Vec<CastMember>>;
    async fn genres(&self, content_type: ContentType) -> CatalogResult<Vec<Genre>>;
}
