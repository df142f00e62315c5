use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::{CatalogError, CatalogResult};
use super::images::{ImageBase, ImageSize};
use super::query::{self, ContentType, FilterSelection};
use super::CatalogApi;
use crate::config::CatalogConfig;
use crate::models::{CastMember, Genre, QueryResult, TitleDetails};

#[derive(Debug, Clone)]
pub struct TmdbCatalog {
    client: Client,
    base_url: String,
    images: ImageBase,
    api_key: String,
}

impl TmdbCatalog {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let user_agent = format!("cinescope/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build catalog HTTP client")?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &CatalogConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            images: ImageBase::new(config.image_base_url.clone()),
            api_key: config.api_key.clone(),
        }
    }

    pub fn images(&self) -> &ImageBase {
        &self.images
    }

    pub fn image_url(&self, path: Option<&str>, size: ImageSize) -> Option<String> {
        self.images.image_url(path, size)
    }

    pub fn backdrop_url(&self, path: Option<&str>, size: ImageSize) -> Option<String> {
        self.images.backdrop_url(path, size)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> CatalogResult<T> {
        let safe_url = query::redact(url);
        debug!(url = %safe_url, "catalog request");
        // reqwest errors embed the full URL, credential included; strip it.
        let res = self.client.get(url).send().await.map_err(|e| {
            let e = e.without_url();
            warn!("Catalog request to {} failed: {}", safe_url, e);
            CatalogError::Transport(e)
        })?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| CatalogError::Transport(e.without_url()))?;
        if !status.is_success() {
            let err = CatalogError::from_response(status, &bytes);
            warn!("Catalog returned {} for {}: {}", status, safe_url, err);
            return Err(err);
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Unparseable catalog response from {}: {}", safe_url, e);
            CatalogError::Malformed(e)
        })
    }
}

#[async_trait]
impl CatalogApi for TmdbCatalog {
    async fn list(&self, page: u32, filters: &FilterSelection) -> CatalogResult<QueryResult> {
        let page = query::check_page(page)?;
        let url = query::discover_url(&self.base_url, &self.api_key, page, filters);
        self.get_json(&url).await
    }

    async fn search(
        &self,
        query_text: &str,
        page: u32,
        content_type: ContentType,
    ) -> CatalogResult<QueryResult> {
        if query_text.trim().is_empty() {
            return Ok(QueryResult::empty());
        }
        let page = query::check_page(page)?;
        let url = query::search_url(&self.base_url, &self.api_key, query_text, page, content_type);
        self.get_json(&url).await
    }

    async fn details(&self, content_type: ContentType, id: i32) -> CatalogResult<TitleDetails> {
        let url = query::details_url(&self.base_url, &self.api_key, content_type, id);
        self.get_json(&url).await
    }

    async fn credits(
        &self,
        content_type: ContentType,
        id: i32,
    ) -> CatalogResult<Vec<CastMember>> {
        #[derive(Deserialize)]
        struct Credits {
            #[serde(default)]
            cast: Vec<CastMember>,
        }

        let url = query::credits_url(&self.base_url, &self.api_key, content_type, id);
        let credits: Credits = self.get_json(&url).await?;
        Ok(credits.cast)
    }

    async fn genres(&self, content_type: ContentType) -> CatalogResult<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            #[serde(default)]
            genres: Vec<Genre>,
        }

        let url = query::genres_url(&self.base_url, &self.api_key, content_type);
        let list: GenreList = self.get_json(&url).await?;
        Ok(list.genres)
    }
}
