use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{CatalogError, CatalogResult};

/// Highest page the provider will serve for discovery and search.
pub const MAX_PAGE: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Tv,
}

impl ContentType {
    pub fn as_path(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Tv => "tv",
        }
    }

    /// Discovery parameter carrying "release year"; the two catalogs name it differently.
    fn year_param(&self) -> &'static str {
        match self {
            ContentType::Movie => "primary_release_year",
            ContentType::Tv => "first_air_date_year",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(ContentType::Movie),
            "tv" => Ok(ContentType::Tv),
            _ => Err(anyhow::anyhow!("content type must be 'movie' or 'tv'")),
        }
    }
}

/// Optional discovery constraints. Only `content_type` always applies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub genre: Option<i32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub min_rating: Option<f32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content_type: ContentType,
}

impl FilterSelection {
    pub fn for_type(content_type: ContentType) -> Self {
        Self {
            content_type,
            ..Self::default()
        }
    }

    fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

pub(crate) fn check_page(page: u32) -> CatalogResult<u32> {
    if page == 0 || page > MAX_PAGE {
        return Err(CatalogError::InvalidPage(page));
    }
    Ok(page)
}

pub(crate) fn discover_url(base: &str, api_key: &str, page: u32, filters: &FilterSelection) -> String {
    let content_type = filters.content_type;
    let mut url = format!(
        "{base}/discover/{content_type}?api_key={api_key}&page={page}&sort_by=popularity.desc"
    );
    if let Some(genre) = filters.genre {
        url.push_str(&format!("&with_genres={genre}"));
    }
    if let Some(year) = filters.year {
        url.push_str(&format!("&{}={year}", content_type.year_param()));
    }
    if let Some(rating) = filters.min_rating {
        url.push_str(&format!("&vote_average.gte={rating}"));
    }
    if let Some(language) = filters.language() {
        url.push_str(&format!(
            "&with_original_language={}",
            urlencoding::encode(language)
        ));
    }
    url
}

pub(crate) fn search_url(
    base: &str,
    api_key: &str,
    query: &str,
    page: u32,
    content_type: ContentType,
) -> String {
    format!(
        "{base}/search/{content_type}?api_key={api_key}&query={}&page={page}",
        urlencoding::encode(query)
    )
}

pub(crate) fn details_url(base: &str, api_key: &str, content_type: ContentType, id: i32) -> String {
    format!("{base}/{content_type}/{id}?api_key={api_key}")
}

pub(crate) fn credits_url(base: &str, api_key: &str, content_type: ContentType, id: i32) -> String {
    format!("{base}/{content_type}/{id}/credits?api_key={api_key}")
}

pub(crate) fn genres_url(base: &str, api_key: &str, content_type: ContentType) -> String {
    format!("{base}/genre/{content_type}/list?api_key={api_key}")
}

/// Strips the credential from a URL before it goes anywhere near a log line.
pub(crate) fn redact(url: &str) -> String {
    let Some(start) = url.find("api_key=") else {
        return url.to_string();
    };
    let value_start = start + "api_key=".len();
    let value_end = url[value_start..]
        .find('&')
        .map(|i| value_start + i)
        .unwrap_or(url.len());
    format!("{}***{}", &url[..value_start], &url[value_end..])
}
