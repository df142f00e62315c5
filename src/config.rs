use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BIND: &str = "0.0.0.0:3146";

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub image_base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = var("TMDB_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing required environment variable: TMDB_API_KEY"))?;
        Ok(Self {
            base_url: non_empty(var("TMDB_BASE_URL")).unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            image_base_url: non_empty(var("TMDB_IMAGE_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.into()),
            api_key,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let catalog = CatalogConfig::from_vars(&var)?;
        let data_dir = non_empty(var("CINESCOPE_DATA_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let bind_raw = non_empty(var("CINESCOPE_BIND")).unwrap_or_else(|| DEFAULT_BIND.into());
        let bind = bind_raw
            .parse()
            .with_context(|| format!("CINESCOPE_BIND is not a socket address: {bind_raw}"))?;
        Ok(Self {
            catalog,
            data_dir,
            bind,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
