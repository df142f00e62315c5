//! Query the catalog provider from the command line and print what comes back.
//! Usage:
//!   cargo run --bin catalog_props -- discover <movie|tv> [page] [genre=28] [year=2020] [rating=7] [language=en]
//!   cargo run --bin catalog_props -- search <movie|tv> <query> [page]
//!   cargo run --bin catalog_props -- details <movie|tv> <id>
//!   cargo run --bin catalog_props -- genres <movie|tv>
//!   cargo run --bin catalog_props -- favorites [add <movie|tv> <id> | remove <id>]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use cinescope::catalog::{
    CatalogApi, ContentType, FilterSelection, TmdbCatalog, DEFAULT_BACKDROP_SIZE,
    DEFAULT_POSTER_SIZE,
};
use cinescope::config::Config;
use cinescope::favorites::FavoritesStore;
use cinescope::models::top_cast;
use cinescope::storage::DirStorage;
use dotenvy::dotenv;
use serde_json::json;
use std::env;
use std::sync::Arc;

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin catalog_props -- discover <movie|tv> [page] [key=value...]");
    eprintln!("       cargo run --bin catalog_props -- search <movie|tv> <query> [page]");
    eprintln!("       cargo run --bin catalog_props -- details <movie|tv> <id>");
    eprintln!("       cargo run --bin catalog_props -- genres <movie|tv>");
    eprintln!("       cargo run --bin catalog_props -- favorites [add <movie|tv> <id> | remove <id>]");
    std::process::exit(1);
}

fn parse_filters(content_type: ContentType, pairs: &[String]) -> Result<FilterSelection> {
    let mut filters = FilterSelection::for_type(content_type);
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("filter '{}' must look like key=value", pair))?;
        match key {
            "genre" => {
                filters.genre = Some(value.parse::<i32>().context("genre must be an integer")?)
            }
            "year" => {
                filters.year = Some(value.parse::<i32>().context("year must be an integer")?)
            }
            "rating" => {
                filters.min_rating = Some(value.parse::<f32>().context("rating must be a number")?)
            }
            "language" => filters.language = Some(value.to_string()),
            other => return Err(anyhow!("unknown filter '{}'", other)),
        }
    }
    Ok(filters)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else { usage() };

    let config = Config::from_env()?;
    let catalog = TmdbCatalog::new(&config.catalog)?;
    let kind = |i: usize| -> Result<ContentType> {
        args.get(i).map(String::as_str).unwrap_or("movie").parse()
    };

    let output = match command.as_str() {
        "discover" => {
            let content_type = kind(1)?;
            let page = match args.get(2) {
                Some(p) if !p.contains('=') => {
                    p.parse::<u32>().context("page must be an integer")?
                }
                _ => 1,
            };
            let rest: Vec<String> = args
                .iter()
                .skip(2)
                .filter(|a| a.contains('='))
                .cloned()
                .collect();
            let filters = parse_filters(content_type, &rest)?;
            let result = catalog.list(page, &filters).await?;
            json!({
                "page": page,
                "total_pages": result.total_pages,
                "navigable_pages": result.navigable_pages(),
                "results": result.results,
            })
        }
        "search" => {
            let content_type = kind(1)?;
            let query = args.get(2).cloned().unwrap_or_default();
            let page = match args.get(3) {
                Some(p) => p.parse::<u32>().context("page must be an integer")?,
                None => 1,
            };
            let result = catalog.search(&query, page, content_type).await?;
            serde_json::to_value(&result)?
        }
        "details" => {
            let content_type = kind(1)?;
            let id: i32 = args
                .get(2)
                .ok_or_else(|| anyhow!("missing id"))?
                .parse::<i32>()
                .context("id must be an integer")?;
            let (details, cast) = tokio::try_join!(
                catalog.details(content_type, id),
                catalog.credits(content_type, id),
            )?;
            json!({
                "details": details,
                "poster": catalog.image_url(details.poster_path.as_deref(), DEFAULT_POSTER_SIZE),
                "backdrop": catalog.backdrop_url(details.backdrop_path.as_deref(), DEFAULT_BACKDROP_SIZE),
                "cast": top_cast(cast, 10),
            })
        }
        "genres" => serde_json::to_value(catalog.genres(kind(1)?).await?)?,
        "favorites" => {
            let storage = Arc::new(DirStorage::new(&config.data_dir)?);
            let mut store = FavoritesStore::load(storage);
            match args.get(1).map(String::as_str) {
                Some("add") => {
                    let content_type = kind(2)?;
                    let id: i32 = args
                        .get(3)
                        .ok_or_else(|| anyhow!("missing id"))?
                        .parse::<i32>()
                        .context("id must be an integer")?;
                    let details = catalog.details(content_type, id).await?;
                    let added = store.add(&details.to_title());
                    eprintln!("added: {added}");
                }
                Some("remove") => {
                    let id: i32 = args
                        .get(2)
                        .ok_or_else(|| anyhow!("missing id"))?
                        .parse::<i32>()
                        .context("id must be an integer")?;
                    let removed = store.remove(id);
                    eprintln!("removed: {removed}");
                }
                Some(_) => usage(),
                None => {}
            }
            serde_json::to_value(store.list())?
        }
        _ => usage(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
