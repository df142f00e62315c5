use crate::browse::{genre_names, GenreCache};
use crate::catalog::{
    CatalogApi, CatalogError, ContentType, FilterSelection, ImageBase, ImageSize, TmdbCatalog,
    DEFAULT_BACKDROP_SIZE, DEFAULT_POSTER_SIZE,
};
use crate::config::Config;
use crate::favorites::{FavoriteEntry, FavoritesStore};
use crate::models::{top_cast, CastMember, Genre, Title, TitleDetails};
use crate::storage::{DirStorage, SlotStorage};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;
const CAST_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub images: ImageBase,
    pub favorites: Arc<Mutex<FavoritesStore>>,
    pub genres: Arc<GenreCache>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        images: ImageBase,
        storage: Arc<dyn SlotStorage>,
    ) -> Self {
        Self {
            catalog,
            images,
            favorites: Arc::new(Mutex::new(FavoritesStore::load(storage))),
            genres: Arc::new(GenreCache::new()),
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb = TmdbCatalog::new(&config.catalog)?;
    let images = tmdb.images().clone();
    let catalog: Arc<dyn CatalogApi> = Arc::new(tmdb);
    let storage: Arc<dyn SlotStorage> = Arc::new(DirStorage::new(&config.data_dir)?);
    info!("Favorites stored under {:?}", config.data_dir);

    let state = AppState::new(catalog, images, storage);
    let app = build_router(state);

    info!("Listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/titles", get(list_titles))
        .route("/api/titles/:kind/:id", get(title_detail))
        .route("/api/genres/:kind", get(list_genres))
        .route("/api/favorites", get(list_favorites).post(add_favorite))
        .route(
            "/api/favorites/:id",
            get(favorite_status).delete(remove_favorite),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogError),
    BadRequest(String),
    Internal(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Catalog(err) => (err.status_code(), err.message()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn parse_kind(raw: Option<&str>) -> Result<ContentType, ApiError> {
    match raw {
        None => Ok(ContentType::default()),
        Some(raw) => raw
            .parse::<ContentType>()
            .map_err(|e| ApiError::BadRequest(e.to_string())),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TitlesQuery {
    page: Option<u32>,
    content_type: Option<String>,
    genre: Option<i32>,
    year: Option<i32>,
    rating: Option<f32>,
    language: Option<String>,
    query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TitleCard {
    #[serde(flatten)]
    pub title: Title,
    pub poster_url: Option<String>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct TitlePage {
    pub page: u32,
    pub total_pages: u32,
    pub results: Vec<TitleCard>,
}

async fn list_titles(
    State(state): State<AppState>,
    Query(params): Query<TitlesQuery>,
) -> Result<Json<TitlePage>, ApiError> {
    let content_type = parse_kind(params.content_type.as_deref())?;
    let page = params.page.unwrap_or(1);
    let query = params.query.unwrap_or_default();

    let result = if query.trim().is_empty() {
        let filters = FilterSelection {
            genre: params.genre,
            year: params.year,
            min_rating: params.rating,
            language: params.language,
            content_type,
        };
        state.catalog.list(page, &filters).await?
    } else {
        state.catalog.search(&query, page, content_type).await?
    };

    let total_pages = result.navigable_pages();
    let vocabulary = match state.genres.get(state.catalog.as_ref(), content_type).await {
        Ok(genres) => genres,
        Err(e) => {
            warn!("Genre lookup failed, listing without names: {}", e);
            Vec::new()
        }
    };
    let favorites = state.favorites.lock().await;
    let results = result
        .results
        .into_iter()
        .map(|title| TitleCard {
            poster_url: state
                .images
                .image_url(title.poster_path.as_deref(), DEFAULT_POSTER_SIZE),
            year: title.release_year(),
            genres: genre_names(&vocabulary, &title.genre_ids),
            favorite: favorites.is_favorite(title.id),
            title,
        })
        .collect();

    Ok(Json(TitlePage {
        page,
        total_pages,
        results,
    }))
}

#[derive(Debug, Serialize)]
pub struct CastCard {
    #[serde(flatten)]
    pub member: CastMember,
    pub profile_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TitleDetailView {
    #[serde(flatten)]
    pub details: TitleDetails,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub year: Option<i32>,
    pub favorite: bool,
    pub cast: Vec<CastCard>,
}

async fn title_detail(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<Json<TitleDetailView>, ApiError> {
    let content_type = parse_kind(Some(&kind))?;
    let (details, cast) = tokio::try_join!(
        state.catalog.details(content_type, id),
        state.catalog.credits(content_type, id),
    )?;

    let cast = top_cast(cast, CAST_LIMIT)
        .into_iter()
        .map(|member| CastCard {
            profile_url: state
                .images
                .image_url(member.profile_path.as_deref(), ImageSize::W185),
            member,
        })
        .collect();
    let favorite = state.favorites.lock().await.is_favorite(details.id);
    let year = details.to_title().release_year();

    Ok(Json(TitleDetailView {
        poster_url: state
            .images
            .image_url(details.poster_path.as_deref(), DEFAULT_POSTER_SIZE),
        backdrop_url: state
            .images
            .backdrop_url(details.backdrop_path.as_deref(), DEFAULT_BACKDROP_SIZE),
        year,
        favorite,
        cast,
        details,
    }))
}

async fn list_genres(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<Genre>>, ApiError> {
    let content_type = parse_kind(Some(&kind))?;
    let genres = state.genres.get(state.catalog.as_ref(), content_type).await?;
    Ok(Json(genres))
}

async fn list_favorites(State(state): State<AppState>) -> Json<Vec<FavoriteEntry>> {
    Json(state.favorites.lock().await.list().to_vec())
}

// Mutations rewrite the slot synchronously, so they run on the blocking pool.
async fn with_favorites<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut FavoritesStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let favorites = state.favorites.clone();
    tokio::task::spawn_blocking(move || f(&mut favorites.blocking_lock()))
        .await
        .map_err(|e| {
            warn!("Favorites update task failed: {}", e);
            ApiError::Internal("Could not update favorites".to_string())
        })
}

async fn add_favorite(
    State(state): State<AppState>,
    Json(title): Json<Title>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let label = format!("'{}' ({})", title.title, title.id);
    let (added, count) = with_favorites(&state, move |favorites| {
        let added = favorites.add(&title);
        (added, favorites.len())
    })
    .await?;
    if added {
        info!("Added {} to favorites", label);
    }
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "added": added, "count": count }))))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (removed, count) = with_favorites(&state, move |favorites| {
        let removed = favorites.remove(id);
        (removed, favorites.len())
    })
    .await?;
    if removed {
        info!("Removed {} from favorites", id);
    }
    Ok(Json(json!({ "removed": removed, "count": count })))
}

async fn favorite_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Json<serde_json::Value> {
    let favorite = state.favorites.lock().await.is_favorite(id);
    Json(json!({ "id": id, "favorite": favorite }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
