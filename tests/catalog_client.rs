use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json, Router};
use cinescope::catalog::{
    CatalogApi, CatalogError, ContentType, FilterSelection, TmdbCatalog, GENERIC_FAILURE,
};
use cinescope::config::CatalogConfig;
use cinescope::models::top_cast;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const API_KEY: &str = "test-key";
const NOT_FOUND: &str = "The resource you requested could not be found.";

type RequestLog = Arc<Mutex<Vec<String>>>;

fn movie_json(id: i32, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "poster_path": format!("/{id}.jpg"),
        "backdrop_path": null,
        "release_date": "2020-06-01",
        "vote_average": 7.8,
        "genre_ids": [28, 12]
    })
}

fn show_json(id: i32, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "poster_path": null,
        "first_air_date": "2005-03-24",
        "vote_average": 8.5,
        "genre_ids": [35]
    })
}

async fn provider(State(log): State<RequestLog>, uri: Uri) -> Response {
    log.lock().unwrap().push(uri.to_string());
    let path = uri.path().trim_start_matches("/3/").to_string();
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["discover", "movie"] => Json(json!({
            "page": 1,
            "results": [movie_json(1, "First"), movie_json(2, "Second")],
            "total_pages": 812,
            "total_results": 16240
        }))
        .into_response(),
        ["discover", "tv"] => Json(json!({
            "page": 1,
            "results": [show_json(10, "Show")],
            "total_pages": 3
        }))
        .into_response(),
        ["search", "tv"] => Json(json!({
            "page": 1,
            "results": [show_json(2316, "The Office")],
            "total_pages": 1
        }))
        .into_response(),
        ["genre", "movie", "list"] => Json(json!({
            "genres": [{ "id": 28, "name": "Action" }, { "id": 12, "name": "Adventure" }]
        }))
        .into_response(),
        ["movie", "550"] => Json(json!({
            "id": 550,
            "title": "Fight Club",
            "overview": "A ticking-time-bomb insomniac...",
            "tagline": "Mischief. Mayhem. Soap.",
            "runtime": 139,
            "poster_path": "/fc.jpg",
            "backdrop_path": "/fc_bg.jpg",
            "release_date": "1999-10-15",
            "vote_average": 8.4,
            "genres": [{ "id": 18, "name": "Drama" }]
        }))
        .into_response(),
        ["movie", "550", "credits"] => {
            let cast: Vec<Value> = (0..12)
                .map(|i| {
                    json!({
                        "id": 100 + i,
                        "name": format!("Actor {i}"),
                        "character": format!("Role {i}"),
                        "profile_path": null,
                        "order": i
                    })
                })
                .collect();
            Json(json!({ "id": 550, "cast": cast, "crew": [] })).into_response()
        }
        ["movie", "777"] => (StatusCode::OK, "<<definitely not json>>").into_response(),
        ["tv", "500"] => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html><body>upstream exploded</body></html>",
        )
            .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status_code": 34, "status_message": NOT_FOUND, "success": false })),
        )
            .into_response(),
    }
}

async fn spawn_provider() -> (TmdbCatalog, RequestLog) {
    let log = RequestLog::default();
    let app = Router::new().fallback(provider).with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (catalog_at(&format!("http://{addr}/3")), log)
}

fn catalog_at(base_url: &str) -> TmdbCatalog {
    let config = CatalogConfig {
        base_url: base_url.to_string(),
        image_base_url: "https://image.example.test/t/p".to_string(),
        api_key: API_KEY.to_string(),
    };
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    TmdbCatalog::with_client(&config, client)
}

fn full_filters(content_type: ContentType) -> FilterSelection {
    FilterSelection {
        genre: Some(28),
        year: Some(2020),
        min_rating: Some(7.0),
        language: Some("en".to_string()),
        content_type,
    }
}

#[tokio::test]
async fn discovery_sends_every_filter_and_returns_provider_data_verbatim() {
    let (catalog, log) = spawn_provider().await;
    let result = catalog
        .list(2, &full_filters(ContentType::Movie))
        .await
        .unwrap();

    assert_eq!(result.results.len(), 2);
    assert_eq!(result.results[0].title, "First");
    assert_eq!(result.results[1].id, 2);
    assert_eq!(result.total_pages, 812);
    assert_eq!(result.navigable_pages(), 500);

    let requests = log.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        "/3/discover/movie?api_key=test-key&page=2&sort_by=popularity.desc\
         &with_genres=28&primary_release_year=2020&vote_average.gte=7&with_original_language=en"
    );
}

#[tokio::test]
async fn tv_discovery_uses_air_date_year() {
    let (catalog, log) = spawn_provider().await;
    let result = catalog.list(1, &full_filters(ContentType::Tv)).await.unwrap();
    assert_eq!(result.results[0].title, "Show");
    assert_eq!(result.results[0].release_date.as_deref(), Some("2005-03-24"));

    let requests = log.lock().unwrap();
    assert!(requests[0].starts_with("/3/discover/tv?"));
    assert!(requests[0].contains("&first_air_date_year=2020"));
    assert!(!requests[0].contains("primary_release_year"));
}

#[tokio::test]
async fn search_encodes_text_and_blank_text_stays_local() {
    let (catalog, log) = spawn_provider().await;

    let empty = catalog.search("  \t", 3, ContentType::Movie).await.unwrap();
    assert!(empty.results.is_empty());
    assert_eq!(empty.total_pages, 0);
    assert!(log.lock().unwrap().is_empty());

    let found = catalog.search("The Office", 1, ContentType::Tv).await.unwrap();
    assert_eq!(found.results[0].title, "The Office");
    let requests = log.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        "/3/search/tv?api_key=test-key&query=The%20Office&page=1"
    );
}

#[tokio::test]
async fn details_and_credits_parse() {
    let (catalog, _log) = spawn_provider().await;
    let details = catalog.details(ContentType::Movie, 550).await.unwrap();
    assert_eq!(details.title, "Fight Club");
    assert_eq!(details.tagline.as_deref(), Some("Mischief. Mayhem. Soap."));
    assert_eq!(details.to_title().genre_ids, vec![18]);

    let cast = catalog.credits(ContentType::Movie, 550).await.unwrap();
    assert_eq!(cast.len(), 12);
    let top = top_cast(cast, 10);
    assert_eq!(top.len(), 10);
    assert_eq!(top[0].name, "Actor 0");
    assert_eq!(top[9].character.as_deref(), Some("Role 9"));
}

#[tokio::test]
async fn genre_vocabulary_is_fetched_whole() {
    let (catalog, log) = spawn_provider().await;
    let genres = catalog.genres(ContentType::Movie).await.unwrap();
    assert_eq!(genres.len(), 2);
    assert_eq!(genres[0].name, "Action");
    assert_eq!(
        log.lock().unwrap()[0],
        "/3/genre/movie/list?api_key=test-key"
    );
}

#[tokio::test]
async fn provider_not_found_keeps_provider_message() {
    let (catalog, _log) = spawn_provider().await;
    let err = catalog.details(ContentType::Movie, 1).await.unwrap_err();
    assert_eq!(err.to_string(), NOT_FOUND);
    assert!(matches!(err, CatalogError::Provider { status: 404, .. }));
}

#[tokio::test]
async fn non_json_error_body_uses_generic_message() {
    let (catalog, _log) = spawn_provider().await;
    let err = catalog.details(ContentType::Tv, 500).await.unwrap_err();
    assert_eq!(err.message(), GENERIC_FAILURE);
    assert!(matches!(err, CatalogError::Provider { status: 500, .. }));
}

#[tokio::test]
async fn garbage_success_body_is_a_malformed_failure() {
    let (catalog, _log) = spawn_provider().await;
    let err = catalog.details(ContentType::Movie, 777).await.unwrap_err();
    assert!(matches!(err, CatalogError::Malformed(_)));
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let catalog = catalog_at(&format!("http://{addr}/3"));
    let err = catalog
        .list(1, &FilterSelection::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Transport(_)));
    assert_eq!(err.message(), "Network error");
    assert!(!format!("{:?}", err).contains(API_KEY));
}
