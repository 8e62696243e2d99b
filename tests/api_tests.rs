use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use cinefind_api::{
    db::MemoryStore,
    error::{AppError, AppResult},
    models::{CatalogItem, Listing, MediaKind, ResolvedItem},
    routes::{create_router, AppState},
    services::{
        providers::CatalogProvider,
        quiz::{QuizAdvisor, QuizAnswers},
    },
};

fn item(id: &str, title: &str, rating: f64) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        kind: MediaKind::Movie,
        title: title.to_string(),
        overview: None,
        rating,
        poster_path: None,
        backdrop_path: None,
    }
}

/// Catalog that knows a single movie, 550
struct FakeCatalog;

#[async_trait::async_trait]
impl CatalogProvider for FakeCatalog {
    async fn resolve_item_type(&self, id: &str) -> AppResult<ResolvedItem> {
        match id {
            "550" => Ok(ResolvedItem {
                kind: MediaKind::Movie,
                item: item("550", "Fight Club", 8.4),
            }),
            _ => Err(AppError::NotFound(format!("No item found with id {}", id))),
        }
    }

    async fn fetch_recommendations(&self, id: &str, _kind: MediaKind) -> Vec<CatalogItem> {
        match id {
            "550" => vec![
                item("1", "Se7en", 6.0),
                item("2", "Memento", 8.5),
                item("3", "Paycheck", 3.0),
            ],
            _ => vec![],
        }
    }

    async fn details(&self, id: &str, kind: MediaKind) -> AppResult<Value> {
        if id == "550" {
            Ok(json!({ "id": 550, "kind": kind.path_segment() }))
        } else {
            Err(AppError::NotFound(format!("No {} found with id {}", kind, id)))
        }
    }

    async fn credits(&self, _id: &str, _kind: MediaKind) -> AppResult<Value> {
        Ok(json!({ "cast": [{ "name": "Edward Norton" }] }))
    }

    async fn release_dates(&self, _id: &str, _kind: MediaKind) -> AppResult<Value> {
        Ok(json!({ "results": [] }))
    }

    async fn similar(&self, _id: &str, _kind: MediaKind) -> AppResult<Vec<CatalogItem>> {
        Ok(vec![item("807", "Se7en", 8.3)])
    }

    async fn listing(&self, listing: Listing) -> AppResult<Vec<CatalogItem>> {
        let title = match listing {
            Listing::Trending(_) => "Trending",
            Listing::TopRated(_) => "Top rated",
            Listing::Upcoming => "Upcoming",
        };
        Ok(vec![item("10", title, 7.0)])
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FixedAdvisor;

#[async_trait::async_trait]
impl QuizAdvisor for FixedAdvisor {
    async fn suggest(&self, answers: &QuizAnswers) -> AppResult<String> {
        Ok(format!("Paddington ({})", answers.mood.as_deref().unwrap_or("-")))
    }
}

fn state() -> AppState {
    AppState::with_store(
        Arc::new(MemoryStore::new()),
        Arc::new(FakeCatalog),
        chrono::Duration::hours(1),
    )
}

fn create_test_server() -> TestServer {
    TestServer::new(create_router(state())).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

/// Registers a user and logs in, returning (user id, token)
async fn signup(server: &TestServer, name: &str) -> (String, String) {
    let response = server
        .post("/api/user/create")
        .json(&json!({
            "email": format!("{}@example.com", name),
            "name": name,
            "password": "s3cret"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/user/auth")
        .json(&json!({ "email": name, "password": "s3cret" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    (
        body["userId"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let id = "6f2c7b5e-9a43-4a55-8e0c-2a7f3f0b9d11";
    let response = server
        .get("/health")
        .add_header(
            header::HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_register_and_duplicates() {
    let server = create_test_server();
    let response = server
        .post("/api/user/create")
        .json(&json!({ "email": "ana@example.com", "name": "ana", "password": "pw" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let user: Value = response.json();
    assert_eq!(user["role"], "user");
    assert_eq!(user["active"], true);
    assert!(user.get("password").is_none());

    let duplicate = server
        .post("/api/user/create")
        .json(&json!({ "email": "ana@example.com", "name": "other", "password": "pw" }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);

    let missing = server
        .post("/api/user/create")
        .json(&json!({ "email": "ben@example.com", "name": "ben" }))
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = missing.json();
    assert!(body["error"].as_str().unwrap().contains("Password"));
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let server = create_test_server();
    signup(&server, "ana").await;

    let response = server
        .post("/api/user/auth")
        .json(&json!({ "email": "ana@example.com", "password": "wrong" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = create_test_server();

    server
        .get("/api/user/favorites/count")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/user/favorites/count")
        .add_header(header::AUTHORIZATION, bearer("deadbeef"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_favorites_flow() {
    let server = create_test_server();
    let (_, token) = signup(&server, "ana").await;

    for _ in 0..2 {
        let response = server
            .post("/api/user/favorites/add")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "movieId": 550 }))
            .await;
        response.assert_status_ok();
        let favorites: Vec<String> = response.json();
        assert_eq!(favorites, vec!["550".to_string()]);
    }

    let check: Value = server
        .get("/api/user/favorites/check")
        .add_query_param("movieId", "550")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(check["isFavorite"], true);

    let count: Value = server
        .get("/api/user/favorites/count")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(count["count"], 1);

    let remaining: Vec<String> = server
        .post("/api/user/favorites/remove")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "movieId": "550" }))
        .await
        .json();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_watchlist_flow() {
    let server = create_test_server();
    let (_, token) = signup(&server, "ana").await;

    server
        .post("/api/user/watchlist/add")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "movieId": "13" }))
        .await
        .assert_status_ok();

    let check: Value = server
        .get("/api/user/watchlist/check")
        .add_query_param("movieId", "13")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(check["isToWatch"], true);

    let count: Value = server
        .get("/api/user/watchlist/count")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_ratings_validation_and_zero() {
    let server = create_test_server();
    let (_, token) = signup(&server, "ana").await;

    let rejected = server
        .post("/api/user/ratings")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "movieId": "550", "rating": 11 }))
        .await;
    rejected.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = rejected.json();
    assert_eq!(body["error"], "Rating must be between 0 and 10");

    let ratings: Value = server
        .post("/api/user/ratings")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "movieId": "550", "rating": 0 }))
        .await
        .json();
    assert_eq!(ratings["550"], 0);

    let check: Value = server
        .get("/api/user/ratings/check")
        .add_query_param("movieId", "550")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(check["rated"], true);
    assert_eq!(check["rating"], 0);

    let unrated: Value = server
        .get("/api/user/ratings/check")
        .add_query_param("movieId", "13")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(unrated["rated"], false);
    assert!(unrated["rating"].is_null());
}

#[tokio::test]
async fn test_comments_are_public_per_item() {
    let server = create_test_server();
    let (_, ana) = signup(&server, "ana").await;
    let (_, ben) = signup(&server, "ben").await;

    for (token, text) in [(&ana, "Great twist"), (&ben, "Overrated")] {
        server
            .post("/api/user/comments")
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&json!({ "movieId": 550, "text": text }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server.get("/api/user/comments/550").await;
    response.assert_status_ok();
    let comments: Vec<Value> = response.json();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["username"], "ana");
    assert_eq!(comments[1]["text"], "Overrated");

    server
        .get("/api/user/comments/abc")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/user/comments")
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .json(&json!({ "movieId": 550, "text": "  " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations() {
    let server = create_test_server();
    let (_, token) = signup(&server, "ana").await;

    let empty = server
        .get("/api/user/recommendations")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    empty.assert_status(StatusCode::NOT_FOUND);
    let body: Value = empty.json();
    assert_eq!(body["error"], "User has no favorites");

    server
        .post("/api/user/favorites/add")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "movieId": 550 }))
        .await
        .assert_status_ok();

    let response = server
        .get("/api/user/recommendations")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["reason"], "Fight Club");
    let ids: Vec<&str> = body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["2", "1"]);
}

#[tokio::test]
async fn test_recommendations_with_unknown_favorite_fail() {
    let server = create_test_server();
    let (_, token) = signup(&server, "ana").await;

    server
        .post("/api/user/favorites/add")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "movieId": 1 }))
        .await
        .assert_status_ok();

    server
        .get("/api/user/recommendations")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_update_profile() {
    let server = create_test_server();
    let (_, token) = signup(&server, "ana").await;

    let response = server
        .put("/api/user")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "ana-maria" }))
        .await;
    response.assert_status_ok();
    let user: Value = response.json();
    assert_eq!(user["name"], "ana-maria");
    assert_eq!(user["email"], "ana@example.com");
}

#[tokio::test]
async fn test_deactivated_account_loses_access() {
    let server = create_test_server();
    let (_, token) = signup(&server, "ana").await;

    server
        .put("/api/user")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "active": false }))
        .await
        .assert_status_ok();

    server
        .get("/api/user/favorites/count")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .post("/api/user/auth")
        .json(&json!({ "email": "ana", "password": "s3cret" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout() {
    let server = create_test_server();
    let (ana_id, ana) = signup(&server, "ana").await;
    let (_, ben) = signup(&server, "ben").await;

    server
        .delete(&format!("/api/user/logout/{}", ana_id))
        .add_header(header::AUTHORIZATION, bearer(&ben))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .delete(&format!("/api/user/logout/{}", ana_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .assert_status_ok();

    server
        .get("/api/user/favorites/count")
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_quiz_without_advisor_is_unavailable() {
    let server = create_test_server();
    server
        .post("/api/quiz/recommend")
        .json(&json!({ "answers": { "mood": "Happy" } }))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_quiz_recommendation() {
    let app = create_router(state().with_quiz(Arc::new(FixedAdvisor)));
    let server = TestServer::new(app).unwrap();

    let response = server
        .post("/api/quiz/recommend")
        .json(&json!({ "answers": { "mood": "Happy", "cinemaEra": "Doesn't matter" } }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["recommendation"], "Paddington (Happy)");
}

#[tokio::test]
async fn test_catalog_browse() {
    let server = create_test_server();

    let trending: Vec<Value> = server.get("/api/catalog/trending/movie").await.json();
    assert_eq!(trending[0]["title"], "Trending");

    let top_rated: Vec<Value> = server.get("/api/catalog/top-rated/tv").await.json();
    assert_eq!(top_rated[0]["title"], "Top rated");

    let upcoming: Vec<Value> = server.get("/api/catalog/upcoming").await.json();
    assert_eq!(upcoming[0]["title"], "Upcoming");

    server
        .get("/api/catalog/trending/podcast")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_item_endpoints() {
    let server = create_test_server();

    let details: Value = server.get("/api/catalog/movie/550").await.json();
    assert_eq!(details["id"], 550);
    assert_eq!(details["kind"], "movie");

    server
        .get("/api/catalog/movie/0")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let credits: Value = server.get("/api/catalog/movie/550/credits").await.json();
    assert_eq!(credits["cast"][0]["name"], "Edward Norton");

    server
        .get("/api/catalog/series/1399/release-dates")
        .await
        .assert_status_ok();

    let similar: Vec<Value> = server.get("/api/catalog/movie/550/similar").await.json();
    assert_eq!(similar.len(), 1);
}
