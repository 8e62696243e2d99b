use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware, require_auth};

pub mod catalog;
pub mod comments;
pub mod favorites;
pub mod quiz;
pub mod ratings;
pub mod recommendations;
mod state;
pub mod users;
pub mod watchlist;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(state.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Routes under /api
fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/user", put(users::update))
        .route("/user/logout/:user_id", delete(users::logout))
        .route("/user/favorites/add", post(favorites::add))
        .route("/user/favorites/remove", post(favorites::remove))
        .route("/user/favorites/check", get(favorites::check))
        .route("/user/favorites/count", get(favorites::count))
        .route("/user/watchlist/add", post(watchlist::add))
        .route("/user/watchlist/remove", post(watchlist::remove))
        .route("/user/watchlist/check", get(watchlist::check))
        .route("/user/watchlist/count", get(watchlist::count))
        .route("/user/ratings", post(ratings::rate))
        .route("/user/ratings/check", get(ratings::check))
        .route("/user/comments", post(comments::add))
        .route("/user/recommendations", get(recommendations::recommend))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    let public = Router::new()
        .route("/user/auth", post(users::authenticate))
        .route("/user/create", post(users::create))
        .route("/user/comments/:movie_id", get(comments::list_for_item))
        .route("/quiz/recommend", post(quiz::recommend))
        .route("/catalog/trending/:kind", get(catalog::trending))
        .route("/catalog/top-rated/:kind", get(catalog::top_rated))
        .route("/catalog/upcoming", get(catalog::upcoming))
        .route("/catalog/:kind/:id", get(catalog::details))
        .route("/catalog/:kind/:id/credits", get(catalog::credits))
        .route("/catalog/:kind/:id/release-dates", get(catalog::release_dates))
        .route("/catalog/:kind/:id/similar", get(catalog::similar));

    protected.merge(public)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Body carrying only an item id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[serde(deserialize_with = "item_id")]
    pub movie_id: String,
}

/// Query string carrying only an item id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    pub movie_id: String,
}

/// Clients send TMDB ids either as numbers or as strings
pub(crate) fn item_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_accepts_numbers_and_strings() {
        let numeric: ItemRequest = serde_json::from_str(r#"{"movieId": 550}"#).unwrap();
        assert_eq!(numeric.movie_id, "550");

        let text: ItemRequest = serde_json::from_str(r#"{"movieId": "tt0137523"}"#).unwrap();
        assert_eq!(text.movie_id, "tt0137523");

        assert!(serde_json::from_str::<ItemRequest>(r#"{"movieId": null}"#).is_err());
    }
}
