use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::{
    error::AppResult,
    middleware::AuthUser,
    routes::{item_id, AppState, ItemQuery},
    services::library,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    #[serde(deserialize_with = "item_id")]
    pub movie_id: String,
    pub rating: i64,
}

pub async fn rate(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<RateRequest>,
) -> AppResult<Json<HashMap<String, u8>>> {
    let ratings = library::rate(state.users, user_id, &body.movie_id, body.rating).await?;
    Ok(Json(ratings))
}

pub async fn check(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Value>> {
    let rating = library::rating_for(state.users, user_id, &query.movie_id).await?;
    Ok(Json(json!({ "rated": rating.is_some(), "rating": rating })))
}
