use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    routes::{AppState, ItemQuery, ItemRequest},
    services::library,
};

pub async fn add(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<ItemRequest>,
) -> AppResult<Json<Vec<String>>> {
    let favorites = library::add_favorite(state.users, user_id, &body.movie_id).await?;
    Ok(Json(favorites))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<ItemRequest>,
) -> AppResult<Json<Vec<String>>> {
    let favorites = library::remove_favorite(state.users, user_id, &body.movie_id).await?;
    Ok(Json(favorites))
}

pub async fn check(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Value>> {
    let is_favorite = library::is_favorite(state.users, user_id, &query.movie_id).await?;
    Ok(Json(json!({ "isFavorite": is_favorite })))
}

pub async fn count(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<Json<Value>> {
    let user = state.users.get(user_id).await?;
    Ok(Json(json!({ "count": user.favorites.len() })))
}
