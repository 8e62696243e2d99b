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
    let watchlist = library::add_to_watchlist(state.users, user_id, &body.movie_id).await?;
    Ok(Json(watchlist))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<ItemRequest>,
) -> AppResult<Json<Vec<String>>> {
    let watchlist = library::remove_from_watchlist(state.users, user_id, &body.movie_id).await?;
    Ok(Json(watchlist))
}

pub async fn check(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Value>> {
    let listed = library::is_on_watchlist(state.users, user_id, &query.movie_id).await?;
    Ok(Json(json!({ "isToWatch": listed })))
}

pub async fn count(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<Json<Value>> {
    let user = state.users.get(user_id).await?;
    Ok(Json(json!({ "count": user.watchlist.len() })))
}
