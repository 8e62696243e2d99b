use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::{AuthUser, RequestId},
    models::{Comment, ItemComment},
    routes::{item_id, AppState},
    services::library,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(deserialize_with = "item_id")]
    pub movie_id: String,
    #[serde(default)]
    pub text: String,
}

pub async fn add(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    tracing::info!(request_id = %request_id, user_id = %user_id, "Adding comment");

    let comment = library::add_comment(state.users, user_id, &body.movie_id, &body.text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Comments on one item from every user, oldest first
pub async fn list_for_item(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> AppResult<Json<Vec<ItemComment>>> {
    let comments = library::comments_for_item(state.users, &movie_id).await?;
    Ok(Json(comments))
}
