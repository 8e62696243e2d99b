use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::{AuthUser, RequestId},
    models::User,
    routes::AppState,
    services::accounts::{self, ProfileChanges, Registration},
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
}

/// Login by email or user name
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(alias = "name", alias = "login")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    tracing::info!(request_id = %request_id, "Registering user");

    let user = accounts::register(
        state.users,
        Registration {
            email: body.email,
            name: body.name,
            password: body.password,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let user = accounts::update_profile(
        state.users,
        state.sessions,
        user_id,
        ProfileChanges {
            email: body.email,
            name: body.name,
            password: body.password,
            active: body.active,
        },
    )
    .await?;

    Ok(Json(user))
}

pub async fn authenticate(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<AuthRequest>,
) -> AppResult<Json<AuthResponse>> {
    tracing::info!(request_id = %request_id, "Authentication attempt");

    let token = accounts::authenticate(
        state.users,
        state.sessions,
        &body.email,
        &body.password,
        state.token_ttl,
    )
    .await?;

    Ok(Json(AuthResponse {
        token: token.value,
        user_id: token.user_id,
        expires_at: token.expires_at,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    accounts::logout(state.sessions, caller, user_id).await?;
    Ok(Json(json!({ "message": "Logged out" })))
}
