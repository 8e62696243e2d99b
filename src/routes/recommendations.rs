use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    middleware::{AuthUser, RequestId},
    models::RecommendationResult,
    routes::AppState,
    services::recommendations,
};

/// Recommendations seeded by one of the caller's favorites
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<Json<RecommendationResult>> {
    tracing::info!(request_id = %request_id, user_id = %user_id, "Generating recommendations");

    let result = recommendations::get_recommendations(state.users, state.catalog, user_id).await?;

    tracing::info!(
        request_id = %request_id,
        count = result.recommendations.len(),
        reason = %result.reason,
        "Recommendations generated"
    );

    Ok(Json(result))
}
