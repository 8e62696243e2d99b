use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    routes::AppState,
    services::quiz::QuizAnswers,
};

#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    #[serde(default)]
    pub answers: QuizAnswers,
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub recommendation: String,
}

pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<QuizRequest>,
) -> AppResult<Json<QuizResponse>> {
    let advisor = state
        .quiz
        .ok_or_else(|| AppError::Unavailable("Quiz recommendations are not configured".to_string()))?;

    tracing::info!(request_id = %request_id, "Generating quiz recommendation");

    let recommendation = advisor.suggest(&body.answers).await?;
    Ok(Json(QuizResponse { recommendation }))
}
