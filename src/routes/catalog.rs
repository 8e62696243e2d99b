use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, Listing, MediaKind},
    routes::AppState,
};

fn parse_kind(raw: &str) -> AppResult<MediaKind> {
    raw.parse().map_err(AppError::InvalidInput)
}

pub async fn trending(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    let items = state.catalog.listing(Listing::Trending(parse_kind(&kind)?)).await?;
    Ok(Json(items))
}

pub async fn top_rated(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    let items = state.catalog.listing(Listing::TopRated(parse_kind(&kind)?)).await?;
    Ok(Json(items))
}

pub async fn upcoming(State(state): State<AppState>) -> AppResult<Json<Vec<CatalogItem>>> {
    let items = state.catalog.listing(Listing::Upcoming).await?;
    Ok(Json(items))
}

pub async fn details(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let details = state.catalog.details(&id, parse_kind(&kind)?).await?;
    Ok(Json(details))
}

pub async fn credits(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let credits = state.catalog.credits(&id, parse_kind(&kind)?).await?;
    Ok(Json(credits))
}

pub async fn release_dates(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let dates = state.catalog.release_dates(&id, parse_kind(&kind)?).await?;
    Ok(Json(dates))
}

pub async fn similar(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    let items = state.catalog.similar(&id, parse_kind(&kind)?).await?;
    Ok(Json(items))
}
