use rand::{seq::SliceRandom, Rng};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{CatalogItem, RecommendationResult, ResolvedItem, User},
    services::providers::CatalogProvider,
};

/// A single recommendation chosen for the digest email
#[derive(Debug, Clone, PartialEq)]
pub struct EmailPick {
    pub reason: String,
    pub item: CatalogItem,
}

/// Generates recommendations for a user from one of their favorites
///
/// A favorite is picked at random as the seed. When the seed yields nothing,
/// exactly one fallback seed (the next favorite, wrapping around) is tried
/// before settling for an empty result.
pub async fn get_recommendations(
    users: Arc<dyn UserStore>,
    provider: Arc<dyn CatalogProvider>,
    user_id: Uuid,
) -> AppResult<RecommendationResult> {
    let user = users.get(user_id).await?;
    recommend_for_user(provider.as_ref(), &user).await
}

/// Same as [`get_recommendations`] for an already loaded user
pub async fn recommend_for_user(
    provider: &dyn CatalogProvider,
    user: &User,
) -> AppResult<RecommendationResult> {
    let start = random_index(user.favorites.len())?;
    recommend_from_favorites(provider, &user.favorites, start).await
}

/// Picks one recommendation uniformly at random for the digest email
///
/// Returns `None` when neither seed produced recommendations.
pub async fn pick_for_email(
    provider: &dyn CatalogProvider,
    user: &User,
) -> AppResult<Option<EmailPick>> {
    let result = recommend_for_user(provider, user).await?;

    let item = {
        let mut rng = rand::thread_rng();
        result.recommendations.choose(&mut rng).cloned()
    };

    Ok(item.map(|item| EmailPick {
        reason: result.reason,
        item,
    }))
}

/// Runs the seed / fallback workflow starting at `start`
pub async fn recommend_from_favorites(
    provider: &dyn CatalogProvider,
    favorites: &[String],
    start: usize,
) -> AppResult<RecommendationResult> {
    if favorites.is_empty() {
        return Err(AppError::NotFound("User has no favorites".to_string()));
    }

    let seed_index = start % favorites.len();
    let seed = resolve_seed(provider, &favorites[seed_index]).await?;
    let result = recommendations_for_seed(provider, seed).await;

    if !result.is_empty() {
        return Ok(result);
    }

    let fallback_index = (seed_index + 1) % favorites.len();
    tracing::info!(
        seed = %favorites[seed_index],
        fallback = %favorites[fallback_index],
        "Seed produced no recommendations, trying fallback seed"
    );

    let fallback = resolve_seed(provider, &favorites[fallback_index]).await?;
    let result = recommendations_for_seed(provider, fallback).await;

    if result.is_empty() {
        tracing::info!("Fallback seed produced no recommendations");
        return Ok(RecommendationResult::empty());
    }

    Ok(result)
}

async fn resolve_seed(provider: &dyn CatalogProvider, item_id: &str) -> AppResult<ResolvedItem> {
    provider.resolve_item_type(item_id).await.map_err(|e| {
        tracing::error!(error = %e, item_id = %item_id, provider = provider.name(), "Failed to resolve seed item");
        AppError::Internal(format!("Failed to resolve item {}: {}", item_id, e))
    })
}

async fn recommendations_for_seed(
    provider: &dyn CatalogProvider,
    seed: ResolvedItem,
) -> RecommendationResult {
    let items = provider.fetch_recommendations(&seed.item.id, seed.kind).await;
    RecommendationResult::new(seed.item.title, items)
}

fn random_index(len: usize) -> AppResult<usize> {
    if len == 0 {
        return Err(AppError::NotFound("User has no favorites".to_string()));
    }
    Ok(rand::thread_rng().gen_range(0..len))
}
