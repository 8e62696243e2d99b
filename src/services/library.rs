//! Favorites, watchlist, ratings and comments with input validation

use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{Comment, ItemComment},
};

pub const MAX_RATING: i64 = 10;

fn item_id(raw: &str) -> AppResult<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Movie ID is required".to_string()));
    }
    Ok(trimmed)
}

/// Validates a rating in 0..=10
pub fn validate_rating(rating: i64) -> AppResult<u8> {
    if !(0..=MAX_RATING).contains(&rating) {
        tracing::warn!(rating, "Invalid rating value");
        return Err(AppError::InvalidInput(
            "Rating must be between 0 and 10".to_string(),
        ));
    }
    Ok(rating as u8)
}

pub async fn add_favorite(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
) -> AppResult<Vec<String>> {
    let item_id = item_id(raw_item_id)?;
    let favorites = users.add_favorite(user_id, item_id).await?;
    tracing::debug!(user_id = %user_id, item_id = %item_id, count = favorites.len(), "Favorite added");
    Ok(favorites)
}

pub async fn remove_favorite(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
) -> AppResult<Vec<String>> {
    users.remove_favorite(user_id, item_id(raw_item_id)?).await
}

pub async fn is_favorite(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
) -> AppResult<bool> {
    let item_id = item_id(raw_item_id)?;
    Ok(users.get(user_id).await?.is_favorite(item_id))
}

pub async fn add_to_watchlist(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
) -> AppResult<Vec<String>> {
    users.add_to_watchlist(user_id, item_id(raw_item_id)?).await
}

pub async fn remove_from_watchlist(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
) -> AppResult<Vec<String>> {
    users
        .remove_from_watchlist(user_id, item_id(raw_item_id)?)
        .await
}

pub async fn is_on_watchlist(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
) -> AppResult<bool> {
    let item_id = item_id(raw_item_id)?;
    Ok(users.get(user_id).await?.is_on_watchlist(item_id))
}

pub async fn rate(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
    rating: i64,
) -> AppResult<HashMap<String, u8>> {
    let rating = validate_rating(rating)?;
    let item_id = item_id(raw_item_id)?;
    users.set_rating(user_id, item_id, rating).await
}

/// The user's rating for an item, if any; a stored 0 counts as rated
pub async fn rating_for(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
) -> AppResult<Option<u8>> {
    let item_id = item_id(raw_item_id)?;
    Ok(users.get(user_id).await?.rating_for(item_id))
}

pub async fn add_comment(
    users: Arc<dyn UserStore>,
    user_id: Uuid,
    raw_item_id: &str,
    text: &str,
) -> AppResult<Comment> {
    let item_id = item_id(raw_item_id)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput(
            "Comment text is required".to_string(),
        ));
    }

    let comment = users.add_comment(user_id, item_id, text).await?;
    tracing::info!(user_id = %user_id, item_id = %item_id, "Comment added");
    Ok(comment)
}

/// Lists comments on an item; item ids here must be numeric TMDB ids
pub async fn comments_for_item(
    users: Arc<dyn UserStore>,
    raw_item_id: &str,
) -> AppResult<Vec<ItemComment>> {
    let item_id = raw_item_id.trim();
    if item_id.is_empty() || !item_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput("Invalid movie ID".to_string()));
    }

    users.comments_for_item(item_id).await
}
