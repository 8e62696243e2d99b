//! Persistence seams for user accounts and sessions
//!
//! Every list or map mutation is a single field-scoped operation on the store.
//! Concurrent mutations of the same user never lose updates.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Comment, ItemComment, NewUser, PasswordHash, ProfileUpdate, SessionToken, User},
};

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user; fails with `Conflict` when the email or name is taken
    async fn create(&self, new_user: NewUser) -> AppResult<User>;

    /// Creates a user together with their password; neither is stored if either fails
    async fn create_with_password(
        &self,
        new_user: NewUser,
        hash: PasswordHash,
    ) -> AppResult<User>;

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> AppResult<User>;

    /// Fails with `NotFound` for unknown ids
    async fn get(&self, id: Uuid) -> AppResult<User>;

    async fn get_by_email_or_name(&self, login: &str) -> AppResult<User>;

    async fn list_active(&self) -> AppResult<Vec<User>>;

    /// Appends the item unless already present; returns the resulting list
    async fn add_favorite(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>>;

    async fn remove_favorite(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>>;

    async fn add_to_watchlist(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>>;

    async fn remove_from_watchlist(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>>;

    /// Sets one rating; returns the full ratings map
    async fn set_rating(&self, id: Uuid, item_id: &str, rating: u8)
        -> AppResult<HashMap<String, u8>>;

    async fn add_comment(&self, id: Uuid, item_id: &str, text: &str) -> AppResult<Comment>;

    /// All comments on an item across users, oldest first
    async fn comments_for_item(&self, item_id: &str) -> AppResult<Vec<ItemComment>>;
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn set_password(&self, user_id: Uuid, hash: PasswordHash) -> AppResult<()>;

    async fn password_for(&self, user_id: Uuid) -> AppResult<Option<PasswordHash>>;

    /// Stores a token and drops every expired one
    async fn create_token(&self, token: &SessionToken) -> AppResult<()>;

    /// Resolves a bearer token to its user, ignoring expired tokens and inactive users
    async fn user_for_token(&self, value: &str) -> AppResult<Option<Uuid>>;

    /// Removes every token of the user; returns how many were removed
    async fn remove_tokens(&self, user_id: Uuid) -> AppResult<u64>;
}
