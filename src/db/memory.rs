use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{SessionStore, UserStore},
    error::{AppError, AppResult},
    models::{Comment, ItemComment, NewUser, PasswordHash, ProfileUpdate, SessionToken, User},
};

/// Process-local store for development and tests
///
/// Each mutation holds the write lock for its whole duration, which gives the
/// same per-field atomicity as the SQL store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: HashMap<Uuid, User>,
    passwords: HashMap<Uuid, PasswordHash>,
    tokens: HashMap<String, SessionToken>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStoreInner {
    fn user_mut(&mut self, id: Uuid) -> AppResult<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    fn ensure_unique(&self, id: Option<Uuid>, email: &str, name: &str) -> AppResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != id) {
            if user.email == email {
                return Err(AppError::Conflict("Email must be unique".to_string()));
            }
            if user.name == name {
                return Err(AppError::Conflict("Name must be unique".to_string()));
            }
        }
        Ok(())
    }

    fn insert_user(&mut self, new_user: NewUser) -> AppResult<User> {
        self.ensure_unique(None, &new_user.email, &new_user.name)?;

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            role: new_user.role,
            active: true,
            favorites: Vec::new(),
            watchlist: Vec::new(),
            ratings: HashMap::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        self.inner.write().await.insert_user(new_user)
    }

    async fn create_with_password(
        &self,
        new_user: NewUser,
        hash: PasswordHash,
    ) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        let user = inner.insert_user(new_user)?;
        inner.passwords.insert(user.id, hash);
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        let current = inner
            .users
            .get(&id)
            .ok_or_else(|| AppError::NotFound("User not found for update".to_string()))?;

        let email = update.email.unwrap_or_else(|| current.email.clone());
        let name = update.name.unwrap_or_else(|| current.name.clone());
        inner.ensure_unique(Some(id), &email, &name)?;

        let user = inner.user_mut(id)?;
        user.email = email;
        user.name = name;
        if let Some(active) = update.active {
            user.active = active;
        }
        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<User> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn get_by_email_or_name(&self, login: &str) -> AppResult<User> {
        self.inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == login || u.name == login)
            .cloned()
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn list_active(&self) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().filter(|u| u.active).cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn add_favorite(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        if !user.is_favorite(item_id) {
            user.favorites.push(item_id.to_string());
        }
        Ok(user.favorites.clone())
    }

    async fn remove_favorite(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.favorites.retain(|f| f != item_id);
        Ok(user.favorites.clone())
    }

    async fn add_to_watchlist(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        if !user.is_on_watchlist(item_id) {
            user.watchlist.push(item_id.to_string());
        }
        Ok(user.watchlist.clone())
    }

    async fn remove_from_watchlist(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.watchlist.retain(|w| w != item_id);
        Ok(user.watchlist.clone())
    }

    async fn set_rating(
        &self,
        id: Uuid,
        item_id: &str,
        rating: u8,
    ) -> AppResult<HashMap<String, u8>> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.ratings.insert(item_id.to_string(), rating);
        Ok(user.ratings.clone())
    }

    async fn add_comment(&self, id: Uuid, item_id: &str, text: &str) -> AppResult<Comment> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        let comment = Comment {
            item_id: item_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        user.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comments_for_item(&self, item_id: &str) -> AppResult<Vec<ItemComment>> {
        let inner = self.inner.read().await;
        let mut comments: Vec<ItemComment> = inner
            .users
            .values()
            .flat_map(|user| {
                user.comments
                    .iter()
                    .filter(|c| c.item_id == item_id)
                    .map(|c| ItemComment {
                        username: user.name.clone(),
                        text: c.text.clone(),
                        created_at: c.created_at,
                    })
            })
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn set_password(&self, user_id: Uuid, hash: PasswordHash) -> AppResult<()> {
        self.inner.write().await.passwords.insert(user_id, hash);
        Ok(())
    }

    async fn password_for(&self, user_id: Uuid) -> AppResult<Option<PasswordHash>> {
        Ok(self.inner.read().await.passwords.get(&user_id).cloned())
    }

    async fn create_token(&self, token: &SessionToken) -> AppResult<()> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        inner.tokens.retain(|_, t| !t.is_expired(now));
        inner.tokens.insert(token.value.clone(), token.clone());
        Ok(())
    }

    async fn user_for_token(&self, value: &str) -> AppResult<Option<Uuid>> {
        let now = Utc::now();
        let inner = self.inner.read().await;
        Ok(inner
            .tokens
            .get(value)
            .filter(|t| !t.is_expired(now))
            .filter(|t| inner.users.get(&t.user_id).is_some_and(|u| u.active))
            .map(|t| t.user_id))
    }

    async fn remove_tokens(&self, user_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - inner.tokens.len()) as u64)
    }
}
