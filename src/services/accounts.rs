//! Registration, authentication and session tokens

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use chrono::{Duration, Utc};
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{SessionStore, UserStore},
    error::{AppError, AppResult},
    models::{NewUser, PasswordHash, ProfileUpdate, Role, SessionToken, User},
};

/// Registration input as received from clients
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Profile changes requested by an authenticated user
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
}

/// 32 random bytes, hex encoded
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hashes a password with Argon2id and a fresh random salt
pub fn hash_password(password: &str) -> AppResult<PasswordHash> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();
    Ok(PasswordHash { phc })
}

/// False for a wrong password and for a stored hash that does not parse
pub fn verify_password(hash: &PasswordHash, password: &str) -> bool {
    match PhcString::new(&hash.phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

// Argon2 is CPU bound; run it on the blocking pool.
async fn hash_password_blocking(password: String) -> AppResult<PasswordHash> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_password_blocking(hash: PasswordHash, password: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn validate_email(email: &str) -> AppResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::InvalidInput("Invalid email address".to_string())),
    }
}

/// Creates a user and stores their password in one step
pub async fn register(users: Arc<dyn UserStore>, registration: Registration) -> AppResult<User> {
    let email = required(&registration.email, "Email")?;
    let name = required(&registration.name, "Name")?;
    if registration.password.is_empty() {
        return Err(AppError::InvalidInput("Password is required".to_string()));
    }
    validate_email(&email)?;

    let hash = hash_password_blocking(registration.password).await?;
    let user = users
        .create_with_password(
            NewUser {
                email,
                name,
                role: Role::User,
            },
            hash,
        )
        .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(user)
}

/// Applies profile changes to the user's own record
///
/// Deactivating the account also ends all of its sessions.
pub async fn update_profile(
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    user_id: Uuid,
    changes: ProfileChanges,
) -> AppResult<User> {
    let email = changes
        .email
        .as_deref()
        .map(|e| required(e, "Email"))
        .transpose()?;
    if let Some(email) = &email {
        validate_email(email)?;
    }
    let name = changes
        .name
        .as_deref()
        .map(|n| required(n, "Name"))
        .transpose()?;

    let user = users
        .update_profile(
            user_id,
            ProfileUpdate {
                email,
                name,
                active: changes.active,
            },
        )
        .await?;

    if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
        let hash = hash_password_blocking(password).await?;
        sessions.set_password(user_id, hash).await?;
        tracing::info!(user_id = %user_id, "Password changed");
    }

    if changes.active == Some(false) {
        let removed = sessions.remove_tokens(user_id).await?;
        tracing::info!(user_id = %user_id, sessions = removed, "User deactivated");
    }

    Ok(user)
}

/// Checks credentials and issues a bearer token
///
/// `login` may be either the email or the name.
pub async fn authenticate(
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    login: &str,
    password: &str,
    token_ttl: Duration,
) -> AppResult<SessionToken> {
    let user = match users.get_by_email_or_name(login.trim()).await {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::Unauthorized(
                "User with that email does not exist".to_string(),
            ))
        }
        Err(e) => return Err(e),
    };

    let valid = match sessions.password_for(user.id).await? {
        Some(hash) => verify_password_blocking(hash, password.to_string()).await?,
        None => false,
    };

    if !valid {
        tracing::warn!(user_id = %user.id, "Rejected login with invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    if !user.active {
        return Err(AppError::Unauthorized("Account is inactive".to_string()));
    }

    let token = SessionToken {
        value: random_token(),
        user_id: user.id,
        expires_at: Utc::now() + token_ttl,
    };
    sessions.create_token(&token).await?;

    tracing::info!(user_id = %user.id, "User authenticated");

    Ok(token)
}

/// Resolves a bearer token to the user id it was issued for
pub async fn user_for_token(sessions: &dyn SessionStore, token: &str) -> AppResult<Uuid> {
    sessions
        .user_for_token(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
}

/// Drops every session of `target`; users may only log themselves out
pub async fn logout(
    sessions: Arc<dyn SessionStore>,
    caller: Uuid,
    target: Uuid,
) -> AppResult<u64> {
    if caller != target {
        return Err(AppError::Forbidden(
            "Unauthorized to logout this user".to_string(),
        ));
    }

    let removed = sessions.remove_tokens(target).await?;
    tracing::info!(user_id = %target, sessions = removed, "User logged out");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use tokio_test::{assert_err, assert_ok};

    fn registration(name: &str) -> Registration {
        Registration {
            email: format!("{}@example.com", name),
            name: name.to_string(),
            password: "s3cret".to_string(),
        }
    }

    fn ttl() -> Duration {
        Duration::hours(1)
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.phc.starts_with("$argon2id$"));
        assert!(!hash.phc.contains("hunter2"));
        assert!(verify_password(&hash, "hunter2"));
        assert!(!verify_password(&hash, "hunter3"));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a.phc, b.phc);
        assert!(verify_password(&a, "same"));
        assert!(verify_password(&b, "same"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let legacy = PasswordHash {
            phc: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08".to_string(),
        };
        assert!(!verify_password(&legacy, "test"));
        assert!(!verify_password(&PasswordHash { phc: String::new() }, ""));
    }

    #[test]
    fn test_random_token_is_hex() {
        let token = random_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, random_token());
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let store = Arc::new(MemoryStore::new());
        let user = register(store.clone(), registration("ana"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);

        let token = authenticate(store.clone(), store.clone(), "ana", "s3cret", ttl())
            .await
            .unwrap();
        assert_eq!(token.user_id, user.id);
        assert_eq!(token.value.len(), 64);

        let by_email = authenticate(
            store.clone(),
            store.clone(),
            "ana@example.com",
            "s3cret",
            ttl(),
        )
        .await;
        assert_ok!(by_email);

        let resolved = user_for_token(&*store, &token.value).await.unwrap();
        assert_eq!(resolved, user.id);
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let store = Arc::new(MemoryStore::new());
        let mut missing_password = registration("ana");
        missing_password.password = String::new();
        assert!(matches!(
            register(store.clone(), missing_password).await,
            Err(AppError::InvalidInput(_))
        ));

        let mut bad_email = registration("ben");
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(
            register(store.clone(), bad_email).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_unauthorized() {
        let store = Arc::new(MemoryStore::new());
        register(store.clone(), registration("ana"))
            .await
            .unwrap();

        let wrong = authenticate(store.clone(), store.clone(), "ana", "nope", ttl()).await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

        let unknown = authenticate(store.clone(), store.clone(), "zoe", "s3cret", ttl()).await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_authenticate() {
        let store = Arc::new(MemoryStore::new());
        let user = register(store.clone(), registration("ana"))
            .await
            .unwrap();
        update_profile(
            store.clone(),
            store.clone(),
            user.id,
            ProfileChanges {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let result = authenticate(store.clone(), store.clone(), "ana", "s3cret", ttl()).await;
        assert_err!(result);
    }

    #[tokio::test]
    async fn test_password_change_applies() {
        let store = Arc::new(MemoryStore::new());
        let user = register(store.clone(), registration("ana"))
            .await
            .unwrap();

        update_profile(
            store.clone(),
            store.clone(),
            user.id,
            ProfileChanges {
                password: Some("n3w".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_err!(authenticate(store.clone(), store.clone(), "ana", "s3cret", ttl()).await);
        assert_ok!(authenticate(store.clone(), store.clone(), "ana", "n3w", ttl()).await);
    }

    #[tokio::test]
    async fn test_logout_only_self() {
        let store = Arc::new(MemoryStore::new());
        let ana = register(store.clone(), registration("ana"))
            .await
            .unwrap();
        let ben = register(store.clone(), registration("ben"))
            .await
            .unwrap();
        let token = authenticate(store.clone(), store.clone(), "ana", "s3cret", ttl())
            .await
            .unwrap();

        let forbidden = logout(store.clone(), ben.id, ana.id).await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

        assert_eq!(logout(store.clone(), ana.id, ana.id).await.unwrap(), 1);
        let after = user_for_token(&*store, &token.value).await;
        assert!(matches!(after, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_register_stores_password_with_user() {
        let store = Arc::new(MemoryStore::new());
        let user = register(store.clone(), registration("ana")).await.unwrap();

        let stored = store.password_for(user.id).await.unwrap().unwrap();
        assert!(verify_password(&stored, "s3cret"));
    }

    #[tokio::test]
    async fn test_conflicting_registration_stores_nothing() {
        let store = Arc::new(MemoryStore::new());
        register(store.clone(), registration("ana")).await.unwrap();

        let mut clash = registration("ana");
        clash.email = "other@example.com".to_string();
        assert!(matches!(
            register(store.clone(), clash).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(store.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivation_revokes_existing_tokens() {
        let store = Arc::new(MemoryStore::new());
        let user = register(store.clone(), registration("ana")).await.unwrap();
        let token = authenticate(store.clone(), store.clone(), "ana", "s3cret", ttl())
            .await
            .unwrap();
        assert_ok!(user_for_token(&*store, &token.value).await);

        update_profile(
            store.clone(),
            store.clone(),
            user.id,
            ProfileChanges {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let after = user_for_token(&*store, &token.value).await;
        assert!(matches!(after, Err(AppError::Unauthorized(_))));
        assert_eq!(store.remove_tokens(user.id).await.unwrap(), 0);
    }
}
