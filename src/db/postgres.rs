use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    db::{SessionStore, UserStore},
    error::{AppError, AppResult},
    models::{Comment, ItemComment, NewUser, PasswordHash, ProfileUpdate, SessionToken, User},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// User row joined with the user's comments aggregated as JSON
const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.name, u.role, u.active, u.favorites, u.watchlist,
           u.ratings, u.created_at,
           COALESCE(
               json_agg(
                   json_build_object('itemId', c.item_id, 'text', c.body, 'createdAt', c.created_at)
                   ORDER BY c.created_at
               ) FILTER (WHERE c.id IS NOT NULL),
               '[]'::json
           ) AS comments
    FROM users u
    LEFT JOIN comments c ON c.user_id = u.id
"#;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    active: bool,
    favorites: Vec<String>,
    watchlist: Vec<String>,
    ratings: Json<HashMap<String, u8>>,
    created_at: DateTime<Utc>,
    comments: Json<Vec<Comment>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(AppError::Internal)?;

        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role,
            active: row.active,
            favorites: row.favorites,
            watchlist: row.watchlist,
            ratings: row.ratings.0,
            comments: row.comments.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemCommentRow {
    username: String,
    body: String,
    created_at: DateTime<Utc>,
}

/// Maps unique-constraint violations on users to `Conflict`
fn map_unique_violation(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            let field = match db_error.constraint() {
                Some(c) if c.contains("email") => "Email",
                Some(c) if c.contains("name") => "Name",
                _ => "Value",
            };
            return AppError::Conflict(format!("{} must be unique", field));
        }
    }
    AppError::Database(error)
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// PostgreSQL-backed user and session store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_field(&self, sql: &str, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, Vec<String>>(sql)
            .bind(id)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(user_not_found)
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO users (id, email, name, role) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(&new_user.email)
            .bind(&new_user.name)
            .bind(new_user.role.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        tracing::info!(user_id = %id, "User created");

        self.get(id).await
    }

    async fn create_with_password(
        &self,
        new_user: NewUser,
        hash: PasswordHash,
    ) -> AppResult<User> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (id, email, name, role) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(&new_user.email)
            .bind(&new_user.name)
            .bind(new_user.role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_unique_violation)?;

        sqlx::query("INSERT INTO passwords (user_id, hash) VALUES ($1, $2)")
            .bind(id)
            .bind(hash.phc)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %id, "User created");

        self.get(id).await
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> AppResult<User> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                name = COALESCE($3, name),
                active = COALESCE($4, active)
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(update.email)
        .bind(update.name)
        .bind(update.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        match updated {
            Some(id) => self.get(id).await,
            None => Err(AppError::NotFound("User not found for update".to_string())),
        }
    }

    async fn get(&self, id: Uuid) -> AppResult<User> {
        let sql = format!("{} WHERE u.id = $1 GROUP BY u.id", USER_SELECT);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(user_not_found)?;

        row.try_into()
    }

    async fn get_by_email_or_name(&self, login: &str) -> AppResult<User> {
        let sql = format!(
            "{} WHERE u.email = $1 OR u.name = $1 GROUP BY u.id LIMIT 1",
            USER_SELECT
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                tracing::warn!(login = %login, "No user found with name/email");
                Err(user_not_found())
            }
        }
    }

    async fn list_active(&self) -> AppResult<Vec<User>> {
        let sql = format!(
            "{} WHERE u.active GROUP BY u.id ORDER BY u.created_at",
            USER_SELECT
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn add_favorite(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        self.list_field(
            r#"
            UPDATE users
            SET favorites = CASE WHEN $2 = ANY(favorites) THEN favorites
                                 ELSE array_append(favorites, $2) END
            WHERE id = $1
            RETURNING favorites
            "#,
            id,
            item_id,
        )
        .await
    }

    async fn remove_favorite(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        self.list_field(
            "UPDATE users SET favorites = array_remove(favorites, $2) WHERE id = $1 RETURNING favorites",
            id,
            item_id,
        )
        .await
    }

    async fn add_to_watchlist(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        self.list_field(
            r#"
            UPDATE users
            SET watchlist = CASE WHEN $2 = ANY(watchlist) THEN watchlist
                                 ELSE array_append(watchlist, $2) END
            WHERE id = $1
            RETURNING watchlist
            "#,
            id,
            item_id,
        )
        .await
    }

    async fn remove_from_watchlist(&self, id: Uuid, item_id: &str) -> AppResult<Vec<String>> {
        self.list_field(
            "UPDATE users SET watchlist = array_remove(watchlist, $2) WHERE id = $1 RETURNING watchlist",
            id,
            item_id,
        )
        .await
    }

    async fn set_rating(
        &self,
        id: Uuid,
        item_id: &str,
        rating: u8,
    ) -> AppResult<HashMap<String, u8>> {
        let ratings = sqlx::query_scalar::<_, Json<HashMap<String, u8>>>(
            r#"
            UPDATE users
            SET ratings = ratings || jsonb_build_object($2::text, $3::int)
            WHERE id = $1
            RETURNING ratings
            "#,
        )
        .bind(id)
        .bind(item_id)
        .bind(i32::from(rating))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(user_not_found)?;

        Ok(ratings.0)
    }

    async fn add_comment(&self, id: Uuid, item_id: &str, text: &str) -> AppResult<Comment> {
        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO comments (id, user_id, item_id, body)
            SELECT $1, u.id, $3, $4 FROM users u WHERE u.id = $2
            RETURNING created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(item_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(user_not_found)?;

        Ok(Comment {
            item_id: item_id.to_string(),
            text: text.to_string(),
            created_at,
        })
    }

    async fn comments_for_item(&self, item_id: &str) -> AppResult<Vec<ItemComment>> {
        let rows = sqlx::query_as::<_, ItemCommentRow>(
            r#"
            SELECT u.name AS username, c.body, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.item_id = $1
            ORDER BY c.created_at
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ItemComment {
                username: row.username,
                text: row.body,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl SessionStore for PgStore {
    async fn set_password(&self, user_id: Uuid, hash: PasswordHash) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO passwords (user_id, hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET hash = EXCLUDED.hash, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(hash.phc)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn password_for(&self, user_id: Uuid) -> AppResult<Option<PasswordHash>> {
        let phc =
            sqlx::query_scalar::<_, String>("SELECT hash FROM passwords WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(phc.map(|phc| PasswordHash { phc }))
    }

    async fn create_token(&self, token: &SessionToken) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let purged = sqlx::query("DELETE FROM tokens WHERE expires_at <= now()")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("INSERT INTO tokens (value, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token.value)
            .bind(token.user_id)
            .bind(token.expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if purged > 0 {
            tracing::debug!(purged, "Removed expired tokens");
        }

        Ok(())
    }

    async fn user_for_token(&self, value: &str) -> AppResult<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT t.user_id
            FROM tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.value = $1 AND t.expires_at > now() AND u.active
            "#,
        )
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }

    async fn remove_tokens(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
