use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Display, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A comment as stored on the author's record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub item_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A comment as listed under an item, attributed to its author
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemComment {
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A user account with its library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    /// External item ids in insertion order, without duplicates
    pub favorites: Vec<String>,
    pub watchlist: Vec<String>,
    /// Item id to rating in 0..=10
    pub ratings: HashMap<String, u8>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_favorite(&self, item_id: &str) -> bool {
        self.favorites.iter().any(|id| id == item_id)
    }

    pub fn is_on_watchlist(&self, item_id: &str) -> bool {
        self.watchlist.iter().any(|id| id == item_id)
    }

    pub fn rating_for(&self, item_id: &str) -> Option<u8> {
        self.ratings.get(item_id).copied()
    }
}

/// Fields required to register a user
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Partial profile update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
}

/// Argon2id hash in PHC string form; salt and parameters travel inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub phc: String,
}

/// Bearer token issued on authentication
#[derive(Debug, Clone, PartialEq)]
pub struct SessionToken {
    pub value: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
