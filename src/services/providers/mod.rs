//! Catalog metadata provider abstraction
//!
//! The recommendation workflow and the browse endpoints only talk to this trait,
//! so the TMDB client can be swapped for a fake in tests.

use crate::{
    error::AppResult,
    models::{CatalogItem, Listing, MediaKind, ResolvedItem},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Finds out whether an id names a movie or a series
    ///
    /// Tries the movie endpoint first, then the series endpoint. Fails with
    /// `NotFound` when neither answers successfully.
    async fn resolve_item_type(&self, id: &str) -> AppResult<ResolvedItem>;

    /// Recommendations for an item, rated at least 5 and best first
    ///
    /// Never fails: any upstream problem yields an empty list.
    async fn fetch_recommendations(&self, id: &str, kind: MediaKind) -> Vec<CatalogItem>;

    /// Raw detail payload for an item
    async fn details(&self, id: &str, kind: MediaKind) -> AppResult<serde_json::Value>;

    /// Cast and crew
    async fn credits(&self, id: &str, kind: MediaKind) -> AppResult<serde_json::Value>;

    /// Release dates for movies, content ratings for series
    async fn release_dates(&self, id: &str, kind: MediaKind) -> AppResult<serde_json::Value>;

    async fn similar(&self, id: &str, kind: MediaKind) -> AppResult<Vec<CatalogItem>>;

    async fn listing(&self, listing: Listing) -> AppResult<Vec<CatalogItem>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
