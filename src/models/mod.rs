use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

mod user;

pub use user::{
    Comment, ItemComment, NewUser, PasswordHash, ProfileUpdate, Role, SessionToken, User,
};

/// Minimum TMDB vote average for an item to be recommended
pub const MIN_RECOMMENDATION_RATING: f64 = 5.0;

/// Reason reported when neither the seed nor the fallback seed produced anything
pub const NO_RECOMMENDATIONS_REASON: &str = "No recommendations found";

/// Distinguishes which TMDB endpoint family an item lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    /// Path segment TMDB uses for this kind
    pub fn path_segment(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "tv" | "series" => Ok(MediaKind::Series),
            other => Err(format!("Unknown media kind: {}", other)),
        }
    }
}

/// A movie or series as returned to clients. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    pub overview: Option<String>,
    pub rating: f64,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

/// A seed item together with the kind it resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub kind: MediaKind,
    pub item: CatalogItem,
}

/// Keeps items rated at least [`MIN_RECOMMENDATION_RATING`], best first
pub fn rank_recommendations(mut items: Vec<CatalogItem>) -> Vec<CatalogItem> {
    items.retain(|item| item.rating >= MIN_RECOMMENDATION_RATING);
    items.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    items
}

/// Recommendations for a user, explained by the seed item's title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResult {
    pub reason: String,
    pub recommendations: Vec<CatalogItem>,
}

impl RecommendationResult {
    pub fn new(reason: impl Into<String>, recommendations: Vec<CatalogItem>) -> Self {
        Self {
            reason: reason.into(),
            recommendations: rank_recommendations(recommendations),
        }
    }

    pub fn empty() -> Self {
        Self {
            reason: NO_RECOMMENDATIONS_REASON.to_string(),
            recommendations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

/// Catalog listings exposed by the browse endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Trending(MediaKind),
    TopRated(MediaKind),
    Upcoming,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Movie or series entry as it appears in TMDB detail and list responses
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbItem {
    pub id: u64,
    /// Set for movies
    #[serde(default)]
    pub title: Option<String>,
    /// Set for series
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl TmdbItem {
    /// Converts to a [`CatalogItem`], trusting `media_type` when TMDB sends one
    pub fn into_catalog_item(self, fallback_kind: MediaKind) -> CatalogItem {
        let kind = self
            .media_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(fallback_kind);

        CatalogItem {
            id: self.id.to_string(),
            kind,
            title: self.title.or(self.name).unwrap_or_default(),
            overview: self.overview.filter(|o| !o.is_empty()),
            rating: self.vote_average,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
        }
    }
}

/// Paged TMDB list response
#[derive(Debug, Deserialize)]
pub struct TmdbPage {
    #[serde(default)]
    pub results: Vec<TmdbItem>,
}

#[cfg(test)]
pub(crate) fn test_item(id: &str, rating: f64) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        kind: MediaKind::Movie,
        title: format!("Title {}", id),
        overview: None,
        rating,
        poster_path: None,
        backdrop_path: None,
    }
}
