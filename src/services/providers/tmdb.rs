//! TMDB (The Movie Database) API provider
//!
//! API Flow:
//! 1. Kind resolution: /movie/{id} then /tv/{id}
//! 2. Recommendations: /{movie|tv}/{id}/recommendations
//! 3. Browse: details, credits, release dates, similar titles and listings

use crate::{
    error::{AppError, AppResult},
    models::{
        rank_recommendations, CatalogItem, Listing, MediaKind, ResolvedItem, TmdbItem, TmdbPage,
    },
    services::providers::CatalogProvider,
};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
}

/// Outcome of trying one endpoint family during kind resolution
enum Lookup {
    Found(TmdbItem),
    Missing,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    async fn send(&self, path: &str) -> AppResult<Response> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        Ok(response)
    }

    /// GETs a path and decodes the body, turning non-2xx statuses into errors
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self.send(path).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {} not found", path)));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn try_kind(&self, id: &str, kind: MediaKind) -> Lookup {
        let path = format!("{}/{}", kind.path_segment(), id);

        match self.get_json::<TmdbItem>(&path).await {
            Ok(item) => Lookup::Found(item),
            Err(AppError::NotFound(_)) => Lookup::Missing,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    item_id = %id,
                    kind = %kind,
                    provider = "tmdb",
                    "Item lookup failed"
                );
                Lookup::Missing
            }
        }
    }

    async fn list(&self, path: &str, kind: MediaKind) -> AppResult<Vec<CatalogItem>> {
        let page: TmdbPage = self.get_json(path).await?;

        Ok(page
            .results
            .into_iter()
            .map(|item| item.into_catalog_item(kind))
            .collect())
    }
}

/// TMDB path for a catalog listing, with the kind its entries default to
pub(crate) fn listing_path(listing: Listing) -> (String, MediaKind) {
    match listing {
        Listing::Trending(kind) => (format!("trending/{}/week", kind.path_segment()), kind),
        Listing::TopRated(kind) => (format!("{}/top_rated", kind.path_segment()), kind),
        Listing::Upcoming => ("movie/upcoming".to_string(), MediaKind::Movie),
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn resolve_item_type(&self, id: &str) -> AppResult<ResolvedItem> {
        for kind in [MediaKind::Movie, MediaKind::Series] {
            if let Lookup::Found(item) = self.try_kind(id, kind).await {
                tracing::debug!(item_id = %id, kind = %kind, "Resolved item kind");
                return Ok(ResolvedItem {
                    kind,
                    item: item.into_catalog_item(kind),
                });
            }
        }

        Err(AppError::NotFound(format!("No item found with id {}", id)))
    }

    async fn fetch_recommendations(&self, id: &str, kind: MediaKind) -> Vec<CatalogItem> {
        let path = format!("{}/{}/recommendations", kind.path_segment(), id);

        match self.list(&path, kind).await {
            Ok(items) => {
                let ranked = rank_recommendations(items);
                tracing::info!(
                    item_id = %id,
                    kind = %kind,
                    results = ranked.len(),
                    provider = "tmdb",
                    "Recommendations fetched"
                );
                ranked
            }
            Err(e) => {
                tracing::error!(error = %e, item_id = %id, kind = %kind, "Failed to fetch recommendations");
                Vec::new()
            }
        }
    }

    async fn details(&self, id: &str, kind: MediaKind) -> AppResult<serde_json::Value> {
        self.get_json(&format!("{}/{}", kind.path_segment(), id))
            .await
    }

    async fn credits(&self, id: &str, kind: MediaKind) -> AppResult<serde_json::Value> {
        self.get_json(&format!("{}/{}/credits", kind.path_segment(), id))
            .await
    }

    async fn release_dates(&self, id: &str, kind: MediaKind) -> AppResult<serde_json::Value> {
        let path = match kind {
            MediaKind::Movie => format!("movie/{}/release_dates", id),
            MediaKind::Series => format!("tv/{}/content_ratings", id),
        };
        self.get_json(&path).await
    }

    async fn similar(&self, id: &str, kind: MediaKind) -> AppResult<Vec<CatalogItem>> {
        self.list(&format!("{}/{}/similar", kind.path_segment(), id), kind)
            .await
    }

    async fn listing(&self, listing: Listing) -> AppResult<Vec<CatalogItem>> {
        let (path, kind) = listing_path(listing);
        let items = self.list(&path, kind).await?;

        tracing::info!(path = %path, results = items.len(), provider = "tmdb", "Listing fetched");

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
