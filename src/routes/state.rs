use std::sync::Arc;

use crate::{
    db::{SessionStore, UserStore},
    services::{providers::CatalogProvider, quiz::QuizAdvisor},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub catalog: Arc<dyn CatalogProvider>,
    /// `None` when no text model is configured; the quiz endpoint then answers 503
    pub quiz: Option<Arc<dyn QuizAdvisor>>,
    pub token_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        catalog: Arc<dyn CatalogProvider>,
        token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            catalog,
            quiz: None,
            token_ttl,
        }
    }

    /// Builds state around a single store that keeps both users and sessions
    pub fn with_store<S>(
        store: Arc<S>,
        catalog: Arc<dyn CatalogProvider>,
        token_ttl: chrono::Duration,
    ) -> Self
    where
        S: UserStore + SessionStore + 'static,
    {
        Self::new(store.clone(), store, catalog, token_ttl)
    }

    pub fn with_quiz(mut self, advisor: Arc<dyn QuizAdvisor>) -> Self {
        self.quiz = Some(advisor);
        self
    }
}
