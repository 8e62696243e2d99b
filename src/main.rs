use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinefind_api::{
    config::{Config, StoreBackend},
    db::{create_pool, run_migrations, MemoryStore, PgStore},
    routes::{create_router, AppState},
    services::{
        digest::DigestScheduler,
        mailer::{LogMailer, Mailer, SmtpMailer},
        providers::{CatalogProvider, TmdbProvider},
        quiz::GeminiAdvisor,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinefind_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let token_ttl = chrono::Duration::seconds(config.token_ttl_secs);

    let catalog: Arc<dyn CatalogProvider> = Arc::new(TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_language.clone(),
    ));

    let mut state = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            run_migrations(&pool).await?;
            AppState::with_store(Arc::new(PgStore::new(pool)), catalog.clone(), token_ttl)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            AppState::with_store(Arc::new(MemoryStore::new()), catalog.clone(), token_ttl)
        }
    };

    match &config.gemini_api_key {
        Some(key) => {
            state = state.with_quiz(Arc::new(GeminiAdvisor::new(
                key.clone(),
                config.gemini_api_url.clone(),
                config.gemini_model.clone(),
            )));
        }
        None => tracing::warn!("GEMINI_API_KEY not set, quiz recommendations disabled"),
    }

    let scheduler = if config.digest_enabled {
        let mailer: Arc<dyn Mailer> = match &config.smtp_host {
            Some(host) => Arc::new(SmtpMailer::new(
                host,
                config.smtp_port,
                config.smtp_username.clone(),
                config.smtp_password.clone(),
                &config.mail_from,
            )?),
            None => {
                tracing::warn!("SMTP_HOST not set, digest emails will only be logged");
                Arc::new(LogMailer)
            }
        };
        let period = Duration::from_secs(config.digest_interval_secs.max(1));
        Some(DigestScheduler::new(state.users.clone(), catalog, mailer, period).start())
    } else {
        tracing::info!("Recommendation digest disabled");
        None
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
