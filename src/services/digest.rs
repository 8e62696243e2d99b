use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};

use crate::{
    db::UserStore,
    error::AppResult,
    models::User,
    services::{
        mailer::{recommendation_email, Mailer},
        providers::CatalogProvider,
        recommendations,
    },
};

/// Outcome of one digest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Delivery {
    Sent,
    Skipped,
}

/// Sends one recommendation email to every active user
///
/// Users are processed one after another. A failure for one user is logged and
/// counted, and the run carries on with the next.
pub async fn run_digest_once(
    users: Arc<dyn UserStore>,
    provider: Arc<dyn CatalogProvider>,
    mailer: Arc<dyn Mailer>,
) -> AppResult<DigestSummary> {
    let active = users.list_active().await?;
    let mut summary = DigestSummary::default();

    for user in &active {
        match deliver(provider.as_ref(), mailer.as_ref(), user).await {
            Ok(Delivery::Sent) => summary.sent += 1,
            Ok(Delivery::Skipped) => summary.skipped += 1,
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Failed to send recommendation email");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        users = active.len(),
        sent = summary.sent,
        skipped = summary.skipped,
        failed = summary.failed,
        "Digest run finished"
    );

    Ok(summary)
}

async fn deliver(
    provider: &dyn CatalogProvider,
    mailer: &dyn Mailer,
    user: &User,
) -> AppResult<Delivery> {
    let Some(pick) = recommendations::pick_for_email(provider, user).await? else {
        tracing::debug!(user_id = %user.id, "No recommendation to send");
        return Ok(Delivery::Skipped);
    };

    mailer
        .send(recommendation_email(&user.email, &user.name, &pick))
        .await?;

    tracing::info!(user_id = %user.id, item_id = %pick.item.id, "Recommendation email sent");
    Ok(Delivery::Sent)
}

/// Handle for stopping the digest scheduler
pub struct DigestSchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DigestSchedulerHandle {
    /// Signals the scheduler and waits for the task to stop
    ///
    /// A run already in progress finishes before the task exits.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Digest scheduler shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Digest scheduler task panicked");
        }
    }
}

pub struct DigestScheduler {
    users: Arc<dyn UserStore>,
    provider: Arc<dyn CatalogProvider>,
    mailer: Arc<dyn Mailer>,
    period: Duration,
}

impl DigestScheduler {
    pub fn new(
        users: Arc<dyn UserStore>,
        provider: Arc<dyn CatalogProvider>,
        mailer: Arc<dyn Mailer>,
        period: Duration,
    ) -> Self {
        Self {
            users,
            provider,
            mailer,
            period,
        }
    }

    /// Spawns the background task; the first run happens one period after start
    pub fn start(self) -> DigestSchedulerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        DigestSchedulerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(period_secs = self.period.as_secs(), "Digest scheduler started");
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = run_digest_once(
                        self.users.clone(),
                        self.provider.clone(),
                        self.mailer.clone(),
                    )
                    .await;
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Digest run failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Digest scheduler stopped");
                    break;
                }
            }
        }
    }
}
