use crate::model::{CycleReport, Synchronizer};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleResult {
    Completed(CycleReport),
    Failed { error: String, at: String },
}

/// Outcome of the most recent cycle, shared with the status server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub cycles: u64,
    pub last_cycle: Option<CycleResult>,
}

pub type SharedStatus = Arc<RwLock<SyncStatus>>;

pub struct Daemon {
    synchronizer: Synchronizer,
    interval: Duration,
    status: SharedStatus,
}

impl Daemon {
    pub fn new(synchronizer: Synchronizer, status: SharedStatus) -> Self {
        let interval = synchronizer.config().interval;
        Self {
            synchronizer,
            interval,
            status,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs cycles until `shutdown` flips to `true` or its sender is dropped.
    /// A cycle in progress always runs to completion; only the wait is interrupted.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let minutes = self.interval.as_secs() / 60;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tracing::info!(
                "Starting download cycle at {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );

            let result = match self.synchronizer.run_cycle().await {
                Ok(report) => {
                    tracing::info!(
                        "Download cycle completed at {} ({} verified, {} downloaded)",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        report.verified,
                        report.downloaded
                    );
                    CycleResult::Completed(report)
                }
                Err(e) => {
                    tracing::error!("Error in download cycle: {}", e);
                    tracing::info!("Will retry in {} minutes...", minutes);
                    CycleResult::Failed {
                        error: e.to_string(),
                        at: chrono::Utc::now().to_rfc3339(),
                    }
                }
            };

            {
                let mut status = self.status.write().await;
                status.cycles += 1;
                status.last_cycle = Some(result);
            }

            if *shutdown.borrow() {
                break;
            }

            tracing::info!("Waiting {} minutes until next cycle...", minutes);
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Shutting down gracefully...");
    }
}

/// Resolves once SIGINT or SIGTERM is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received. Will exit after current cycle completes...");
}
