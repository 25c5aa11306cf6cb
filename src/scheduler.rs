use chrono::{ DateTime, Utc };
use tokio::sync::watch;
use tokio::time::Duration;

use crate::error::AppError;
use crate::services::reconciliation_service::wait_for_shutdown;
use crate::services::ReconciliationPipeline;

/// Runs the pipeline on a fixed interval until shutdown is requested.
pub struct Scheduler {
    pipeline: ReconciliationPipeline,
    interval: Duration,
    run_now: bool,
}

impl Scheduler {
    pub fn new(pipeline: ReconciliationPipeline, interval: Duration, run_now: bool) -> Self {
        Self {
            pipeline,
            interval,
            run_now,
        }
    }

    pub async fn start(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_minutes = self.interval.as_secs() / 60,
            run_now = self.run_now,
            "Scheduler started"
        );

        let mut run_immediately = self.run_now;

        loop {
            if !run_immediately {
                if let Some(next) = next_run_at(Utc::now(), self.interval) {
                    tracing::info!("Next sync scheduled at {}", next.format("%Y-%m-%d %H:%M:%S UTC"));
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = wait_for_shutdown(&mut shutdown) => {}
                }
            }
            run_immediately = false;

            if *shutdown.borrow() {
                break;
            }

            match self.pipeline.run(&shutdown).await {
                Ok(report) if report.interrupted => {
                    break;
                }
                Ok(_) => {}
                Err(AppError::NoWallets) => {
                    tracing::error!(critical = true, "No wallets to monitor; will retry next interval");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Sync pass failed");
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

fn next_run_at(now: DateTime<Utc>, interval: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration
        ::from_std(interval)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
}
