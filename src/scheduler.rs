use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::broadcast::Broadcaster;

/// Wrapper around tokio-cron-scheduler for background jobs
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    /// Add a recurring cron job
    pub async fn add_cron_job<F>(&self, cron_expr: &str, name: &str, task: F) -> Result<()>
    where
        F: Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
            + Send
            + Sync
            + 'static,
    {
        let job_name = name.to_string();
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let name = job_name.clone();
            let fut = task();
            Box::pin(async move {
                info!("Running scheduled job: {}", name);
                fut.await;
            })
        })
        .with_context(|| format!("Failed to create cron job: {}", name))?;

        self.inner
            .add(job)
            .await
            .with_context(|| format!("Failed to add job: {}", name))?;

        info!("Scheduled job '{}' with cron: {}", name, cron_expr);
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started");
        Ok(())
    }
}

/// Register the recurring quote broadcast.
pub async fn register_daily_broadcast(
    scheduler: &Scheduler,
    broadcaster: Arc<Broadcaster>,
    cron_expr: &str,
) -> Result<()> {
    scheduler
        .add_cron_job(cron_expr, "daily-quote", move || {
            let broadcaster = Arc::clone(&broadcaster);
            Box::pin(async move {
                let report = broadcaster.run().await;
                info!(
                    "Daily quote run: {} delivered, {} failed",
                    report.delivered, report.failed
                );
            })
        })
        .await
}
