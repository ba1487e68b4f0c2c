//! Job scheduler using tokio-cron-scheduler - runs the counter sweeper.

use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
    /// How often the local store sweeps expired counter entries.
    pub sweep_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            sweep_interval: Duration::from_secs(
                std::env::var("SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }
}

/// Job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    /// Create a new scheduler.
    pub async fn new() -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner })
    }

    /// Add a job repeating on a fixed interval.
    pub async fn add_repeated<F, Fut>(
        &self,
        every: Duration,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_repeated_async(every, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(every_secs = every.as_secs(), job_id = %id, "Repeated job registered");
        Ok(id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}
