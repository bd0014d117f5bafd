use std::sync::Arc;

use anyhow::Context as _;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::digest;
use crate::global::Global;

pub struct Scheduler {
    global: Arc<Global>,
    cron: String,
}

impl Scheduler {
    pub fn new(global: Arc<Global>, cron: impl Into<String>) -> Self {
        Self {
            global,
            cron: cron.into(),
        }
    }

    /// Registers the digest job and starts ticking. Returns the running
    /// scheduler so the caller decides when to shut it down.
    pub async fn start(&self) -> anyhow::Result<JobScheduler> {
        let sched = JobScheduler::new().await.context("job scheduler")?;

        let global = self.global.clone();
        let job = Job::new_async(self.cron.as_str(), move |_, _| {
            let global = global.clone();
            Box::pin(async move {
                info!("[Digest] Running scheduled digest");
                if let Err(e) = digest::run(&global).await {
                    error!("[Digest] Scheduled run failed: {:#}", e);
                }
            })
        })
        .with_context(|| format!("invalid cron expression: {}", self.cron))?;

        sched.add(job).await.context("schedule digest job")?;

        info!(cron = %self.cron, "Starting scheduler");
        sched.start().await.context("start scheduler")?;

        Ok(sched)
    }
}
