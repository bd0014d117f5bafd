use cyber_digest::config::{non_empty, Settings};
use cyber_digest::digest;
use cyber_digest::global::Global;
use cyber_digest::scheduler::Scheduler;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new()?;

    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .parse_lossy(&config.logging.level),
        )
        .init();

    tracing::info!("starting cybersecurity digest");

    let cron = non_empty(&config.schedule.cron).map(str::to_string);
    let global = Global::init(config)?;

    let Some(cron) = cron else {
        return digest::run(&global).await;
    };

    let mut sched = Scheduler::new(global, cron).start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    sched.shutdown().await?;

    Ok(())
}
