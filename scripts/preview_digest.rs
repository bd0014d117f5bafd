//! Builds today's digest without delivering it.
//!
//! Prints the Telegram text and writes the email HTML to `digest-preview.html`
//! so the layout can be checked in a browser.
//!
//! Run with: cargo run --bin preview-digest

use cyber_digest::config::Settings;
use cyber_digest::digest;
use cyber_digest::global::Global;
use cyber_digest::render;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const PREVIEW_PATH: &str = "digest-preview.html";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .parse_lossy(&config.logging.level),
        )
        .init();

    let global = Global::init(config)?;
    let digest = digest::build(&global).await?;

    println!("Subject: {}\n", render::subject(&digest));
    println!("{}\n", render::plain_text(&digest));

    tokio::fs::write(PREVIEW_PATH, render::html(&digest)).await?;

    println!(
        "{} stories, {} trending terms. HTML written to {PREVIEW_PATH}",
        digest.items.len(),
        digest.trending_terms.len()
    );

    Ok(())
}
