use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::config::Settings;

pub struct Global {
    pub config: Settings,
    pub http_client: reqwest::Client,
    pub started_at: std::time::Instant,
}

impl Global {
    pub fn init(config: Settings) -> anyhow::Result<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.http.user_agent)
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()
            .context("http client")?;

        Ok(Arc::new(Self {
            config,
            http_client,
            started_at: std::time::Instant::now(),
        }))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.http.timeout_secs)
    }
}
