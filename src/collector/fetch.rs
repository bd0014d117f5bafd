use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::DigestError;
use crate::types::{FeedSource, RawEntry};

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>, DigestError>;
}

pub struct HttpFeedFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    #[tracing::instrument(skip(self), fields(source = %source))]
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>, DigestError> {
        let response = self
            .client
            .get(source.url())
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DigestError::from_response("feed", response).await);
        }

        let bytes = response.bytes().await?;
        let entries = parse_entries(&bytes)?;

        tracing::debug!(count = entries.len(), "parsed feed");

        Ok(entries)
    }
}

/// Parses RSS, Atom or JSON Feed bytes into raw entries.
///
/// RSS 2.0 is read with `rss`, which keeps `<enclosure>` apart from MediaRSS
/// content. Everything else (Atom, RSS 1.0, JSON Feed) goes through `feed-rs`.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<RawEntry>, DigestError> {
    if let Ok(channel) = rss::Channel::read_from(bytes) {
        return Ok(channel.items().iter().map(RawEntry::from).collect());
    }

    let feed = feed_rs::parser::parse(bytes)?;
    Ok(feed.entries.into_iter().map(RawEntry::from).collect())
}
