use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::Notifier;
use crate::config::{non_empty, DiscordConfig};
use crate::error::DigestError;
use crate::render;
use crate::types::{Digest, DigestItem};
use crate::util::truncate_chars;

const EMBED_COLOR: u32 = 0xC0392B;
const MAX_EMBEDS: usize = 10;
const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_CHARS: usize = 350;
const MAX_CONTENT_CHARS: usize = 2000;

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn from_config(client: Client, config: &DiscordConfig) -> Option<Self> {
        Some(Self {
            client,
            webhook_url: non_empty(&config.webhook_url)?.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn deliver(&self, digest: &Digest) -> Result<(), DigestError> {
        for payload in payloads(digest) {
            let response = self
                .client
                .post(&self.webhook_url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| e.without_url())?;

            if !response.status().is_success() {
                tracing::warn!(status = %response.status(), "discord notification failed");
                return Err(DigestError::from_response("discord", response).await);
            }
        }

        tracing::info!(count = digest.items.len(), "discord notification sent");

        Ok(())
    }
}

/// Webhook bodies: the header and trend summary ride on the first message,
/// stories follow as embeds in batches of ten.
pub fn payloads(digest: &Digest) -> Vec<Value> {
    let embeds: Vec<Value> = digest.items.iter().map(embed).collect();
    let content = truncate_chars(&header(digest), MAX_CONTENT_CHARS);

    if embeds.is_empty() {
        return vec![json!({ "content": content })];
    }

    embeds
        .chunks(MAX_EMBEDS)
        .enumerate()
        .map(|(i, batch)| {
            if i == 0 {
                json!({ "content": content, "embeds": batch })
            } else {
                json!({ "embeds": batch })
            }
        })
        .collect()
}

fn header(digest: &Digest) -> String {
    let mut out = render::headline(digest);

    if let Some(brief) = &digest.trend_brief {
        out.push_str("\n\n");
        out.push_str(brief);
    } else if !digest.trending_terms.is_empty() {
        out.push_str("\n\nTrending: ");
        out.push_str(&digest.trending_terms.join(", "));
    }

    out
}

fn embed(item: &DigestItem) -> Value {
    let article = &item.article;

    let mut embed = json!({
        "title": truncate_chars(&article.title, MAX_TITLE_CHARS),
        "description": truncate_chars(&item.body, MAX_DESCRIPTION_CHARS),
        "color": EMBED_COLOR,
        "timestamp": article.published_at.to_rfc3339(),
    });

    if !article.link.is_empty() {
        embed["url"] = json!(article.link);
    }

    if article.has_image() {
        embed["image"] = json!({ "url": article.image_url });
    }

    embed
}
