use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::Notifier;
use crate::config::{non_empty, TelegramConfig};
use crate::error::DigestError;
use crate::render;
use crate::types::Digest;

const API_BASE: &str = "https://api.telegram.org";
const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn from_config(client: Client, config: &TelegramConfig) -> Option<Self> {
        Some(Self {
            client,
            token: non_empty(&config.token)?.to_string(),
            chat_id: non_empty(&config.chat_id)?.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, digest: &Digest) -> Result<(), DigestError> {
        let text = render::plain_text_within(digest, MAX_MESSAGE_CHARS);

        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(format!("{API_BASE}/bot{}/sendMessage", self.token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.without_url())?;

        if !response.status().is_success() {
            return Err(DigestError::from_response("telegram", response).await);
        }

        tracing::info!(chat_id = %self.chat_id, chars = text.chars().count(), "telegram message sent");

        Ok(())
    }
}
