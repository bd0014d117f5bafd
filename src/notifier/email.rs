use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::Notifier;
use crate::config::{non_empty, EmailConfig};
use crate::error::DigestError;
use crate::render;
use crate::types::Digest;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Sends the HTML digest through the Gmail API. The sender is the visible
/// recipient; the real recipients go in `Bcc`.
pub struct GmailNotifier {
    client: Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    sender: String,
    recipients: Vec<String>,
}

impl GmailNotifier {
    pub fn from_config(client: Client, config: &EmailConfig) -> Option<Self> {
        let recipients: Vec<String> = config
            .recipients
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        if recipients.is_empty() {
            return None;
        }

        Some(Self {
            client,
            client_id: non_empty(&config.client_id)?.to_string(),
            client_secret: non_empty(&config.client_secret)?.to_string(),
            refresh_token: non_empty(&config.refresh_token)?.to_string(),
            sender: non_empty(&config.sender)?.to_string(),
            recipients,
        })
    }

    async fn access_token(&self) -> Result<String, DigestError> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DigestError::from_response("oauth", response).await);
        }

        let token: TokenResponse = response.json().await?;
        if token.access_token.is_empty() {
            return Err(DigestError::MissingCredential("gmail access token"));
        }

        Ok(token.access_token)
    }
}

#[async_trait]
impl Notifier for GmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, digest: &Digest) -> Result<(), DigestError> {
        let message = mime_message(
            &self.sender,
            &self.recipients,
            &render::subject(digest),
            &render::html(digest),
        );

        let token = self.access_token().await?;

        let response = self
            .client
            .post(SEND_URL)
            .bearer_auth(token)
            .json(&json!({ "raw": URL_SAFE.encode(message) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DigestError::from_response("gmail", response).await);
        }

        let sent: SendResponse = response.json().await?;
        tracing::info!(id = %sent.id, recipients = self.recipients.len(), "gmail message sent");

        Ok(())
    }
}

/// RFC 5322 message with a base64 HTML body and an encoded-word subject.
pub fn mime_message(sender: &str, recipients: &[String], subject: &str, html: &str) -> String {
    let body = STANDARD.encode(html);
    let wrapped: Vec<&str> = body
        .as_bytes()
        .chunks(76)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect();

    format!(
        "From: {sender}\r\n\
         To: {sender}\r\n\
         Bcc: {bcc}\r\n\
         Subject: =?UTF-8?B?{subject}?=\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: text/html; charset=\"UTF-8\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         {body}\r\n",
        bcc = recipients.join(", "),
        subject = STANDARD.encode(subject),
        body = wrapped.join("\r\n"),
    )
}
