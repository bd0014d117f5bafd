use async_trait::async_trait;
use reqwest::Client;

use crate::config::Settings;
use crate::error::DigestError;
use crate::types::Digest;

pub mod discord;
pub mod email;
pub mod telegram;

/// A delivery channel for a finished digest.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, digest: &Digest) -> Result<(), DigestError>;
}

/// Every channel whose credentials are fully configured.
pub fn from_settings(settings: &Settings, client: &Client) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if let Some(n) = telegram::TelegramNotifier::from_config(client.clone(), &settings.telegram) {
        notifiers.push(Box::new(n));
    }

    if let Some(n) = discord::DiscordNotifier::from_config(client.clone(), &settings.discord) {
        notifiers.push(Box::new(n));
    }

    if let Some(n) = email::GmailNotifier::from_config(client.clone(), &settings.email) {
        notifiers.push(Box::new(n));
    }

    notifiers
}
