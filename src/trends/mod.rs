use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::config::{non_empty, TrendsConfig};
use crate::error::DigestError;

pub struct TrendsClient {
    client: Client,
    api_key: String,
    base_url: String,
    woeid: u32,
    count: usize,
    keywords: Vec<String>,
    timeout: Duration,
}

impl TrendsClient {
    /// `None` when no API key is configured.
    pub fn from_config(client: Client, config: &TrendsConfig, timeout: Duration) -> Option<Self> {
        let api_key = non_empty(&config.api_key)?.to_string();

        Some(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            woeid: config.woeid,
            count: config.count,
            keywords: config.keywords.clone(),
            timeout,
        })
    }

    /// Up to `count` trending terms. Falls back from the trends endpoint to
    /// keyword counts over popular tweets, then to the configured keywords.
    #[tracing::instrument(name = "trends", skip_all)]
    pub async fn fetch_top_terms(&self) -> Vec<String> {
        match self.trending().await {
            Ok(terms) if !terms.is_empty() => {
                tracing::info!(count = terms.len(), "using trends endpoint");
                return terms;
            }
            Ok(_) => tracing::info!("trends endpoint returned nothing usable"),
            Err(e) => tracing::warn!(error = %e, "trends endpoint failed"),
        }

        match self.search_ranked().await {
            Ok(terms) if !terms.is_empty() => {
                tracing::info!(count = terms.len(), "using keyword search ranking");
                return terms;
            }
            Ok(_) => tracing::info!("keyword search matched nothing"),
            Err(e) => tracing::warn!(error = %e, "keyword search failed"),
        }

        tracing::info!("falling back to static keywords");
        self.keywords.iter().take(self.count).cloned().collect()
    }

    async fn trending(&self) -> Result<Vec<String>, DigestError> {
        let response = self
            .client
            .get(format!("{}/twitter/trends", self.base_url))
            .header("x-api-key", &self.api_key)
            .query(&[("woeid", self.woeid.to_string())])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DigestError::from_response("trends", response).await);
        }

        let body: Value = response.json().await?;
        Ok(extract_terms(&body, self.count))
    }

    async fn search_ranked(&self) -> Result<Vec<String>, DigestError> {
        let query = self.keywords.join(" OR ");

        let response = self
            .client
            .get(format!("{}/twitter/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .query(&[
                ("q", query.as_str()),
                ("result_type", "popular"),
                ("count", "100"),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DigestError::from_response("search", response).await);
        }

        let body: Value = response.json().await?;
        let texts = extract_texts(&body);

        Ok(rank_keywords(&texts, &self.keywords, self.count))
    }
}

/// Term names from a trends payload. Items carry the term under `name` or
/// `trend`, the latter either a string or an object with its own `name`.
pub fn extract_terms(body: &Value, count: usize) -> Vec<String> {
    let Some(trends) = body.get("trends").and_then(Value::as_array) else {
        return Vec::new();
    };

    trends
        .iter()
        .filter_map(|item| {
            let raw = item
                .get("name")
                .and_then(Value::as_str)
                .or_else(|| match item.get("trend") {
                    Some(Value::String(s)) => Some(s.as_str()),
                    Some(obj) => obj.get("name").and_then(Value::as_str),
                    None => None,
                })?;
            let term = raw.trim().trim_start_matches('#').trim();
            (!term.is_empty()).then(|| term.to_string())
        })
        .take(count)
        .collect()
}

fn extract_texts(body: &Value) -> String {
    ["statuses", "tweets"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(|tweet| tweet.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keywords ordered by case-insensitive occurrence count in `texts`,
/// ties in keyword order, zero counts dropped.
pub fn rank_keywords(texts: &str, keywords: &[String], count: usize) -> Vec<String> {
    let haystack = texts.to_lowercase();

    let mut counted: Vec<(usize, &String)> = keywords
        .iter()
        .map(|kw| (haystack.matches(&kw.to_lowercase()).count(), kw))
        .filter(|(n, _)| *n > 0)
        .collect();

    // stable sort keeps keyword order for ties
    counted.sort_by(|a, b| b.0.cmp(&a.0));

    counted
        .into_iter()
        .take(count)
        .map(|(_, kw)| kw.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keywords() -> Vec<String> {
        crate::config::DEFAULT_KEYWORDS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_extract_terms() {
        let body = json!({
            "trends": [
                { "name": "#Ransomware" },
                { "trend": "CVE-2026-1234" },
                { "trend": { "name": "#LockBit", "rank": 3 } },
                { "name": "#" },
                { "volume": 12 },
                { "name": "Phishing" }
            ]
        });

        assert_eq!(
            extract_terms(&body, 5),
            ["Ransomware", "CVE-2026-1234", "LockBit", "Phishing"]
        );
        assert_eq!(extract_terms(&body, 2), ["Ransomware", "CVE-2026-1234"]);
        assert!(extract_terms(&json!({ "error": "bad key" }), 5).is_empty());
    }

    #[test]
    fn test_extract_texts() {
        let body = json!({
            "statuses": [{ "text": "first" }, { "id": 2 }],
            "tweets": [{ "text": "second" }]
        });

        assert_eq!(extract_texts(&body), "first second");
    }

    #[test]
    fn test_rank_keywords() {
        let texts = "Ransomware again. New RANSOMWARE strain, phishing wave, \
                     cve-2026-0001 and CVE-2026-0002, more ransomware";

        assert_eq!(
            rank_keywords(texts, &keywords(), 5),
            ["ransomware", "CVE", "phishing"]
        );
        assert_eq!(rank_keywords(texts, &keywords(), 1), ["ransomware"]);
        assert!(rank_keywords("nothing relevant", &keywords(), 5).is_empty());
    }

    #[test]
    fn test_disabled_without_key() {
        let config = TrendsConfig::default();
        assert!(TrendsClient::from_config(Client::new(), &config, Duration::from_secs(5)).is_none());

        let config = TrendsConfig {
            api_key: Some("key".to_string()),
            ..TrendsConfig::default()
        };
        assert!(TrendsClient::from_config(Client::new(), &config, Duration::from_secs(5)).is_some());
    }
}
