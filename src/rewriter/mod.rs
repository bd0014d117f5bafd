use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{non_empty, RewriterConfig};
use crate::error::DigestError;
use crate::types::NormalizedArticle;

/// Free-form text generation. Output has no structure beyond "text".
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, DigestError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiRewriter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for GeminiRewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiRewriter")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiRewriter {
    /// `None` when no API key is configured.
    pub fn from_config(client: Client, config: &RewriterConfig, timeout: Duration) -> Option<Self> {
        let api_key = non_empty(&config.api_key)?.to_string();

        Some(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl Rewriter for GeminiRewriter {
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, DigestError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.without_url())?;

        if !response.status().is_success() {
            return Err(DigestError::from_response("rewriter", response).await);
        }

        let body: GenerateResponse = response.json().await.map_err(|e| e.without_url())?;
        let text = first_candidate_text(body);

        if text.is_empty() {
            return Err(DigestError::EmptyResponse("rewriter"));
        }

        tracing::debug!(chars = text.len(), "generated text");

        Ok(text)
    }
}

fn first_candidate_text(body: GenerateResponse) -> String {
    body.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Prompt for the short "why is this trending" brief.
pub fn trend_brief_prompt(terms: &[String], date: &str) -> String {
    format!(
        "You are a cybersecurity analyst.\n\
         Today is {date}.\n\
         Trending terms: {terms}.\n\
         For each term, write one concise bullet (~25 words) explaining why it is trending. \
         Return exactly {count} bullets, no hashtags, no markdown.",
        terms = terms.join(", "),
        count = terms.len(),
    )
}

/// Prompt for rewriting a single headline into a neutral brief.
pub fn article_prompt(article: &NormalizedArticle) -> String {
    format!(
        "You are a cybersecurity news editor.\n\
         Rewrite the following story as a neutral two-sentence brief for a daily digest. \
         Plain text only, no markdown, no links.\n\n\
         Title: {}\n\
         Summary: {}",
        article.title, article.summary_plain,
    )
}
