use std::sync::Arc;

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};

use crate::collector::{self, CollectWindow, HttpFeedFetcher};
use crate::dedup;
use crate::error::DigestError;
use crate::global::Global;
use crate::notifier::{self, Notifier};
use crate::rewriter::{self, GeminiRewriter, Rewriter};
use crate::trends::TrendsClient;
use crate::types::{Digest, DigestItem, FeedSource, NormalizedArticle};

/// Trends, brief, collection, dedup and optional rewrite. Nothing is sent.
#[tracing::instrument(name = "Digest", skip_all)]
pub async fn build(global: &Arc<Global>) -> anyhow::Result<Digest> {
    let config = &global.config;
    let timeout = global.request_timeout();
    let now = Utc::now();
    let date = now.date_naive();

    let gemini = GeminiRewriter::from_config(global.http_client.clone(), &config.rewriter, timeout);
    let oracle = gemini.as_ref().map(|g| g as &dyn Rewriter);

    let trending_terms = match TrendsClient::from_config(global.http_client.clone(), &config.trends, timeout) {
        Some(client) => client.fetch_top_terms().await,
        None => {
            tracing::info!("trends disabled, no api key");
            Vec::new()
        }
    };

    let trend_brief = match oracle {
        Some(oracle) if !trending_terms.is_empty() => Some(
            trend_brief(oracle, &trending_terms, date)
                .await
                .context("trend brief")?,
        ),
        _ => None,
    };

    let fetcher = HttpFeedFetcher::new(global.http_client.clone(), timeout);
    let sources: Vec<FeedSource> = config.feeds.sources.iter().map(FeedSource::new).collect();
    let window = CollectWindow::hours_before(now, config.feeds.window_hours, config.feeds.max_items)
        .context("feeds.window_hours out of range")?;

    let articles = collector::collect(&fetcher, &sources, &window).await;
    let articles = dedup::deduplicate(articles, config.feeds.similarity_threshold);

    let items = match oracle.filter(|_| config.rewriter.rewrite_articles) {
        Some(oracle) => rewrite_items(oracle, articles)
            .await
            .context("article rewrite")?,
        None => articles.into_iter().map(DigestItem::verbatim).collect(),
    };

    Ok(Digest {
        date,
        trending_terms,
        trend_brief,
        items,
    })
}

pub async fn trend_brief(
    oracle: &dyn Rewriter,
    terms: &[String],
    date: NaiveDate,
) -> Result<String, DigestError> {
    let prompt = rewriter::trend_brief_prompt(terms, &date.format("%d %b %Y").to_string());
    oracle.generate(&prompt).await
}

/// Rewrites every article in order; the first oracle failure aborts.
pub async fn rewrite_items(
    oracle: &dyn Rewriter,
    articles: Vec<NormalizedArticle>,
) -> Result<Vec<DigestItem>, DigestError> {
    let mut items = Vec::with_capacity(articles.len());

    for article in articles {
        let body = oracle.generate(&rewriter::article_prompt(&article)).await?;
        items.push(DigestItem {
            article,
            body,
            rewritten: true,
        });
    }

    Ok(items)
}

#[tracing::instrument(name = "Deliver", skip_all, fields(channels = notifiers.len()))]
pub async fn deliver(digest: &Digest, notifiers: &[Box<dyn Notifier>]) -> anyhow::Result<()> {
    if notifiers.is_empty() {
        tracing::warn!("no delivery channel configured");
        return Ok(());
    }

    for notifier in notifiers {
        notifier
            .deliver(digest)
            .await
            .with_context(|| format!("{} delivery", notifier.name()))?;

        tracing::info!(channel = notifier.name(), "digest delivered");
    }

    Ok(())
}

/// One full pass: build, then deliver to every configured channel.
pub async fn run(global: &Arc<Global>) -> anyhow::Result<()> {
    let digest = build(global).await?;

    if digest.is_empty() {
        tracing::info!("nothing to deliver");
        return Ok(());
    }

    let notifiers = notifier::from_settings(&global.config, &global.http_client);
    deliver(&digest, &notifiers).await?;

    tracing::info!(
        items = digest.items.len(),
        uptime = ?global.started_at.elapsed(),
        "digest run finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use reqwest::StatusCode;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    struct EchoOracle;

    #[async_trait]
    impl Rewriter for EchoOracle {
        async fn generate(&self, prompt: &str) -> Result<String, DigestError> {
            let title = prompt
                .lines()
                .find_map(|l| l.strip_prefix("Title: "))
                .unwrap_or("brief");
            Ok(format!("Rewritten: {title}"))
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl Rewriter for FailingOracle {
        async fn generate(&self, _prompt: &str) -> Result<String, DigestError> {
            Err(DigestError::EmptyResponse("rewriter"))
        }
    }

    struct RecordingNotifier {
        name: &'static str,
        fail: bool,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn deliver(&self, _digest: &Digest) -> Result<(), DigestError> {
            self.calls.lock().unwrap().push(self.name);
            if self.fail {
                return Err(DigestError::Status {
                    service: "telegram",
                    status: StatusCode::UNAUTHORIZED,
                    body: "bad token".to_string(),
                });
            }
            Ok(())
        }
    }

    fn article(title: &str) -> NormalizedArticle {
        NormalizedArticle {
            title: title.to_string(),
            summary_plain: format!("About {title}"),
            summary_html: String::new(),
            link: "https://example.com".to_string(),
            image_url: String::new(),
            published_at: Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap(),
        }
    }

    fn digest() -> Digest {
        Digest {
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            trending_terms: Vec::new(),
            trend_brief: None,
            items: vec![DigestItem::verbatim(article("One"))],
        }
    }

    #[tokio::test]
    async fn test_rewrite_items_keeps_order() {
        let items = rewrite_items(&EchoOracle, vec![article("One"), article("Two")])
            .await
            .unwrap();

        let bodies: Vec<_> = items.iter().map(|i| i.body.as_str()).collect();
        assert_eq!(bodies, ["Rewritten: One", "Rewritten: Two"]);
        assert!(items.iter().all(|i| i.rewritten));
    }

    #[tokio::test]
    async fn test_rewrite_failure_propagates() {
        let result = rewrite_items(&FailingOracle, vec![article("One")]).await;
        assert!(matches!(result, Err(DigestError::EmptyResponse(_))));
    }

    #[tokio::test]
    async fn test_trend_brief_uses_oracle() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let brief = trend_brief(&EchoOracle, &["ransomware".to_string()], date)
            .await
            .unwrap();
        assert_eq!(brief, "Rewritten: brief");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_deliver_stops_at_first_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(RecordingNotifier { name: "discord", fail: false, calls: calls.clone() }),
            Box::new(RecordingNotifier { name: "telegram", fail: true, calls: calls.clone() }),
            Box::new(RecordingNotifier { name: "email", fail: false, calls: calls.clone() }),
        ];

        let err = deliver(&digest(), &notifiers).await.unwrap_err();

        assert!(format!("{err:#}").contains("telegram delivery"));
        assert_eq!(*calls.lock().unwrap(), ["discord", "telegram"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_deliver_without_channels_is_ok() {
        deliver(&digest(), &[]).await.unwrap();
        assert!(logs_contain("no delivery channel configured"));
    }
}
