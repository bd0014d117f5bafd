use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;

use crate::types::{FeedSource, NormalizedArticle, RawEntry};
use extract::{resolve_image, strip_html, ImageContext};

pub mod extract;
pub mod fetch;


pub use fetch::{FeedFetcher, HttpFeedFetcher};

#[derive(Debug, Clone, Copy)]
pub struct CollectWindow {
    /// Entries published before this instant are dropped.
    pub cutoff: DateTime<Utc>,
    pub max_items: usize,
}

impl CollectWindow {
    /// `None` when `hours` does not fit a chrono duration or pushes the
    /// cutoff out of range.
    pub fn hours_before(now: DateTime<Utc>, hours: i64, max_items: usize) -> Option<Self> {
        let cutoff = now.checked_sub_signed(Duration::try_hours(hours)?)?;

        Some(Self { cutoff, max_items })
    }
}

/// Exact-title dedup state, threaded through the collection fold.
#[derive(Debug, Default)]
pub struct TitleFold {
    seen: HashSet<String>,
    articles: Vec<NormalizedArticle>,
}

impl TitleFold {
    pub fn push(mut self, article: NormalizedArticle) -> Self {
        if self.seen.insert(article.title.clone()) {
            self.articles.push(article);
        } else {
            tracing::debug!(title = %article.title, "dropping repeated title");
        }
        self
    }

    pub fn into_articles(self) -> Vec<NormalizedArticle> {
        self.articles
    }
}

/// Fetches every source, normalizes entries inside the window and drops
/// repeated titles. A failing source contributes nothing; it never aborts
/// the pass.
///
/// Sources are fetched concurrently but folded in the order given, so the
/// output is source order, then entry order.
#[tracing::instrument(name = "collect", skip_all, fields(sources = sources.len()))]
pub async fn collect<F>(
    fetcher: &F,
    sources: &[FeedSource],
    window: &CollectWindow,
) -> Vec<NormalizedArticle>
where
    F: FeedFetcher + ?Sized,
{
    let fetches = sources.iter().map(|source| async move {
        match fetcher.fetch(source).await {
            Ok(entries) => {
                tracing::info!(source = %source, count = entries.len(), "fetched feed");
                entries
            }
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "feed unavailable, skipping");
                Vec::new()
            }
        }
    });

    let mut articles = join_all(fetches)
        .await
        .into_iter()
        .flatten()
        .filter_map(|raw| normalize(raw, window.cutoff))
        .fold(TitleFold::default(), TitleFold::push)
        .into_articles();

    articles.truncate(window.max_items);

    tracing::info!(count = articles.len(), "collected articles");

    articles
}

/// Projects one raw entry into an article, or `None` when it has no usable
/// timestamp, falls before the cutoff, or has a blank title.
pub fn normalize(raw: RawEntry, cutoff: DateTime<Utc>) -> Option<NormalizedArticle> {
    let Some(published_at) = raw.published.or(raw.updated) else {
        tracing::debug!(title = ?raw.title, "entry has no timestamp");
        return None;
    };

    if published_at < cutoff {
        return None;
    }

    let title = raw.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return None;
    }

    let summary = non_blank(raw.summary.as_deref());
    let content = non_blank(raw.content.as_deref());

    let summary_plain = summary.or(content).map(strip_html).unwrap_or_default();
    let summary_html = content.or(summary).unwrap_or_default().to_string();

    let image_url = resolve_image(&ImageContext {
        summary_html: &summary_html,
        raw: &raw,
    });

    Some(NormalizedArticle {
        title: title.to_string(),
        summary_plain,
        summary_html,
        link: raw.link.clone().unwrap_or_default(),
        image_url,
        published_at,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
