use chrono::NaiveDate;
use serde::Serialize;

use super::NormalizedArticle;

#[derive(Debug, Serialize, Clone)]
pub struct DigestItem {
    pub article: NormalizedArticle,
    /// Oracle rewrite when one was requested, otherwise the plain summary.
    pub body: String,
    pub rewritten: bool,
}

impl DigestItem {
    pub fn verbatim(article: NormalizedArticle) -> Self {
        Self {
            body: article.summary_plain.clone(),
            article,
            rewritten: false,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Digest {
    pub date: NaiveDate,
    pub trending_terms: Vec<String>,
    pub trend_brief: Option<String>,
    pub items: Vec<DigestItem>,
}

impl Digest {
    /// `16 Oct 2026`
    pub fn display_date(&self) -> String {
        self.date.format("%d %b %Y").to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.trending_terms.is_empty() && self.trend_brief.is_none()
    }
}
