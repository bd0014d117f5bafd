use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::NormalizedArticle;

pub const DEFAULT_THRESHOLD: f64 = 0.7;

static NON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("invalid non-word regex"));

pub type TokenSet = HashSet<String>;

/// Lowercased word tokens with punctuation removed.
pub fn tokenize(text: &str) -> TokenSet {
    let lowered = text.to_lowercase();
    NON_WORD_RE
        .replace_all(&lowered, "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Intersection over union; two empty sets score 0.
pub fn jaccard(a: &TokenSet, b: &TokenSet) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

fn article_tokens(article: &NormalizedArticle) -> TokenSet {
    tokenize(&format!("{} {}", article.title, article.summary_plain))
}

/// Articles kept so far, with their tokens cached.
#[derive(Debug)]
pub struct Accepted {
    items: Vec<(TokenSet, NormalizedArticle)>,
    threshold: f64,
}

impl Accepted {
    pub fn new(threshold: f64) -> Self {
        Self {
            items: Vec::new(),
            threshold,
        }
    }

    pub fn offer(mut self, article: NormalizedArticle) -> Self {
        let tokens = article_tokens(&article);

        let duplicate_of = self
            .items
            .iter()
            .find(|(kept, _)| jaccard(&tokens, kept) >= self.threshold);

        match duplicate_of {
            Some((_, kept)) => {
                tracing::debug!(
                    dropped = %article.title,
                    kept = %kept.title,
                    "near-duplicate story"
                );
            }
            None => self.items.push((tokens, article)),
        }

        self
    }

    pub fn into_articles(self) -> Vec<NormalizedArticle> {
        self.items.into_iter().map(|(_, article)| article).collect()
    }
}

/// Greedy near-duplicate removal. An article is dropped when it is at least
/// `threshold` similar to any article accepted before it, so the earlier
/// story always wins. Output is a subsequence of the input.
#[tracing::instrument(name = "dedup", skip(articles), fields(input = articles.len()))]
pub fn deduplicate(articles: Vec<NormalizedArticle>, threshold: f64) -> Vec<NormalizedArticle> {
    let kept = articles
        .into_iter()
        .fold(Accepted::new(threshold), Accepted::offer)
        .into_articles();

    tracing::info!(count = kept.len(), "deduplicated articles");

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(title: &str, summary: &str) -> NormalizedArticle {
        NormalizedArticle {
            title: title.to_string(),
            summary_plain: summary.to_string(),
            summary_html: String::new(),
            link: format!("https://example.com/{}", title.len()),
            image_url: String::new(),
            published_at: Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap(),
        }
    }

    fn set(words: &[&str]) -> TokenSet {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn titles(articles: &[NormalizedArticle]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Critical flaw found in router firmware!!"),
            set(&["critical", "flaw", "found", "in", "router", "firmware"])
        );
        assert_eq!(tokenize("CVE-2026-1234: patch  now"), set(&["cve20261234", "patch", "now"]));
        assert_eq!(tokenize("snake_case stays"), set(&["snake_case", "stays"]));
        assert!(tokenize("  ?!  ").is_empty());
    }

    #[test]
    fn test_jaccard_properties() {
        let a = set(&["ransomware", "hits", "hospital"]);
        let b = set(&["ransomware", "hits", "school"]);
        let empty = TokenSet::new();

        assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
        assert!((jaccard(&a, &b) - 0.5).abs() < f64::EPSILON);
        assert_eq!(jaccard(&empty, &empty), 0.0);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &empty), 0.0);
    }

    #[test]
    fn test_first_seen_survives() {
        let summary = "Researchers disclosed a critical flaw affecting popular home routers.";
        let input = vec![
            article("Critical Flaw Found In Router Firmware", summary),
            article("Critical flaw found in router firmware!!", summary),
        ];

        let output = deduplicate(input, DEFAULT_THRESHOLD);
        assert_eq!(titles(&output), ["Critical Flaw Found In Router Firmware"]);
    }

    #[test]
    fn test_distinct_stories_are_kept() {
        let input = vec![
            article("Ransomware gang hits hospital", "Patient records leaked online."),
            article("New phishing kit targets banks", "Kit bypasses two factor prompts."),
            article("Chrome zero-day patched", "Google fixed an actively exploited bug."),
        ];

        let output = deduplicate(input.clone(), DEFAULT_THRESHOLD);
        assert_eq!(output, input);
    }

    #[test]
    fn test_any_accepted_match_discards() {
        let input = vec![
            article("alpha beta gamma delta", ""),
            article("epsilon zeta eta theta", ""),
            article("epsilon zeta eta theta iota", ""),
        ];

        let output = deduplicate(input, 0.7);
        assert_eq!(titles(&output), ["alpha beta gamma delta", "epsilon zeta eta theta"]);
    }

    #[test]
    fn test_empty_token_sets_never_match() {
        let input = vec![article("!!!", ""), article("???", "")];

        let output = deduplicate(input, DEFAULT_THRESHOLD);
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn test_idempotent_and_order_preserving() {
        let input = vec![
            article("Router flaw exploited in the wild", "Botnet targets routers"),
            article("Hospital ransomware attack", "Records leaked"),
            article("Router flaw exploited in the wild today", "Botnet targets routers"),
            article("Banking trojan returns", "New variant spotted"),
            article("Hospital ransomware attack update", "Records leaked"),
        ];

        let once = deduplicate(input.clone(), DEFAULT_THRESHOLD);
        let twice = deduplicate(once.clone(), DEFAULT_THRESHOLD);
        assert_eq!(once, twice);

        let mut cursor = input.iter();
        for kept in &once {
            assert!(cursor.any(|a| a == kept), "output is not a subsequence of input");
        }

        for (i, a) in once.iter().enumerate() {
            for b in &once[i + 1..] {
                assert!(jaccard(&article_tokens(a), &article_tokens(b)) < DEFAULT_THRESHOLD);
            }
        }
    }
}
