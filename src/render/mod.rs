use std::fmt::Write as _;

use ammonia::Builder;

use crate::types::{Digest, DigestItem};
use crate::util::truncate_chars;

/// Title line of every text digest.
pub fn headline(digest: &Digest) -> String {
    format!(
        "🕵️‍♂️ *Cybersecurity trends — {}*",
        digest.display_date()
    )
}

pub fn subject(digest: &Digest) -> String {
    format!("Daily cybersecurity digest: {}", digest.display_date())
}

const STORIES_HEADING: &str = "\n\n*Top stories*";

/// Telegram-flavoured (legacy Markdown) text digest.
pub fn plain_text(digest: &Digest) -> String {
    plain_text_within(digest, usize::MAX)
}

/// [`plain_text`] capped at `max` characters without splitting an entity.
/// Story lines are dropped whole from the end; a brief that alone overflows
/// is shortened before escaping.
pub fn plain_text_within(digest: &Digest, max: usize) -> String {
    let mut brief_chars = digest
        .trend_brief
        .as_ref()
        .map_or(0, |brief| brief.chars().count());
    let mut out = intro(digest, brief_chars);

    while brief_chars > 0 && out.chars().count() > max {
        let over = out.chars().count() - max;
        brief_chars = brief_chars.saturating_sub(over);
        out = intro(digest, brief_chars);
    }

    let mut used = out.chars().count() + STORIES_HEADING.chars().count();
    let mut stories = String::new();

    for item in &digest.items {
        let line = format!("\n{}", story_line(item));
        let len = line.chars().count();
        if used.saturating_add(len) > max {
            break;
        }
        used += len;
        stories.push_str(&line);
    }

    if !stories.is_empty() {
        out.push_str(STORIES_HEADING);
        out.push_str(&stories);
    }

    out
}

fn intro(digest: &Digest, brief_chars: usize) -> String {
    let mut out = headline(digest);

    match &digest.trend_brief {
        Some(brief) if brief_chars > 0 => {
            out.push_str("\n\n");
            out.push_str(&escape_markdown(&truncate_chars(brief, brief_chars)));
        }
        Some(_) => {}
        None if !digest.trending_terms.is_empty() => {
            out.push_str("\n\n");
            let terms: Vec<String> = digest
                .trending_terms
                .iter()
                .map(|t| format!("• {}", escape_markdown(t)))
                .collect();
            out.push_str(&terms.join("\n"));
        }
        None => {}
    }

    out
}

fn story_line(item: &DigestItem) -> String {
    let article = &item.article;

    if article.link.is_empty() {
        format!("• {}", escape_markdown(&article.title))
    } else {
        format!(
            "• [{}]({})",
            link_text(&article.title),
            article.link.replace(')', "%29")
        )
    }
}

/// Escapes the characters legacy Telegram Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// Entities cannot nest, so link text only needs its brackets neutralised.
fn link_text(title: &str) -> String {
    title.replace('[', "(").replace(']', ")")
}

/// Standalone HTML document for email delivery.
pub fn html(digest: &Digest) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n\
         <body style=\"font-family: Arial, Helvetica, sans-serif; max-width: 640px; margin: 0 auto; color: #222;\">\n\
         <h1 style=\"font-size: 22px;\">Cybersecurity digest</h1>\n\
         <p style=\"color: #666;\">{}</p>\n",
        escape(&subject(digest)),
        escape(&digest.display_date()),
    );

    if let Some(brief) = &digest.trend_brief {
        out.push_str("<h2 style=\"font-size: 18px;\">Trending</h2>\n<p>");
        let lines: Vec<String> = brief
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(escape)
            .collect();
        out.push_str(&lines.join("<br>\n"));
        out.push_str("</p>\n");
    } else if !digest.trending_terms.is_empty() {
        out.push_str("<h2 style=\"font-size: 18px;\">Trending</h2>\n<ul>\n");
        for term in &digest.trending_terms {
            let _ = writeln!(out, "<li>{}</li>", escape(term));
        }
        out.push_str("</ul>\n");
    }

    if !digest.items.is_empty() {
        out.push_str("<h2 style=\"font-size: 18px;\">Top stories</h2>\n");
        for item in &digest.items {
            out.push_str(&story_block(item));
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn story_block(item: &DigestItem) -> String {
    let article = &item.article;
    let mut out = String::from("<div style=\"margin-bottom: 28px;\">\n");

    if is_web_url(&article.link) {
        let _ = writeln!(
            out,
            "<h3 style=\"font-size: 16px;\"><a href=\"{}\">{}</a></h3>",
            escape(&article.link),
            escape(&article.title)
        );
    } else {
        let _ = writeln!(out, "<h3 style=\"font-size: 16px;\">{}</h3>", escape(&article.title));
    }

    if is_web_url(&article.image_url) {
        let _ = writeln!(
            out,
            "<img src=\"{}\" alt=\"\" style=\"max-width: 100%; height: auto;\">",
            escape(&article.image_url)
        );
    }

    let body = if item.rewritten || article.summary_html.is_empty() {
        format!("<p>{}</p>", escape(&item.body))
    } else {
        sanitize(&article.summary_html)
    };

    let _ = writeln!(out, "<div>{body}</div>");
    out.push_str("</div>\n");
    out
}

fn escape(text: &str) -> String {
    ammonia::clean_text(text)
}

/// Feed HTML minus scripts, styles and images (the lead image is rendered
/// separately).
pub fn sanitize(html: &str) -> String {
    let mut builder = Builder::default();
    builder.rm_tags(&["img"]);
    builder.clean(html).to_string()
}

fn is_web_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}
