use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::{Html, Selector};

use crate::types::RawEntry;

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("invalid img selector"));

const BLOCK_TAGS: [&str; 16] = [
    "p", "br", "div", "li", "ul", "ol", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote",
];

/// Plain text of an HTML fragment: entities decoded, block elements
/// separated by a space, whitespace collapsed.
pub fn strip_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());

    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(t) if !node.ancestors().any(|a| is_raw_text(a.value())) => {
                text.push_str(t)
            }
            Node::Element(el) if BLOCK_TAGS.contains(&el.name()) => text.push(' '),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Script and style bodies are code, not prose.
fn is_raw_text(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript" | "template"))
}

/// `src` of the first `<img>` in an HTML fragment.
pub fn first_img_src(html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }

    let fragment = Html::parse_fragment(html);
    fragment
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

pub struct ImageContext<'a> {
    pub summary_html: &'a str,
    pub raw: &'a RawEntry,
}

type ImageStrategy = fn(&ImageContext<'_>) -> Option<String>;

/// Tried in order; the first hit wins.
const IMAGE_STRATEGIES: [(&str, ImageStrategy); 4] = [
    ("summary_html_img", from_summary_html),
    ("media", from_media),
    ("enclosure", from_enclosures),
    ("raw_summary_img", from_raw_summary),
];

pub fn resolve_image(ctx: &ImageContext<'_>) -> String {
    for (name, strategy) in IMAGE_STRATEGIES {
        if let Some(url) = strategy(ctx) {
            tracing::trace!(strategy = name, %url, "image resolved");
            return url;
        }
    }

    String::new()
}

fn from_summary_html(ctx: &ImageContext<'_>) -> Option<String> {
    first_img_src(ctx.summary_html)
}

fn from_media(ctx: &ImageContext<'_>) -> Option<String> {
    ctx.raw
        .media
        .iter()
        .find(|m| m.is_image() && !m.url.trim().is_empty())
        .map(|m| m.url.trim().to_string())
}

fn from_enclosures(ctx: &ImageContext<'_>) -> Option<String> {
    ctx.raw
        .enclosures
        .iter()
        .find(|m| m.is_image() && !m.url.trim().is_empty())
        .map(|m| m.url.trim().to_string())
}

fn from_raw_summary(ctx: &ImageContext<'_>) -> Option<String> {
    ctx.raw.summary.as_deref().and_then(first_img_src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaRef;

    fn image(url: &str) -> MediaRef {
        MediaRef {
            url: url.to_string(),
            mime: Some("image/png".to_string()),
            medium: None,
        }
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Patch <b>now</b> &amp; reboot.</p><p>Details inside</p>"),
            "Patch now & reboot. Details inside"
        );
        assert_eq!(strip_html("plain   text\n here"), "plain text here");
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("<img src=\"x.png\">"), "");
    }

    #[test]
    fn test_strip_html_skips_script_and_style() {
        let html = "<style>p { color: red; }</style><p>Patch the VPN.</p>\
                    <script>var tracker = 'ransomware';</script><p>Then rotate keys.</p>";
        assert_eq!(strip_html(html), "Patch the VPN. Then rotate keys.");
    }

    #[test]
    fn test_first_img_src() {
        let html = r#"<p>intro</p><img alt="none"><img src=" https://cdn.example.com/a.png ">"#;
        assert_eq!(
            first_img_src(html).as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(first_img_src("<p>no images</p>"), None);
        assert_eq!(first_img_src(r#"<img src="">"#), None);
    }

    #[test]
    fn test_strategy_priority() {
        let raw = RawEntry {
            summary: Some(r#"<img src="https://cdn.example.com/summary.png">"#.to_string()),
            media: vec![image("https://cdn.example.com/media.png")],
            enclosures: vec![image("https://cdn.example.com/enclosure.png")],
            ..Default::default()
        };

        let with_html = ImageContext {
            summary_html: r#"<img src="https://cdn.example.com/content.png">"#,
            raw: &raw,
        };
        assert_eq!(resolve_image(&with_html), "https://cdn.example.com/content.png");

        let no_html = ImageContext {
            summary_html: "<p>text only</p>",
            raw: &raw,
        };
        assert_eq!(resolve_image(&no_html), "https://cdn.example.com/media.png");
    }

    #[test]
    fn test_enclosure_and_raw_summary_fallbacks() {
        let raw = RawEntry {
            summary: Some(r#"<img src="https://cdn.example.com/summary.png">"#.to_string()),
            media: vec![MediaRef {
                url: "https://cdn.example.com/clip.mp4".to_string(),
                mime: Some("video/mp4".to_string()),
                medium: None,
            }],
            enclosures: vec![image("https://cdn.example.com/enclosure.png")],
            ..Default::default()
        };
        let ctx = ImageContext {
            summary_html: "",
            raw: &raw,
        };
        assert_eq!(resolve_image(&ctx), "https://cdn.example.com/enclosure.png");

        let raw = RawEntry {
            summary: Some(r#"<img src="https://cdn.example.com/summary.png">"#.to_string()),
            ..Default::default()
        };
        let ctx = ImageContext {
            summary_html: "",
            raw: &raw,
        };
        assert_eq!(resolve_image(&ctx), "https://cdn.example.com/summary.png");

        let ctx = ImageContext {
            summary_html: "",
            raw: &RawEntry::default(),
        };
        assert_eq!(resolve_image(&ctx), "");
    }
}
