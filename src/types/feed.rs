use std::fmt;

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link};

/// A configured syndication endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedSource(String);

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaRef {
    pub url: String,
    pub mime: Option<String>,
    pub medium: Option<String>,
}

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

impl MediaRef {
    /// Image by MIME type or `medium`. Without a MIME type the URL path
    /// extension decides.
    pub fn is_image(&self) -> bool {
        let mime = self.mime.as_deref().map(str::trim).filter(|m| !m.is_empty());

        let by_mime = match mime {
            Some(m) => m.to_ascii_lowercase().starts_with("image/"),
            None => has_image_extension(&self.url),
        };
        let by_medium = self
            .medium
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("image"));

        by_mime || by_medium
    }
}

fn has_image_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();

    file.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// One parsed feed item before normalization. Every field is optional
/// because feeds disagree on which ones they fill.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    /// Atom `summary` or RSS `description`.
    pub summary: Option<String>,
    /// Atom `content` or RSS `content:encoded`.
    pub content: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub media: Vec<MediaRef>,
    pub enclosures: Vec<MediaRef>,
}

impl From<Entry> for RawEntry {
    fn from(entry: Entry) -> Self {
        let link = canonical_link(&entry.links);

        let enclosures = entry
            .links
            .iter()
            .filter(|l| l.rel.as_deref() == Some("enclosure"))
            .map(|l| MediaRef {
                url: l.href.clone(),
                mime: l.media_type.clone(),
                medium: None,
            })
            .collect();

        let media = entry
            .media
            .iter()
            .flat_map(|obj| {
                let contents = obj.content.iter().filter_map(|c| {
                    let url = c.url.as_ref()?;
                    Some(MediaRef {
                        url: url.to_string(),
                        mime: c.content_type.as_ref().map(|m| m.to_string()),
                        medium: None,
                    })
                });
                let thumbnails = obj.thumbnails.iter().map(|t| MediaRef {
                    url: t.image.uri.clone(),
                    mime: None,
                    medium: Some("image".to_string()),
                });
                contents.chain(thumbnails)
            })
            .collect();

        Self {
            title: entry.title.map(|t| t.content),
            summary: entry.summary.map(|t| t.content),
            content: entry.content.and_then(|c| c.body),
            published: entry.published,
            updated: entry.updated,
            link,
            media,
            enclosures,
        }
    }
}

impl From<&rss::Item> for RawEntry {
    fn from(item: &rss::Item) -> Self {
        let enclosures = item
            .enclosure()
            .map(|e| MediaRef {
                url: e.url().trim().to_string(),
                mime: Some(e.mime_type().to_string()),
                medium: None,
            })
            .into_iter()
            .collect();

        let updated = item
            .dublin_core_ext()
            .and_then(|dc| dc.dates().first())
            .and_then(|d| parse_date(d));

        Self {
            title: item.title().map(str::to_string),
            summary: item.description().map(str::to_string),
            content: item.content().map(str::to_string),
            published: item.pub_date().and_then(parse_date),
            updated,
            link: item
                .link()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            media: media_rss(item),
            enclosures,
        }
    }
}

/// `media:content` (bare or inside `media:group`) then `media:thumbnail`.
fn media_rss(item: &rss::Item) -> Vec<MediaRef> {
    let Some(media) = item.extensions().get("media") else {
        return Vec::new();
    };

    let grouped = media
        .get("group")
        .into_iter()
        .flatten()
        .filter_map(|group| group.children().get("content"))
        .flatten();

    let contents = media
        .get("content")
        .into_iter()
        .flatten()
        .chain(grouped)
        .filter_map(|ext| {
            let attrs = ext.attrs();
            Some(MediaRef {
                url: attrs.get("url")?.trim().to_string(),
                mime: attrs.get("type").cloned(),
                medium: attrs.get("medium").cloned(),
            })
        });

    let thumbnails = media
        .get("thumbnail")
        .into_iter()
        .flatten()
        .filter_map(|ext| {
            Some(MediaRef {
                url: ext.attrs().get("url")?.trim().to_string(),
                mime: None,
                medium: Some("image".to_string()),
            })
        });

    contents.chain(thumbnails).collect()
}

/// RFC 2822 as RSS requires, RFC 3339 as Dublin Core and sloppy feeds use.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn canonical_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}
