//! RSS feed proxy.
//!
//! Browsers cannot fetch third-party feeds directly, so the API fetches
//! them server-side, parses the XML, and hands clients a small JSON
//! shape. Only hosts on the configured allowlist are fetched.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use thiserror::Error;

/// Refuse to proxy bodies larger than this.
const MAX_FEED_BYTES: usize = 2 * 1024 * 1024;

/// Errors that can occur when proxying a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed url: {0}")]
    InvalidUrl(String),

    #[error("host {0} is not on the feed allowlist")]
    HostNotAllowed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("feed too large")]
    TooLarge,

    #[error("body is not a valid RSS or Atom feed")]
    NotAFeed,
}

/// A parsed feed, RSS or Atom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub title: String,
    pub items: Vec<FeedItem>,
}

/// One feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub description: Option<String>,
}

/// Fetches and validates remote feeds.
#[derive(Clone)]
pub struct FeedProxy {
    client: reqwest::Client,
    allowed_hosts: Vec<String>,
}

impl FeedProxy {
    /// Create a feed proxy restricted to the given hosts. An empty
    /// allowlist refuses every fetch.
    #[must_use]
    pub fn new(allowed_hosts: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            allowed_hosts,
        }
    }

    /// Fetch and parse a feed.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` if the URL is malformed, its host is not
    /// allowlisted, the fetch fails, or the body is not a feed.
    pub async fn fetch(&self, url: &str) -> Result<Feed, FeedError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| FeedError::InvalidUrl(e.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FeedError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| FeedError::InvalidUrl("url has no host".to_string()))?;
        if !host_allowed(&self.allowed_hosts, host) {
            return Err(FeedError::HostNotAllowed(host.to_string()));
        }

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UpstreamStatus(status.as_u16()));
        }

        let body = response.text().await?;
        if body.len() > MAX_FEED_BYTES {
            return Err(FeedError::TooLarge);
        }
        parse_feed(&body)
    }
}

/// Exact or subdomain match against the allowlist.
fn host_allowed(allowed: &[String], host: &str) -> bool {
    allowed.iter().any(|a| {
        host == a
            || (host.len() > a.len() && host.ends_with(a) && host.as_bytes()[host.len() - a.len() - 1] == b'.')
    })
}

/// Root element of the feed, which decides how links are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Atom,
}

fn attr_value(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Parse an RSS 2.0 or Atom body into a [`Feed`].
///
/// Pulls the channel title and, per entry, the title, link, publication
/// date, and description. Unknown elements are skipped.
fn parse_feed(body: &str) -> Result<Feed, FeedError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut kind: Option<FeedKind> = None;
    let mut feed = Feed::default();
    let mut item: Option<FeedItem> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if path.is_empty() {
                    kind = Some(root_kind(&name)?);
                }
                if matches!(name.as_str(), "item" | "entry") && item.is_none() {
                    item = Some(FeedItem::default());
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                if path.is_empty() {
                    let name = String::from_utf8_lossy(name.as_ref()).into_owned();
                    kind = Some(root_kind(&name)?);
                } else if name.as_ref() == b"link"
                    && kind == Some(FeedKind::Atom)
                    && let Some(entry) = item.as_mut()
                    && entry.link.is_empty()
                    && let Some(href) = attr_value(&e, b"href")
                {
                    entry.link = href;
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|_| FeedError::NotAFeed)?.into_owned();
                record_text(&path, &mut feed, item.as_mut(), text);
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                record_text(&path, &mut feed, item.as_mut(), text);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop()
                    && matches!(name.as_str(), "item" | "entry")
                    && let Some(entry) = item.take()
                {
                    feed.items.push(entry);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return Err(FeedError::NotAFeed),
            Ok(_) => {}
        }
    }

    if kind.is_none() {
        return Err(FeedError::NotAFeed);
    }
    Ok(feed)
}

fn root_kind(name: &str) -> Result<FeedKind, FeedError> {
    match name {
        "rss" => Ok(FeedKind::Rss),
        "feed" => Ok(FeedKind::Atom),
        _ => Err(FeedError::NotAFeed),
    }
}

/// Route character data to the field named by the current element.
fn record_text(path: &[String], feed: &mut Feed, item: Option<&mut FeedItem>, text: String) {
    let Some(current) = path.last() else {
        return;
    };

    if let Some(entry) = item {
        match current.as_str() {
            "title" if entry.title.is_empty() => entry.title = text,
            "link" if entry.link.is_empty() => entry.link = text,
            "pubDate" | "published" | "updated" if entry.pub_date.is_none() => {
                entry.pub_date = Some(text);
            }
            "description" | "summary" if entry.description.is_none() => {
                entry.description = Some(text);
            }
            _ => {}
        }
        return;
    }

    // Channel-level title: direct child of <channel> (RSS) or <feed>
    // (Atom), so <image><title> does not clobber it.
    if current == "title"
        && feed.title.is_empty()
        && path
            .len()
            .checked_sub(2)
            .and_then(|i| path.get(i))
            .is_some_and(|parent| parent == "channel" || parent == "feed")
    {
        feed.title = text;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_host_allowed_exact_and_subdomain() {
        let allowed = vec!["example.com".to_string()];
        assert!(host_allowed(&allowed, "example.com"));
        assert!(host_allowed(&allowed, "feeds.example.com"));
        assert!(!host_allowed(&allowed, "evil-example.com"));
        assert!(!host_allowed(&allowed, "example.com.evil.net"));
    }

    #[test]
    fn test_empty_allowlist_refuses_everything() {
        assert!(!host_allowed(&[], "example.com"));
    }

    #[test]
    fn test_parse_rss_channel_and_items() {
        let body = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Hearth Notes</title>
    <item>
      <title>Candle care</title>
      <link>https://example.com/posts/candle-care</link>
      <pubDate>Mon, 03 Aug 2026 10:00:00 GMT</pubDate>
      <description><![CDATA[Keep wicks <b>trimmed</b>.]]></description>
    </item>
    <item>
      <title>Second post</title>
      <link>https://example.com/posts/second</link>
    </item>
  </channel>
</rss>"#;

        let feed = parse_feed(body).unwrap();
        assert_eq!(feed.title, "Hearth Notes");
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "Candle care");
        assert_eq!(feed.items[0].link, "https://example.com/posts/candle-care");
        assert_eq!(
            feed.items[0].pub_date.as_deref(),
            Some("Mon, 03 Aug 2026 10:00:00 GMT")
        );
        assert_eq!(
            feed.items[0].description.as_deref(),
            Some("Keep wicks <b>trimmed</b>.")
        );
        assert!(feed.items[1].pub_date.is_none());
    }

    #[test]
    fn test_parse_atom_entries_read_link_href() {
        let body = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Hearth Atom</title>
  <entry>
    <title>First entry</title>
    <link href="https://example.com/atom/first"/>
    <updated>2026-08-03T10:00:00Z</updated>
    <summary>Short note</summary>
  </entry>
</feed>"#;

        let feed = parse_feed(body).unwrap();
        assert_eq!(feed.title, "Hearth Atom");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].link, "https://example.com/atom/first");
        assert_eq!(feed.items[0].pub_date.as_deref(), Some("2026-08-03T10:00:00Z"));
        assert_eq!(feed.items[0].description.as_deref(), Some("Short note"));
    }

    #[test]
    fn test_parse_ignores_image_title() {
        let body = r#"<rss version="2.0"><channel>
  <image><title>Logo alt text</title></image>
  <title>Real Title</title>
</channel></rss>"#;
        let feed = parse_feed(body).unwrap();
        assert_eq!(feed.title, "Real Title");
    }

    #[test]
    fn test_parse_rejects_html() {
        assert!(matches!(
            parse_feed("<html><body>nope</body></html>"),
            Err(FeedError::NotAFeed)
        ));
        assert!(matches!(parse_feed(""), Err(FeedError::NotAFeed)));
    }
}
