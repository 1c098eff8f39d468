//! RSS 2.0 / Atom parsing into discovered articles.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::{DiscoveredArticle, FeedError};
use crate::utils::html;

/// Parse a feed document, trying RSS 2.0 first and then Atom. A document
/// that yields no items from either parser is malformed.
pub fn parse_feed(body: &[u8]) -> Result<Vec<DiscoveredArticle>, FeedError> {
    if let Ok(channel) = rss::Channel::read_from(body) {
        let items = parse_rss_channel(&channel);
        if !items.is_empty() {
            return Ok(items);
        }
    }

    if let Ok(feed) = atom_syndication::Feed::read_from(body) {
        let entries = parse_atom_feed(&feed);
        if !entries.is_empty() {
            return Ok(entries);
        }
    }

    Err(FeedError::Malformed(
        "no items parsed as RSS or Atom".to_string(),
    ))
}

fn parse_rss_channel(channel: &rss::Channel) -> Vec<DiscoveredArticle> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            let url = item.link()?.trim().to_string();
            if url.is_empty() {
                return None;
            }

            let description_html = item.description().unwrap_or_default();
            let description = html::clean_text(description_html);

            Some(DiscoveredArticle {
                url,
                title: item.title().map(|t| html::clean_text(t)),
                description: (!description.is_empty()).then_some(description),
                published: item.pub_date().and_then(parse_feed_date),
                image_url: rss_item_image(item, description_html),
            })
        })
        .collect()
}

/// Image for an RSS item: `<enclosure type="image/*">`, then
/// `<media:content url>`, then the first `<img>` in the description HTML.
fn rss_item_image(item: &rss::Item, description_html: &str) -> Option<String> {
    item.enclosure()
        .filter(|e| e.mime_type().starts_with("image/"))
        .map(|e| e.url().to_string())
        .or_else(|| media_content_url(item))
        .or_else(|| html::extract_image_from_html(description_html))
}

fn media_content_url(item: &rss::Item) -> Option<String> {
    item.extensions()
        .get("media")?
        .get("content")?
        .iter()
        .find_map(|ext| ext.attrs().get("url").cloned())
}

fn parse_atom_feed(feed: &atom_syndication::Feed) -> Vec<DiscoveredArticle> {
    feed.entries()
        .iter()
        .filter_map(|entry| {
            let url = entry
                .links()
                .first()
                .map(|l| l.href().to_string())
                .unwrap_or_default();
            if url.is_empty() {
                return None;
            }

            let summary_html = entry.summary().map(|s| s.as_str()).unwrap_or_default();
            let content_html = entry
                .content()
                .and_then(|c| c.value())
                .unwrap_or_default();
            let body_html = if summary_html.is_empty() {
                content_html
            } else {
                summary_html
            };
            let description = html::clean_text(body_html);

            Some(DiscoveredArticle {
                url,
                title: Some(html::clean_text(&entry.title().to_string())),
                description: (!description.is_empty()).then_some(description),
                published: entry
                    .published()
                    .copied()
                    .or_else(|| Some(*entry.updated()))
                    .map(|d| d.with_timezone(&Utc)),
                image_url: html::extract_image_from_html(content_html)
                    .or_else(|| html::extract_image_from_html(summary_html)),
            })
        })
        .collect()
}

/// Parse a feed date against the fixed list of formats seen in the wild:
/// RFC 1123 with and without numeric zones (via RFC 2822), RFC 3339,
/// date-only, and a few common naive variants. Naive times are taken as UTC.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d %b %Y %H:%M:%S",
        "%a, %d %b %Y %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>El Diario</title>
    <link>https://news.site</link>
    <description>Noticias</description>
    <item>
      <title>T</title>
      <link>https://news.site/a?fbclid=1</link>
      <description>&lt;p&gt;Hello &amp;amp; welcome&lt;/p&gt;</description>
      <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
      <enclosure url="https://news.site/a.jpg" type="image/jpeg" length="1"/>
    </item>
    <item>
      <title>Sin fecha</title>
      <link>https://news.site/b</link>
    </item>
  </channel>
</rss>"#;

    const ATOM_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Canal</title>
  <id>urn:x</id>
  <updated>2024-03-01T00:00:00Z</updated>
  <entry>
    <title>Video nuevo</title>
    <id>urn:y</id>
    <link href="https://videos.example/watch?v=abc"/>
    <updated>2024-03-01T12:00:00Z</updated>
    <summary>descripcion breve</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items_with_cleaned_description() {
        let items = parse_feed(RSS_FIXTURE.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.url, "https://news.site/a?fbclid=1");
        assert_eq!(first.title.as_deref(), Some("T"));
        assert_eq!(first.description.as_deref(), Some("Hello & welcome"));
        assert_eq!(
            first.published,
            Some("2006-01-02T22:04:05Z".parse().unwrap())
        );
        assert_eq!(first.image_url.as_deref(), Some("https://news.site/a.jpg"));

        let second = &items[1];
        assert_eq!(second.description, None);
        assert_eq!(second.published, None);
    }

    #[test]
    fn falls_back_to_atom() {
        let entries = parse_feed(ATOM_FIXTURE.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://videos.example/watch?v=abc");
        assert_eq!(entries[0].title.as_deref(), Some("Video nuevo"));
        assert_eq!(entries[0].description.as_deref(), Some("descripcion breve"));
        assert_eq!(
            entries[0].published,
            Some("2024-03-01T12:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn rejects_unparseable_documents() {
        assert!(matches!(
            parse_feed(b"<html>not a feed</html>"),
            Err(FeedError::Malformed(_))
        ));
        assert!(matches!(
            parse_feed(b"{\"json\": true}"),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn date_formats() {
        // RFC 1123 with numeric zone
        assert_eq!(
            parse_feed_date("Mon, 02 Jan 2006 15:04:05 -0700"),
            Some("2006-01-02T22:04:05Z".parse().unwrap())
        );
        // RFC 1123 with zone name
        assert_eq!(
            parse_feed_date("Mon, 02 Jan 2006 15:04:05 GMT"),
            Some("2006-01-02T15:04:05Z".parse().unwrap())
        );
        // RFC 3339
        assert_eq!(
            parse_feed_date("2006-01-02T15:04:05+00:00"),
            Some("2006-01-02T15:04:05Z".parse().unwrap())
        );
        // Date only
        assert_eq!(
            parse_feed_date("2006-01-02"),
            Some("2006-01-02T00:00:00Z".parse().unwrap())
        );
        // Naive datetime taken as UTC
        assert_eq!(
            parse_feed_date("2006-01-02 15:04:05"),
            Some("2006-01-02T15:04:05Z".parse().unwrap())
        );
        assert_eq!(parse_feed_date("yesterday-ish"), None);
        assert_eq!(parse_feed_date(""), None);
    }

    #[test]
    fn image_from_description_when_no_enclosure() {
        let feed = r#"<rss version="2.0"><channel><title>t</title><link>x</link><description>d</description>
<item><title>i</title><link>https://a.com/x</link>
<description>&lt;img src="https://a.com/pic.png"&gt; text</description></item>
</channel></rss>"#;
        let items = parse_feed(feed.as_bytes()).unwrap();
        assert_eq!(items[0].image_url.as_deref(), Some("https://a.com/pic.png"));
    }
}
