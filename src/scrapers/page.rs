//! Article page scraping: selector-based extraction over captured HTML.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use tracing::debug;

use super::http_client::PageClient;
use super::ScrapeError;
use crate::config::ScrapeConfig;
use crate::feeds::rss::parse_feed_date;
use crate::models::Selectors;
use crate::utils::{html, urls};

/// Fetch timeout for article pages and image probes.
const PAGE_TIMEOUT: Duration = Duration::from_secs(10);
/// Body cap for article pages.
const PAGE_BODY_CAP: usize = 2 * 1024 * 1024;
/// Body cap for image-probe fetches.
const PROBE_BODY_CAP: usize = 256 * 1024;

/// One scraped article page. Empty selectors yield empty fields, never
/// errors; `raw_html` always carries the full captured body.
#[derive(Debug, Clone, Default)]
pub struct ScrapedArticle {
    pub title: String,
    pub clean_text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub raw_html: String,
}

/// Page-fetching surface, object-safe for test stubs.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn scrape_article(
        &self,
        url: &str,
        selectors: &Selectors,
    ) -> Result<ScrapedArticle, ScrapeError>;

    /// Ordered unique absolute URLs from a listing page.
    async fn scrape_links(
        &self,
        list_url: &str,
        link_selector: &str,
    ) -> Result<Vec<String>, ScrapeError>;

    /// Best-effort `og:image` probe; empty string on any failure.
    async fn extract_image_url(&self, url: &str) -> String;
}

/// HTTP-backed scraper under the per-domain limiter.
pub struct PageScraper {
    client: PageClient,
}

impl PageScraper {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            client: PageClient::new(config),
        }
    }
}

#[async_trait]
impl PageFetcher for PageScraper {
    async fn scrape_article(
        &self,
        url: &str,
        selectors: &Selectors,
    ) -> Result<ScrapedArticle, ScrapeError> {
        let raw_html = self.client.get_text(url, PAGE_TIMEOUT, PAGE_BODY_CAP).await?;
        Ok(extract_article(&raw_html, selectors))
    }

    async fn scrape_links(
        &self,
        list_url: &str,
        link_selector: &str,
    ) -> Result<Vec<String>, ScrapeError> {
        let html = self.client.get_text(list_url, PAGE_TIMEOUT, PAGE_BODY_CAP).await?;
        Ok(extract_links(&html, list_url, link_selector))
    }

    async fn extract_image_url(&self, url: &str) -> String {
        match self.client.get_text(url, PAGE_TIMEOUT, PROBE_BODY_CAP).await {
            Ok(body) => html::extract_meta_image(&body).unwrap_or_default(),
            Err(e) => {
                debug!(url, error = %e, "image probe failed");
                String::new()
            }
        }
    }
}

/// Apply selectors to a captured page. Pure so the extraction rules are
/// testable without a server.
pub fn extract_article(raw_html: &str, selectors: &Selectors) -> ScrapedArticle {
    let document = Html::parse_document(raw_html);

    let mut title = select_first_text(&document, &selectors.title);
    if title.is_empty() {
        title = document_title(raw_html);
    }

    let clean_text = parse_selector(&selectors.body)
        .map(|sel| {
            document
                .select(&sel)
                .map(|node| html::clean_text(&node.inner_html()))
                .filter(|block| !block.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .unwrap_or_default();

    let published_at = parse_selector(&selectors.date).and_then(|sel| {
        document.select(&sel).find_map(|node| {
            let from_attr = node
                .value()
                .attr("datetime")
                .or_else(|| node.value().attr("content"))
                .and_then(parse_feed_date);
            from_attr.or_else(|| parse_feed_date(&node.text().collect::<String>()))
        })
    });

    ScrapedArticle {
        title,
        clean_text,
        published_at,
        raw_html: raw_html.to_string(),
    }
}

/// Extract anchors matching `link_selector`, resolved against the listing
/// URL, first-seen order, deduplicated.
pub fn extract_links(html: &str, base_url: &str, link_selector: &str) -> Vec<String> {
    let Some(selector) = parse_selector(link_selector) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for node in document.select(&selector) {
        let Some(href) = node.value().attr("href") else {
            continue;
        };
        let Some(absolute) = urls::resolve_href(base_url, href) else {
            continue;
        };
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }
    links
}

fn parse_selector(raw: &str) -> Option<Selector> {
    if raw.trim().is_empty() {
        return None;
    }
    Selector::parse(raw).ok()
}

fn select_first_text(document: &Html, selector: &str) -> String {
    parse_selector(selector)
        .and_then(|sel| {
            document
                .select(&sel)
                .map(|node| html::clean_text(&node.text().collect::<String>()))
                .find(|text| !text.is_empty())
        })
        .unwrap_or_default()
}

/// `<title>` fallback via substring scan; the head may be the only
/// well-formed part of the page.
fn document_title(raw_html: &str) -> String {
    let lower = raw_html.to_ascii_lowercase();
    let Some(start) = lower.find("<title") else {
        return String::new();
    };
    let after = &raw_html[start..];
    let Some(open_end) = after.find('>') else {
        return String::new();
    };
    let rest = &after[open_end + 1..];
    let end = rest
        .to_ascii_lowercase()
        .find("</title")
        .unwrap_or(rest.len());
    html::clean_text(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Head Title - El Sitio</title>
<meta property="og:image" content="https://a.com/og.png"></head>
<body>
<h1 class="headline">La Noticia</h1>
<time class="published" datetime="2024-02-01T09:30:00Z">1 de febrero</time>
<div class="story"><p>Primer parrafo.</p></div>
<div class="story"><p>Segundo &amp; final.</p></div>
</body></html>"#;

    fn selectors() -> Selectors {
        Selectors {
            link: String::new(),
            title: "h1.headline".into(),
            body: "div.story".into(),
            date: "time.published".into(),
        }
    }

    #[test]
    fn extracts_title_body_and_date() {
        let article = extract_article(PAGE, &selectors());
        assert_eq!(article.title, "La Noticia");
        assert_eq!(article.clean_text, "Primer parrafo.\n\nSegundo & final.");
        assert_eq!(
            article.published_at,
            Some("2024-02-01T09:30:00Z".parse().unwrap())
        );
        assert_eq!(article.raw_html, PAGE);
    }

    #[test]
    fn falls_back_to_document_title() {
        let mut sel = selectors();
        sel.title = "h2.missing".into();
        let article = extract_article(PAGE, &sel);
        assert_eq!(article.title, "Head Title - El Sitio");
    }

    #[test]
    fn empty_selectors_yield_empty_fields() {
        let article = extract_article(PAGE, &Selectors::default());
        // No selectors: body and date stay empty, title falls back to <title>.
        assert_eq!(article.clean_text, "");
        assert_eq!(article.published_at, None);
        assert_eq!(article.title, "Head Title - El Sitio");
    }

    #[test]
    fn invalid_selector_is_treated_as_empty() {
        let mut sel = selectors();
        sel.body = "div[unclosed".into();
        let article = extract_article(PAGE, &sel);
        assert_eq!(article.clean_text, "");
    }

    #[test]
    fn date_from_text_when_attr_missing() {
        let page = r#"<span class="fecha">2024-02-01</span>"#;
        let sel = Selectors {
            date: "span.fecha".into(),
            ..Selectors::default()
        };
        let article = extract_article(page, &sel);
        assert_eq!(
            article.published_at,
            Some("2024-02-01T00:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn links_are_absolute_unique_and_ordered() {
        let listing = r#"<ul>
<a class="story-link" href="/a">A</a>
<a class="story-link" href="https://other.site/b">B</a>
<a class="story-link" href="/a">dup</a>
<a class="other" href="/c">skip</a>
</ul>"#;
        let links = extract_links(listing, "https://news.site/section/", "a.story-link");
        assert_eq!(
            links,
            vec!["https://news.site/a", "https://other.site/b"]
        );
    }
}
