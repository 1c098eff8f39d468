//! Watchlist search agents.
//!
//! Each agent turns the derived queries into raw results from one channel:
//! news search RSS, web search, the local article corpus, video-platform
//! channel feeds, and subreddit search. The scanner applies the spam
//! filter and caps afterwards.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::feeds::rss::parse_feed;
use crate::models::{HitSource, WatchlistOrg};
use crate::repository::ArticleStore;
use crate::scrapers::http_client::read_body_capped;
use crate::utils::html::{decode_entities, find_attr};
use crate::utils::Deadline;

/// Body cap for search responses.
const SEARCH_BODY_CAP: usize = 512 * 1024;

/// One raw result before spam filtering.
#[derive(Debug, Clone)]
pub struct RawHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchAgent: Send + Sync {
    fn name(&self) -> &'static str;

    fn source(&self) -> HitSource;

    /// Whether this agent applies to the org at all.
    fn wants(&self, _org: &WatchlistOrg) -> bool {
        true
    }

    async fn scan(
        &self,
        org: &WatchlistOrg,
        queries: &[String],
        deadline: Deadline,
    ) -> anyhow::Result<Vec<RawHit>>;
}

/// Shared HTTP plumbing for the network-backed agents.
pub struct AgentClient {
    client: reqwest::Client,
}

impl AgentClient {
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    async fn fetch(&self, url: &str, deadline: Deadline) -> anyhow::Result<Vec<u8>> {
        let response = tokio::time::timeout(deadline.remaining(), self.client.get(url).send())
            .await
            .map_err(|_| anyhow::anyhow!("agent fetch timed out: {url}"))??;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {} from {url}", response.status());
        }
        let body = tokio::time::timeout(
            deadline.remaining(),
            read_body_capped(response, SEARCH_BODY_CAP),
        )
        .await
        .map_err(|_| anyhow::anyhow!("agent read timed out: {url}"))??;
        Ok(body)
    }

    /// Fetch a query URL and parse the body as a feed, mapping items to raw
    /// hits.
    async fn fetch_feed_hits(&self, url: &str, deadline: Deadline) -> anyhow::Result<Vec<RawHit>> {
        let body = self.fetch(url, deadline).await?;
        let items = parse_feed(&body)?;
        Ok(items
            .into_iter()
            .map(|item| RawHit {
                title: item.title.unwrap_or_default(),
                url: item.url,
                snippet: item.description.unwrap_or_default(),
            })
            .collect())
    }
}

/// Google News search RSS.
pub struct GoogleNewsAgent {
    client: Arc<AgentClient>,
}

impl GoogleNewsAgent {
    pub fn new(client: Arc<AgentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchAgent for GoogleNewsAgent {
    fn name(&self) -> &'static str {
        "google-news-rss"
    }

    fn source(&self) -> HitSource {
        HitSource::GoogleNewsRss
    }

    async fn scan(
        &self,
        _org: &WatchlistOrg,
        queries: &[String],
        deadline: Deadline,
    ) -> anyhow::Result<Vec<RawHit>> {
        let mut hits = Vec::new();
        for query in queries {
            if deadline.expired() {
                break;
            }
            let url = format!(
                "https://news.google.com/rss/search?q={}",
                urlencoding::encode(query)
            );
            match self.client.fetch_feed_hits(&url, deadline).await {
                Ok(mut found) => hits.append(&mut found),
                Err(e) => debug!(agent = self.name(), %query, error = %e, "query failed"),
            }
        }
        Ok(hits)
    }
}

/// Bing News search with RSS output.
pub struct BingNewsAgent {
    client: Arc<AgentClient>,
}

impl BingNewsAgent {
    pub fn new(client: Arc<AgentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchAgent for BingNewsAgent {
    fn name(&self) -> &'static str {
        "bing-news-rss"
    }

    fn source(&self) -> HitSource {
        HitSource::BingNewsRss
    }

    async fn scan(
        &self,
        _org: &WatchlistOrg,
        queries: &[String],
        deadline: Deadline,
    ) -> anyhow::Result<Vec<RawHit>> {
        let mut hits = Vec::new();
        for query in queries {
            if deadline.expired() {
                break;
            }
            let url = format!(
                "https://www.bing.com/news/search?q={}&format=rss",
                urlencoding::encode(query)
            );
            match self.client.fetch_feed_hits(&url, deadline).await {
                Ok(mut found) => hits.append(&mut found),
                Err(e) => debug!(agent = self.name(), %query, error = %e, "query failed"),
            }
        }
        Ok(hits)
    }
}

/// DuckDuckGo Lite: table-layout HTML results.
pub struct DdgLiteAgent {
    client: Arc<AgentClient>,
}

impl DdgLiteAgent {
    pub fn new(client: Arc<AgentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchAgent for DdgLiteAgent {
    fn name(&self) -> &'static str {
        "ddg-lite"
    }

    fn source(&self) -> HitSource {
        HitSource::DdgLite
    }

    async fn scan(
        &self,
        _org: &WatchlistOrg,
        queries: &[String],
        deadline: Deadline,
    ) -> anyhow::Result<Vec<RawHit>> {
        let mut hits = Vec::new();
        for query in queries {
            if deadline.expired() {
                break;
            }
            let url = format!(
                "https://lite.duckduckgo.com/lite/?q={}",
                urlencoding::encode(query)
            );
            match self.client.fetch(&url, deadline).await {
                Ok(body) => {
                    hits.extend(parse_ddg_lite(&String::from_utf8_lossy(&body)));
                }
                Err(e) => debug!(agent = self.name(), %query, error = %e, "query failed"),
            }
        }
        Ok(hits)
    }
}

/// Parse DuckDuckGo Lite results: `rel="nofollow"` anchors carry the link
/// and title, `result-snippet` cells the snippet that follows each anchor.
pub fn parse_ddg_lite(html: &str) -> Vec<RawHit> {
    let mut hits: Vec<RawHit> = Vec::new();
    let mut rest = html;

    while let Some(pos) = rest.find("<a ") {
        let after = &rest[pos..];
        let Some(tag_end) = after.find('>') else {
            break;
        };
        let tag = &after[..tag_end];
        let remainder = &after[tag_end + 1..];

        if tag.contains("rel=\"nofollow\"") {
            if let Some(href) = find_attr(tag, "href") {
                let title_end = remainder.find("</a>").unwrap_or(0);
                let title = crate::utils::html::clean_text(&remainder[..title_end]);
                let url = resolve_ddg_redirect(&href);

                // The snippet cell follows the result anchor.
                let snippet = remainder
                    .find("result-snippet")
                    .and_then(|at| {
                        let cell = &remainder[at..];
                        let open = cell.find('>')?;
                        let close = cell.find("</td>")?;
                        (open < close)
                            .then(|| crate::utils::html::clean_text(&cell[open + 1..close]))
                    })
                    .unwrap_or_default();

                if !url.is_empty() && !title.is_empty() {
                    hits.push(RawHit {
                        title,
                        url,
                        snippet,
                    });
                }
            }
        }
        rest = &remainder[remainder.find("</a>").map(|i| i + 4).unwrap_or(remainder.len())..];
    }

    hits
}

/// DDG wraps result links as `//duckduckgo.com/l/?uddg=<encoded>`.
fn resolve_ddg_redirect(href: &str) -> String {
    if let Some(at) = href.find("uddg=") {
        let encoded = &href[at + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    if href.starts_with("//") {
        return format!("https:{}", href);
    }
    decode_entities(href)
}

/// Scan of the already-ingested local corpus. The only agent with no
/// network I/O.
pub struct LocalCorpusAgent {
    articles: Arc<dyn ArticleStore>,
}

impl LocalCorpusAgent {
    pub fn new(articles: Arc<dyn ArticleStore>) -> Self {
        Self { articles }
    }
}

#[async_trait]
impl SearchAgent for LocalCorpusAgent {
    fn name(&self) -> &'static str {
        "local-corpus"
    }

    fn source(&self) -> HitSource {
        HitSource::LocalCorpus
    }

    async fn scan(
        &self,
        org: &WatchlistOrg,
        _queries: &[String],
        deadline: Deadline,
    ) -> anyhow::Result<Vec<RawHit>> {
        // Search the raw monitoring terms, not the region-suffixed queries:
        // local articles are already region-scoped.
        let mut terms: Vec<&str> = vec![org.name.as_str()];
        for keyword in &org.keywords {
            if !terms.iter().any(|t| t.eq_ignore_ascii_case(keyword)) {
                terms.push(keyword.as_str());
            }
        }

        let mut seen_urls = std::collections::HashSet::new();
        let mut hits = Vec::new();
        for term in terms {
            if deadline.expired() {
                break;
            }
            let found = self.articles.search(term, 10).await?;
            for article in found {
                if !seen_urls.insert(article.canonical_url.clone()) {
                    continue;
                }
                // Require a literal org-term match in the article body.
                let haystack = format!("{} {}", article.title, article.clean_text).to_lowercase();
                let matched = std::iter::once(&org.name)
                    .chain(org.keywords.iter())
                    .any(|t| haystack.contains(&t.to_lowercase()));
                if !matched {
                    continue;
                }
                let snippet = if article.summary.is_empty() {
                    article.clean_text.clone()
                } else {
                    article.summary.clone()
                };
                hits.push(RawHit {
                    title: article.title,
                    url: article.canonical_url,
                    snippet,
                });
            }
        }
        Ok(hits)
    }
}

/// Video-platform channel RSS. Applies only to orgs with channels
/// configured.
pub struct VideoChannelAgent {
    client: Arc<AgentClient>,
}

impl VideoChannelAgent {
    pub fn new(client: Arc<AgentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchAgent for VideoChannelAgent {
    fn name(&self) -> &'static str {
        "video-platform-rss"
    }

    fn source(&self) -> HitSource {
        HitSource::VideoPlatformRss
    }

    fn wants(&self, org: &WatchlistOrg) -> bool {
        !org.video_channels.is_empty()
    }

    async fn scan(
        &self,
        org: &WatchlistOrg,
        _queries: &[String],
        deadline: Deadline,
    ) -> anyhow::Result<Vec<RawHit>> {
        let mut hits = Vec::new();
        for channel in &org.video_channels {
            if deadline.expired() {
                break;
            }
            let url = format!(
                "https://www.youtube.com/feeds/videos.xml?channel_id={}",
                urlencoding::encode(channel)
            );
            match self.client.fetch_feed_hits(&url, deadline).await {
                Ok(mut found) => hits.append(&mut found),
                Err(e) => debug!(agent = self.name(), %channel, error = %e, "channel fetch failed"),
            }
        }
        Ok(hits)
    }
}

/// Subreddit search RSS.
pub struct SubredditAgent {
    client: Arc<AgentClient>,
}

impl SubredditAgent {
    pub fn new(client: Arc<AgentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchAgent for SubredditAgent {
    fn name(&self) -> &'static str {
        "subreddit-rss"
    }

    fn source(&self) -> HitSource {
        HitSource::SubredditRss
    }

    async fn scan(
        &self,
        _org: &WatchlistOrg,
        queries: &[String],
        deadline: Deadline,
    ) -> anyhow::Result<Vec<RawHit>> {
        let mut hits = Vec::new();
        for query in queries {
            if deadline.expired() {
                break;
            }
            let url = format!(
                "https://www.reddit.com/search.rss?q={}&sort=new",
                urlencoding::encode(query)
            );
            match self.client.fetch_feed_hits(&url, deadline).await {
                Ok(mut found) => hits.append(&mut found),
                Err(e) => debug!(agent = self.name(), %query, error = %e, "query failed"),
            }
        }
        Ok(hits)
    }
}

/// The fixed agent lineup, in scan order.
pub fn default_agents(
    user_agent: &str,
    articles: Arc<dyn ArticleStore>,
) -> Vec<Arc<dyn SearchAgent>> {
    let client = Arc::new(AgentClient::new(user_agent));
    vec![
        Arc::new(GoogleNewsAgent::new(client.clone())),
        Arc::new(BingNewsAgent::new(client.clone())),
        Arc::new(DdgLiteAgent::new(client.clone())),
        Arc::new(LocalCorpusAgent::new(articles)),
        Arc::new(VideoChannelAgent::new(client.clone())),
        Arc::new(SubredditAgent::new(client)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDG_PAGE: &str = r#"<html><body><table>
<tr><td>1.</td><td><a rel="nofollow" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fnews.site%2Fstory&amp;rut=abc">Titular de la noticia</a></td></tr>
<tr><td></td><td class="result-snippet">Resumen corto del resultado.</td></tr>
<tr><td>2.</td><td><a rel="nofollow" href="https://otro.site/nota">Otra nota</a></td></tr>
<tr><td></td><td class="result-snippet">Segundo resumen.</td></tr>
<tr><td><a href="/settings">settings</a></td></tr>
</table></body></html>"#;

    #[test]
    fn parses_ddg_lite_results() {
        let hits = parse_ddg_lite(DDG_PAGE);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://news.site/story");
        assert_eq!(hits[0].title, "Titular de la noticia");
        assert_eq!(hits[0].snippet, "Resumen corto del resultado.");
        assert_eq!(hits[1].url, "https://otro.site/nota");
        assert_eq!(hits[1].snippet, "Segundo resumen.");
    }

    #[test]
    fn ddg_redirect_resolution() {
        assert_eq!(
            resolve_ddg_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.com%2Fx&rut=1"),
            "https://a.com/x"
        );
        assert_eq!(resolve_ddg_redirect("https://plain.com/x"), "https://plain.com/x");
        assert_eq!(
            resolve_ddg_redirect("//lite.duckduckgo.com/next"),
            "https://lite.duckduckgo.com/next"
        );
    }

    #[tokio::test]
    async fn local_corpus_requires_term_match() {
        use crate::models::{Article, EvidencePolicy};
        use crate::repository::MemoryArticleStore;

        let articles = Arc::new(MemoryArticleStore::new());
        let mut org = WatchlistOrg::new("Fundación Ejemplo");
        org.keywords = vec!["Fundación Ejemplo".into(), "becas comunitarias".into()];

        let matching = Article::new(
            "https://news.site/a",
            "La Fundación Ejemplo inaugura centro".into(),
            "La organización abrió un nuevo centro en San Juan.".into(),
            "Src".into(),
            "PR".into(),
            EvidencePolicy::Ret3m,
        );
        articles.create(&matching).await.unwrap();

        let unrelated = Article::new(
            "https://news.site/b",
            "Resultados deportivos".into(),
            "El equipo ganó el torneo de becas privadas.".into(),
            "Src".into(),
            "PR".into(),
            EvidencePolicy::Ret3m,
        );
        articles.create(&unrelated).await.unwrap();

        let agent = LocalCorpusAgent::new(articles);
        let hits = agent
            .scan(&org, &[], Deadline::after(std::time::Duration::from_secs(30)))
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://news.site/a");
    }

    #[test]
    fn agent_lineup_order_is_fixed() {
        use crate::repository::MemoryArticleStore;
        let agents = default_agents("UA/1.0", Arc::new(MemoryArticleStore::new()));
        let names: Vec<&str> = agents.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "google-news-rss",
                "bing-news-rss",
                "ddg-lite",
                "local-corpus",
                "video-platform-rss",
                "subreddit-rss"
            ]
        );
    }
}
