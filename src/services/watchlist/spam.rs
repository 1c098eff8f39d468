//! Spam filtering for watchlist results.
//!
//! Pure and deterministic over its inputs. The phrase lists are defaults
//! for one region and language; new deployments supply their own.

use url::Url;

/// Substrings that mark the mention as being about somewhere else. Only
/// consulted when the text has no region marker at all.
const NON_REGION_TOKENS: &[&str] = &[
    "mexico",
    "méxico",
    "españa",
    "espana",
    "spain",
    "colombia",
    "venezuela",
    "argentina",
    "chile",
    "ecuador",
    "bolivia",
    "uruguay",
    "paraguay",
    "guatemala",
    "honduras",
    "nicaragua",
    "el salvador",
    "costa rica",
    "panamá",
    "panama",
    "república dominicana",
    "republica dominicana",
    "dominican republic",
    "florida",
    "texas",
    "california",
    "nueva york",
    "new york",
    "arizona",
    "illinois",
    "new jersey",
    "north carolina",
    "south carolina",
];

/// Markers that anchor a mention to the monitored region.
const REGION_MARKERS: &[&str] = &[
    "puerto rico",
    "puertorrique",
    "boricua",
    "borinquen",
    "san juan",
    "bayamón",
    "bayamon",
    "ponce",
    "caguas",
    "mayagüez",
    "mayaguez",
    "arecibo",
    "guaynabo",
    "carolina, pr",
    "vieques",
    "culebra",
];

const NSFW_PATTERNS: &[&str] = &[
    "porn",
    "xxx",
    "nsfw",
    "onlyfans",
    "escort",
    "camgirl",
    "hentai",
    "casino bonus",
    "viagra",
];

const CLICKBAIT_PATTERNS: &[&str] = &[
    "you won't believe",
    "click here",
    "giveaway",
    "sweepstakes",
    "sorteo y gana",
    "gana dinero",
    "horoscope",
    "horóscopo",
    "horoscopo",
    "sponsored content",
    "contenido patrocinado",
    "loteria resultados",
    "lotería resultados",
];

/// True when the text carries any region marker.
pub fn mentions_region(text: &str) -> bool {
    REGION_MARKERS.iter().any(|m| text.contains(m))
}

/// Ordered spam rules over one raw result. `keywords` are the org's
/// monitoring terms; they gate subreddit results only.
pub fn is_spam(title: &str, snippet: &str, url: &str, keywords: &[String]) -> bool {
    // 1. Video-platform or subreddit pages that are not a specific post.
    if is_platform_non_post(url) {
        return true;
    }

    // 2. Generic site homepages.
    if let Ok(parsed) = Url::parse(url) {
        if parsed.path().is_empty() || parsed.path() == "/" {
            return true;
        }
    }

    let text = format!("{} {} {}", title, snippet, url).to_lowercase();

    // 3. NSFW patterns.
    if NSFW_PATTERNS.iter().any(|p| text.contains(p)) {
        return true;
    }

    // 4. Off-region content: no region marker plus a conflated
    //    country/state token.
    if !mentions_region(&text) && NON_REGION_TOKENS.iter().any(|t| text.contains(t)) {
        return true;
    }

    // 5. Clickbait and aggregator noise.
    if CLICKBAIT_PATTERNS.iter().any(|p| text.contains(p)) {
        return true;
    }

    // 6. Subreddit results must actually mention a monitoring term.
    if is_subreddit_url(url) && !keywords.is_empty() {
        let mentioned = keywords
            .iter()
            .filter(|k| k.chars().count() > 1)
            .any(|k| text.contains(&k.to_lowercase()));
        if !mentioned {
            return true;
        }
    }

    false
}

fn is_subreddit_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == "reddit.com" || h.ends_with(".reddit.com")))
        .unwrap_or(false)
}

/// Platform pages that are not a specific post: any subreddit URL outside
/// `/r/<sub>/comments/`, and video-platform channel or landing pages that
/// are not a watch/shorts URL.
fn is_platform_non_post(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let path = parsed.path();

    if host == "reddit.com" || host.ends_with(".reddit.com") {
        return !is_reddit_post_path(path);
    }

    if host == "youtube.com" || host.ends_with(".youtube.com") || host == "youtu.be" {
        if host == "youtu.be" {
            return path.len() <= 1;
        }
        return !(path.starts_with("/watch") || path.starts_with("/shorts/"));
    }

    false
}

fn is_reddit_post_path(path: &str) -> bool {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    matches!(
        (segments.next(), segments.next(), segments.next()),
        (Some("r"), Some(_), Some("comments"))
    )
}
