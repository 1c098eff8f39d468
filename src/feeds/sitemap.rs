//! Sitemap parsing.
//!
//! Sitemaps use XML namespaces that selector-based parsers handle poorly,
//! so `<loc>` values are extracted by substring scanning.

use super::FeedError;

/// Extract `<loc>` URLs from a sitemap document, in document order.
pub fn parse_sitemap(xml: &str) -> Result<Vec<String>, FeedError> {
    let urls = extract_locs(xml);
    if urls.is_empty() {
        return Err(FeedError::Malformed(
            "no <loc> entries in sitemap".to_string(),
        ));
    }
    Ok(urls)
}

fn extract_locs(xml: &str) -> Vec<String> {
    let mut locs = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<loc>") {
        let after = &rest[start + 5..];
        match after.find("</loc>") {
            Some(end) => {
                let url = unescape_xml(after[..end].trim());
                if !url.is_empty() {
                    locs.push(url);
                }
                rest = &after[end + 6..];
            }
            None => break,
        }
    }
    locs
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_urls_in_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://news.site/story-1</loc></url>
  <url>
    <loc>https://news.site/story-2</loc>
  </url>
</urlset>"#;
        assert_eq!(
            parse_sitemap(xml).unwrap(),
            vec!["https://news.site/story-1", "https://news.site/story-2"]
        );
    }

    #[test]
    fn unescapes_xml_entities() {
        let xml = "<urlset><url><loc>https://a.com/s?q=x&amp;p=1</loc></url></urlset>";
        assert_eq!(parse_sitemap(xml).unwrap(), vec!["https://a.com/s?q=x&p=1"]);
    }

    #[test]
    fn empty_sitemap_is_malformed() {
        assert!(matches!(
            parse_sitemap("<urlset></urlset>"),
            Err(FeedError::Malformed(_))
        ));
        assert!(matches!(
            parse_sitemap("<html>nope</html>"),
            Err(FeedError::Malformed(_))
        ));
    }
}
