//! HTML-to-text cleaning and lightweight meta extraction.
//!
//! Substring scanning instead of a DOM parser: the input is adversarial and
//! only a tiny subset of the markup matters. Bodies are already capped by
//! the fetch layer.

/// Closing tags treated as paragraph breaks when stripping markup.
const BLOCK_CLOSERS: &[&str] = &[
    "p",
    "div",
    "li",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "tr",
    "blockquote",
];

/// Convert an HTML fragment into whitespace-normalized plain text.
///
/// Closing block-level tags and `<br>` variants become newlines, all other
/// tags are stripped, the common entities are decoded, intra-line whitespace
/// is collapsed, and blank-line runs collapse to a single blank line.
/// Idempotent on its own output for plain text.
pub fn clean_text(html: &str) -> String {
    normalize_whitespace(&decode_entities(&strip_tags(html)))
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        match after.find('>') {
            Some(end) => {
                if is_block_break(&after[1..end]) {
                    out.push('\n');
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated tag: drop the remainder.
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_block_break(tag: &str) -> bool {
    let tag = tag.trim().to_ascii_lowercase();
    if let Some(name) = tag.strip_prefix('/') {
        return BLOCK_CLOSERS.contains(&name.trim());
    }
    // <br>, <br/>, <br />
    tag == "br" || tag.starts_with("br/") || tag.starts_with("br ")
}

/// Decode the entity subset that matters for news text. `&amp;` last so a
/// double-escaped entity is not decoded twice in one pass.
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        // At most one blank line between paragraphs.
        if collapsed.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(collapsed);
    }
    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// First `<img src=...>` URL in an HTML fragment.
pub fn extract_image_from_html(html: &str) -> Option<String> {
    let mut rest = html;
    while let Some(pos) = find_ci(rest, "<img") {
        let after = &rest[pos..];
        let end = after.find('>').unwrap_or(after.len());
        if let Some(src) = find_attr(&after[..end], "src") {
            if !src.is_empty() {
                return Some(src);
            }
        }
        rest = &after[end.min(after.len())..];
        if rest.is_empty() {
            break;
        }
        rest = &rest[1.min(rest.len())..];
    }
    None
}

/// `og:image` content from a page head, falling back to `twitter:image`.
pub fn extract_meta_image(html: &str) -> Option<String> {
    meta_content(html, "og:image").or_else(|| meta_content(html, "twitter:image"))
}

/// Scan `<meta>` tags for one whose property/name matches `key` and return
/// its `content` attribute.
fn meta_content(html: &str, key: &str) -> Option<String> {
    let mut rest = html;
    while let Some(pos) = find_ci(rest, "<meta") {
        let after = &rest[pos..];
        let end = after.find('>').unwrap_or(after.len());
        let tag = &after[..end];
        let named = find_attr(tag, "property")
            .or_else(|| find_attr(tag, "name"))
            .unwrap_or_default();
        if named.eq_ignore_ascii_case(key) {
            if let Some(content) = find_attr(tag, "content") {
                if !content.is_empty() {
                    return Some(content);
                }
            }
        }
        rest = &after[end.min(after.len())..];
        if rest.is_empty() {
            break;
        }
        rest = &rest[1.min(rest.len())..];
    }
    None
}

/// Extract a quoted attribute value from a raw tag slice.
pub fn find_attr(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let needle = format!("{}=", name);
    let mut search_from = 0;
    while let Some(rel) = lower[search_from..].find(&needle) {
        let at = search_from + rel;
        // Must start an attribute, not the tail of a longer name.
        let valid_start = at == 0
            || lower[..at]
                .chars()
                .next_back()
                .map_or(true, |c| c.is_whitespace());
        let value_start = at + needle.len();
        if valid_start {
            let rest = &tag[value_start..];
            let mut chars = rest.chars();
            return match chars.next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &rest[1..];
                    body.find(q).map(|end| decode_entities(&body[..end]))
                }
                Some(_) => {
                    let end = rest
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(rest.len());
                    Some(decode_entities(&rest[..end]))
                }
                None => None,
            };
        }
        search_from = value_start;
    }
    None
}

/// Case-insensitive substring search returning the byte offset.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}
