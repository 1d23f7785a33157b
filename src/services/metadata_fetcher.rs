//! Metadata Fetcher and Liveness Probe for LinkShelf.
//!
//! Issues HEAD/GET liveness probes and a bounded metadata GET, then extracts
//! structured fields from the raw response text. Extraction is a bounded,
//! single-pass, non-nesting-aware lexical scan — no structured document
//! parser is used, so malformed markup degrades the result instead of
//! failing it. Nothing in this module lets an error escape: a failed fetch
//! yields an empty [`PageMetadata`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tokio::time::timeout;
use tracing::debug;

use crate::types::bookmark::Liveness;
use crate::types::errors::EnrichError;
use crate::types::metadata::PageMetadata;

/// Bound on each individual liveness probe attempt.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Bound on the metadata GET.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const SNIPPET_MAX_CHARS: usize = 300;
const SNIPPET_MAX_BLOCKS: usize = 3;
const SNIPPET_MIN_BLOCK_CHARS: usize = 50;
const KEYWORDS_CAP: usize = 10;

const USER_AGENT: &str = concat!("linkshelf/", env!("CARGO_PKG_VERSION"));

/// Trait defining the probe/fetch seam of the pipeline.
///
/// The worker pool depends on this trait so tests can substitute a scripted
/// implementation for the real network client.
#[async_trait]
pub trait LinkProbeTrait: Send + Sync {
    /// Tri-state liveness check for one URL.
    async fn check_liveness(&self, url: &str) -> Liveness;
    /// Single bounded metadata fetch. Never fails; a fetch error produces an
    /// empty result.
    async fn fetch_metadata(&self, url: &str) -> PageMetadata;
}

/// Outcome of a single probe attempt, reduced to what classification needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server responded with this status code.
    Status(u16),
    /// The attempt exceeded its timeout.
    TimedOut,
    /// The attempt failed outright at the network layer.
    Failed,
}

/// Classifies liveness from the HEAD attempt and the fallback GET attempt.
///
/// `Alive` requires a 2xx/3xx HEAD. `Dead` requires the fallback to fail
/// outright at the network layer — a fallback that completes at all, even
/// with an error status or unreadable body, is `Unknown`. A timed-out
/// fallback is a transient condition, also `Unknown`.
pub fn classify_liveness(head: ProbeOutcome, fallback: Option<ProbeOutcome>) -> Liveness {
    if let ProbeOutcome::Status(code) = head {
        if (200..400).contains(&code) {
            return Liveness::Alive;
        }
    }
    match fallback {
        Some(ProbeOutcome::Failed) => Liveness::Dead,
        Some(ProbeOutcome::Status(_)) | Some(ProbeOutcome::TimedOut) | None => Liveness::Unknown,
    }
}

/// Metadata fetcher backed by a shared `reqwest` client.
pub struct MetadataFetcher {
    client: Client,
}

impl MetadataFetcher {
    /// Creates the fetcher and its HTTP client.
    ///
    /// # Errors
    /// Returns `EnrichError::Setup` if the TLS-backed client cannot be built.
    pub fn new() -> Result<Self, EnrichError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| EnrichError::Setup(format!("HTTP client init failed: {}", e)))?;
        Ok(Self { client })
    }

    async fn probe(&self, request: reqwest::RequestBuilder) -> ProbeOutcome {
        match timeout(PROBE_TIMEOUT, request.send()).await {
            Ok(Ok(response)) => ProbeOutcome::Status(response.status().as_u16()),
            Ok(Err(e)) if e.is_timeout() => ProbeOutcome::TimedOut,
            Ok(Err(_)) => ProbeOutcome::Failed,
            Err(_) => ProbeOutcome::TimedOut,
        }
    }
}

#[async_trait]
impl LinkProbeTrait for MetadataFetcher {
    async fn check_liveness(&self, url: &str) -> Liveness {
        let head = self.probe(self.client.head(url)).await;
        if classify_liveness(head, None) == Liveness::Alive {
            debug!(url, "liveness probe: alive via HEAD");
            return Liveness::Alive;
        }

        let fallback = self.probe(self.client.get(url)).await;
        let liveness = classify_liveness(head, Some(fallback));
        debug!(url, ?head, ?fallback, ?liveness, "liveness probe fell back to GET");
        liveness
    }

    async fn fetch_metadata(&self, url: &str) -> PageMetadata {
        let response = match timeout(FETCH_TIMEOUT, self.client.get(url).send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                debug!(url, error = %e, "metadata fetch failed");
                return PageMetadata::default();
            }
            Err(_) => {
                debug!(url, "metadata fetch timed out");
                return PageMetadata::default();
            }
        };

        // The body read is bounded too; a stalled stream must not hang a worker
        match timeout(FETCH_TIMEOUT, response.text()).await {
            Ok(Ok(body)) => extract_metadata(&body, url),
            Ok(Err(e)) => {
                debug!(url, error = %e, "metadata body read failed");
                PageMetadata::default()
            }
            Err(_) => {
                debug!(url, "metadata body read timed out");
                PageMetadata::default()
            }
        }
    }
}

/// Extracts all metadata fields from a raw HTML body.
pub fn extract_metadata(html: &str, base_url: &str) -> PageMetadata {
    let mut meta = PageMetadata::default();

    scan_meta_tags(html, &mut meta);
    meta.title = extract_between_tags(html, "title")
        .map(|t| collapse_whitespace(&strip_tags(&t)))
        .filter(|t| !t.is_empty());
    meta.canonical_url = find_link_href(html, "canonical");
    meta.language = root_lang_attribute(html);
    meta.author = meta.general.get("author").cloned();
    meta.json_ld = extract_json_ld(html);

    meta.description = meta
        .open_graph
        .get("description")
        .or_else(|| meta.general.get("description"))
        .or_else(|| meta.twitter.get("description"))
        .cloned();
    meta.keywords = split_keywords(meta.general.get("keywords").map(String::as_str));
    meta.favicon_url = resolve_favicon(html, base_url);
    meta.content_snippet = extract_snippet(html);

    meta
}

/// Byte-wise ASCII-case-insensitive substring search.
///
/// Needles are ASCII tag fragments, so every reported index is a char boundary.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || from >= h.len() || h.len() - from < n.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Extracts the value of an attribute from a single tag's text.
fn attr_value(tag: &str, name: &str) -> Option<String> {
    let bytes = tag.as_bytes();
    let mut pos = 0;
    loop {
        let start = find_ci(tag, name, pos)?;
        // Require a word boundary before the attribute name
        if start > 0 && !bytes[start - 1].is_ascii_whitespace() {
            pos = start + name.len();
            continue;
        }
        let mut i = start + name.len();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            pos = start + name.len();
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        return match bytes.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let value_start = i + 1;
                let end = tag[value_start..].find(q as char)? + value_start;
                Some(tag[value_start..end].to_string())
            }
            Some(_) => {
                let value_start = i;
                let end = tag[value_start..]
                    .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                    .map(|e| e + value_start)
                    .unwrap_or(tag.len());
                Some(tag[value_start..end].to_string())
            }
            None => None,
        };
    }
}

/// Scans every meta tag, bucketing by prefix: `og:` properties, `twitter:`
/// names, everything else into the general bucket.
fn scan_meta_tags(html: &str, meta: &mut PageMetadata) {
    let mut pos = 0;
    while let Some(start) = find_ci(html, "<meta", pos) {
        let end = match html[start..].find('>') {
            Some(e) => start + e,
            None => break,
        };
        let tag = &html[start..end];
        pos = end + 1;

        let key = attr_value(tag, "property").or_else(|| attr_value(tag, "name"));
        let content = attr_value(tag, "content");
        let (key, content) = match (key, content) {
            (Some(k), Some(c)) => (k.to_lowercase(), c),
            _ => continue,
        };

        if let Some(stripped) = key.strip_prefix("og:") {
            meta.open_graph.insert(stripped.to_string(), content);
        } else if let Some(stripped) = key.strip_prefix("twitter:") {
            meta.twitter.insert(stripped.to_string(), content);
        } else {
            meta.general.insert(key, content);
        }
    }
}

/// Extracts content between a given tag pair.
fn extract_between_tags(html: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);
    let start = find_ci(html, &open, 0)?;
    let content_start = start + html[start..].find('>')? + 1;
    let end = find_ci(html, &close, content_start)?;
    Some(html[content_start..end].to_string())
}

/// Strips HTML tags to get plain text.
fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The `lang` attribute of the root html element.
fn root_lang_attribute(html: &str) -> Option<String> {
    let start = find_ci(html, "<html", 0)?;
    let end = start + html[start..].find('>')?;
    attr_value(&html[start..end], "lang").filter(|l| !l.is_empty())
}

/// The href of the first link tag whose rel contains `rel_needle`.
fn find_link_href(html: &str, rel_needle: &str) -> Option<String> {
    let mut pos = 0;
    while let Some(start) = find_ci(html, "<link", pos) {
        let end = start + html[start..].find('>')?;
        let tag = &html[start..end];
        pos = end + 1;

        if let Some(rel) = attr_value(tag, "rel") {
            if rel.to_lowercase().contains(rel_needle) {
                if let Some(href) = attr_value(tag, "href") {
                    if !href.is_empty() {
                        return Some(href);
                    }
                }
            }
        }
    }
    None
}

/// Each well-formed JSON-LD block on the page; a malformed block is dropped
/// silently without aborting extraction of the others.
fn extract_json_ld(html: &str) -> Vec<serde_json::Value> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_ci(html, "<script", pos) {
        let tag_end = match html[start..].find('>') {
            Some(e) => start + e,
            None => break,
        };
        let tag = &html[start..tag_end];
        pos = tag_end + 1;

        let is_json_ld = attr_value(tag, "type")
            .map(|t| t.eq_ignore_ascii_case("application/ld+json"))
            .unwrap_or(false);
        if !is_json_ld {
            continue;
        }

        let close = match find_ci(html, "</script", pos) {
            Some(c) => c,
            None => break,
        };
        if let Ok(value) = serde_json::from_str(html[pos..close].trim()) {
            blocks.push(value);
        }
        pos = close;
    }
    blocks
}

/// Comma-splits a raw keywords value, trimming and capping the list.
fn split_keywords(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .take(KEYWORDS_CAP)
            .collect(),
        None => Vec::new(),
    }
}

/// Resolves the page favicon to an absolute URL, preferring an explicit icon
/// link and falling back to the conventional root path.
fn resolve_favicon(html: &str, base_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    if let Some(href) = find_link_href(html, "icon") {
        if let Ok(absolute) = base.join(&href) {
            return Some(absolute.to_string());
        }
    }
    base.join("/favicon.ico").ok().map(|u| u.to_string())
}

const BOILERPLATE_MARKERS: &[&str] = &[
    "cookie",
    "copyright",
    "\u{a9}",
    "all rights reserved",
    "privacy policy",
    "terms of service",
    "enable javascript",
];

/// First 1–3 paragraph-like text blocks, after stripping script/style/nav/
/// header/footer/comment regions and dropping boilerplate blocks. Capped at
/// 300 characters.
fn extract_snippet(html: &str) -> Option<String> {
    let mut cleaned = remove_comments(html);
    for tag in ["script", "style", "nav", "header", "footer"] {
        cleaned = remove_tag_regions(&cleaned, tag);
    }

    let mut blocks: Vec<String> = Vec::new();
    let mut pos = 0;
    while blocks.len() < SNIPPET_MAX_BLOCKS {
        let start = match find_ci(&cleaned, "<p", pos) {
            Some(s) => s,
            None => break,
        };
        // "<p" must be the whole tag name, not a prefix of <pre> or <path>
        let after = cleaned.as_bytes().get(start + 2);
        if !matches!(after, Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            pos = start + 2;
            continue;
        }
        let content_start = match cleaned[start..].find('>') {
            Some(e) => start + e + 1,
            None => break,
        };
        let end = match find_ci(&cleaned, "</p", content_start) {
            Some(e) => e,
            None => break,
        };
        pos = end + 3;

        let text = collapse_whitespace(&strip_tags(&cleaned[content_start..end]));
        if text.chars().count() < SNIPPET_MIN_BLOCK_CHARS {
            continue;
        }
        let lowered = text.to_lowercase();
        if BOILERPLATE_MARKERS.iter().any(|m| lowered.contains(m)) {
            continue;
        }
        blocks.push(text);
    }

    if blocks.is_empty() {
        return None;
    }
    Some(truncate_chars(&blocks.join(" "), SNIPPET_MAX_CHARS))
}

/// Removes every `<tag ...>...</tag>` region. Non-nesting-aware: the region
/// ends at the first matching close tag.
fn remove_tag_regions(html: &str, tag: &str) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);
    let mut result = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(start) = find_ci(html, &open, pos) {
        // Boundary check so "<s" does not swallow "<section"
        let after = html.as_bytes().get(start + open.len());
        let is_tag = matches!(after, Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/');
        if !is_tag {
            result.push_str(&html[pos..start + open.len()]);
            pos = start + open.len();
            continue;
        }

        result.push_str(&html[pos..start]);
        match find_ci(html, &close, start) {
            Some(close_start) => {
                pos = match html[close_start..].find('>') {
                    Some(e) => close_start + e + 1,
                    None => html.len(),
                };
            }
            None => {
                pos = html.len();
            }
        }
    }
    result.push_str(&html[pos..]);
    result
}

/// Removes HTML comment regions.
fn remove_comments(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = find_ci(html, "<!--", pos) {
        result.push_str(&html[pos..start]);
        pos = match find_ci(html, "-->", start) {
            Some(end) => end + 3,
            None => html.len(),
        };
    }
    result.push_str(&html[pos..]);
    result
}

/// Truncates to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}
