use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Everything extracted from one fetched page.
///
/// Meta tags are bucketed by prefix: `og:*` properties land in `open_graph`,
/// `twitter:*` names in `twitter`, everything else in `general` (with the
/// prefix stripped inside the og/twitter buckets). A fetch that fails for any
/// reason produces the `Default` value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub canonical_url: Option<String>,
    /// The `lang` attribute of the root html element.
    pub language: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub general: BTreeMap<String, String>,
    #[serde(default)]
    pub open_graph: BTreeMap<String, String>,
    #[serde(default)]
    pub twitter: BTreeMap<String, String>,
    /// Each well-formed JSON-LD block from the page; malformed blocks are dropped.
    #[serde(default)]
    pub json_ld: Vec<serde_json::Value>,
    /// Derived: og:description, then meta description, then twitter:description.
    pub description: Option<String>,
    /// Derived: comma-split, trimmed, capped at 10.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Derived: explicit icon link resolved absolute, else /favicon.ico.
    pub favicon_url: Option<String>,
    /// Derived: first non-boilerplate paragraph blocks, capped at 300 chars.
    pub content_snippet: Option<String>,
}

impl PageMetadata {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.canonical_url.is_none()
            && self.language.is_none()
            && self.author.is_none()
            && self.general.is_empty()
            && self.open_graph.is_empty()
            && self.twitter.is_empty()
            && self.json_ld.is_empty()
            && self.description.is_none()
            && self.keywords.is_empty()
            && self.favicon_url.is_none()
            && self.content_snippet.is_none()
    }
}
