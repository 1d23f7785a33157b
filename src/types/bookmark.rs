use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tri-state liveness classification for a bookmarked URL.
///
/// `Unknown` covers both never-probed bookmarks and probes where the server
/// responded opaquely. It must never be conflated with `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Alive,
    Dead,
    Unknown,
}

impl Liveness {
    /// Maps to the nullable boolean column representation.
    pub fn as_column(self) -> Option<bool> {
        match self {
            Liveness::Alive => Some(true),
            Liveness::Dead => Some(false),
            Liveness::Unknown => None,
        }
    }

    /// Builds from the nullable boolean column representation.
    pub fn from_column(value: Option<bool>) -> Self {
        match value {
            Some(true) => Liveness::Alive,
            Some(false) => Liveness::Dead,
            None => Liveness::Unknown,
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Liveness::Unknown
    }
}

/// Platforms recognized by the URL parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Youtube,
    Github,
    Twitter,
    Reddit,
    Medium,
    Substack,
}

impl PlatformKind {
    /// Stable lowercase identifier used in the `platform` column.
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformKind::Youtube => "youtube",
            PlatformKind::Github => "github",
            PlatformKind::Twitter => "twitter",
            PlatformKind::Reddit => "reddit",
            PlatformKind::Medium => "medium",
            PlatformKind::Substack => "substack",
        }
    }
}

/// Platform-specific structured facts for a bookmark.
///
/// Tagged by `kind`; `extras` is a small side-table of platform-specific
/// key/value pairs (video id, repository name, subreddit, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformData {
    pub kind: PlatformKind,
    pub creator: Option<String>,
    pub content_type: Option<String>,
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

impl PlatformData {
    pub fn new(kind: PlatformKind) -> Self {
        Self {
            kind,
            creator: None,
            content_type: None,
            extras: BTreeMap::new(),
        }
    }
}

/// A saved link plus everything the enrichment pipeline has learned about it.
///
/// `last_checked` is advanced after every enrichment attempt, success or
/// failure, so a broken URL cannot be reselected on every batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub domain: String,
    pub date_added: i64,
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub is_alive: Liveness,
    pub last_checked: Option<i64>,
    pub favicon_url: Option<String>,
    pub content_snippet: Option<String>,
    pub raw_metadata: Option<serde_json::Value>,
    pub platform: Option<String>,
    pub creator: Option<String>,
    pub content_type: Option<String>,
    pub platform_data: Option<PlatformData>,
    pub enrichment_error: Option<String>,
}

impl BookmarkRecord {
    /// Creates a fresh record with all enrichment fields unset.
    pub fn new(id: &str, url: &str, title: &str, date_added: i64) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            title: title.to_string(),
            domain: domain_of(url),
            date_added,
            description: None,
            keywords: Vec::new(),
            category: None,
            is_alive: Liveness::Unknown,
            last_checked: None,
            favicon_url: None,
            content_snippet: None,
            raw_metadata: None,
            platform: None,
            creator: None,
            content_type: None,
            platform_data: None,
            enrichment_error: None,
        }
    }

    /// Whether the URL uses a scheme the pipeline can probe.
    pub fn is_http(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// Extracts the host portion of a URL, without any `www.` prefix.
///
/// Returns an empty string for unparseable input.
pub fn domain_of(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .split('@')
        .last()
        .unwrap_or("");
    let host = host.split(':').next().unwrap_or("");
    host.strip_prefix("www.").unwrap_or(host).to_lowercase()
}
