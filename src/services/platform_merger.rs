//! Platform Merger for LinkShelf.
//!
//! Combines the URL parser's structure-only platform facts with fetched page
//! metadata. The merge fills gaps only: a value the parser already produced
//! is never overwritten, with one platform-specific exception — for video
//! platforms a structured-data author name takes precedence over the bare
//! `@handle` the URL carries.

use crate::types::bookmark::{PlatformData, PlatformKind};
use crate::types::metadata::PageMetadata;

/// Fills absent platform fields from fetched metadata.
///
/// Returns the input unchanged when no platform was recognized.
pub fn merge(platform_data: Option<PlatformData>, metadata: &PageMetadata) -> Option<PlatformData> {
    let mut data = platform_data?;

    match data.kind {
        PlatformKind::Youtube => {
            // A display name from structured data beats the URL's bare handle
            let is_bare_handle = data
                .creator
                .as_deref()
                .map(|c| c.starts_with('@'))
                .unwrap_or(true);
            if is_bare_handle {
                if let Some(name) = json_ld_author(metadata) {
                    data.creator = Some(name);
                }
            }
        }
        PlatformKind::Medium | PlatformKind::Substack => {
            if data.creator.is_none() {
                data.creator = json_ld_author(metadata)
                    .or_else(|| metadata.general.get("article:author").cloned())
                    .or_else(|| metadata.author.clone());
            }
        }
        PlatformKind::Github | PlatformKind::Twitter | PlatformKind::Reddit => {
            if data.creator.is_none() {
                data.creator = json_ld_author(metadata).or_else(|| metadata.author.clone());
            }
        }
    }

    if data.content_type.is_none() {
        data.content_type = metadata.open_graph.get("type").cloned();
    }
    if !data.extras.contains_key("site_name") {
        if let Some(site_name) = metadata.open_graph.get("site_name") {
            data.extras
                .insert("site_name".to_string(), site_name.clone());
        }
    }

    Some(data)
}

/// Author name from the page's JSON-LD blocks.
///
/// Accepts the common shapes: a string, an object with `name`, or an array
/// of either; the first usable value wins.
fn json_ld_author(metadata: &PageMetadata) -> Option<String> {
    for block in &metadata.json_ld {
        if let Some(author) = block.get("author") {
            if let Some(name) = author_name(author) {
                return Some(name);
            }
        }
    }
    None
}

fn author_name(author: &serde_json::Value) -> Option<String> {
    match author {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Object(map) => map
            .get("name")
            .and_then(|n| n.as_str())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        serde_json::Value::Array(items) => items.iter().find_map(author_name),
        _ => None,
    }
}
