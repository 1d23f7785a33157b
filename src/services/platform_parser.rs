//! URL-Platform Parser for LinkShelf.
//!
//! Pure mapping from a URL's structure to platform, creator, and content-type
//! facts. No network I/O — everything here is derived from the URL alone, so
//! the output may be sparse (a bare `@handle` instead of a display name); the
//! platform merger fills the gaps from fetched metadata later.

use reqwest::Url;

use crate::types::bookmark::{PlatformData, PlatformKind};

/// Parses a URL into platform facts, if the host belongs to a known platform.
///
/// Unknown hosts and unparseable URLs return `None`.
pub fn parse(url: &str) -> Option<PlatformData> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    match host {
        "youtube.com" | "m.youtube.com" => Some(parse_youtube(&parsed, &segments)),
        "youtu.be" => Some(parse_youtube_short(&segments)),
        "github.com" => Some(parse_github(&segments)),
        "twitter.com" | "x.com" => Some(parse_twitter(&segments)),
        "reddit.com" | "old.reddit.com" => Some(parse_reddit(&segments)),
        "medium.com" => Some(parse_medium(&segments)),
        _ => parse_substack(host),
    }
}

fn parse_youtube(url: &Url, segments: &[String]) -> PlatformData {
    let mut data = PlatformData::new(PlatformKind::Youtube);
    data.content_type = Some("video".to_string());

    let video_id = url
        .query_pairs()
        .find_map(|(k, v)| if k == "v" { Some(v.to_string()) } else { None });
    if let Some(id) = video_id {
        data.extras.insert("video_id".to_string(), id);
    }
    match segments.first().map(String::as_str) {
        // Channel pages carry the handle in the path; the handle is all the
        // URL knows, a display name needs fetched metadata.
        Some(handle) if handle.starts_with('@') => {
            data.creator = Some(handle.to_string());
            data.content_type = Some("channel".to_string());
        }
        Some("channel") => {
            if let Some(id) = segments.get(1) {
                data.extras.insert("channel_id".to_string(), id.clone());
            }
            data.content_type = Some("channel".to_string());
        }
        _ => {}
    }
    data
}

fn parse_youtube_short(segments: &[String]) -> PlatformData {
    let mut data = PlatformData::new(PlatformKind::Youtube);
    data.content_type = Some("video".to_string());
    if let Some(id) = segments.first() {
        data.extras.insert("video_id".to_string(), id.clone());
    }
    data
}

fn parse_github(segments: &[String]) -> PlatformData {
    let mut data = PlatformData::new(PlatformKind::Github);
    data.content_type = Some("repository".to_string());
    if let Some(owner) = segments.first() {
        data.creator = Some(owner.clone());
        data.extras.insert("owner".to_string(), owner.clone());
    }
    if let Some(repo) = segments.get(1) {
        data.extras.insert("repo".to_string(), repo.clone());
    }
    data
}

fn parse_twitter(segments: &[String]) -> PlatformData {
    let mut data = PlatformData::new(PlatformKind::Twitter);
    data.content_type = Some("post".to_string());
    if let Some(handle) = segments.first() {
        if handle != "i" && handle != "home" && handle != "search" {
            data.creator = Some(format!("@{}", handle));
        }
    }
    if segments.get(1).map(String::as_str) == Some("status") {
        if let Some(id) = segments.get(2) {
            data.extras.insert("status_id".to_string(), id.clone());
        }
    }
    data
}

fn parse_reddit(segments: &[String]) -> PlatformData {
    let mut data = PlatformData::new(PlatformKind::Reddit);
    data.content_type = Some("thread".to_string());
    match segments.first().map(String::as_str) {
        Some("r") => {
            if let Some(sub) = segments.get(1) {
                data.extras.insert("subreddit".to_string(), sub.clone());
            }
        }
        Some("user") | Some("u") => {
            if let Some(user) = segments.get(1) {
                data.creator = Some(format!("u/{}", user));
            }
        }
        _ => {}
    }
    data
}

fn parse_medium(segments: &[String]) -> PlatformData {
    let mut data = PlatformData::new(PlatformKind::Medium);
    data.content_type = Some("article".to_string());
    if let Some(author) = segments.first() {
        if author.starts_with('@') {
            data.creator = Some(author.clone());
        } else {
            data.extras.insert("publication".to_string(), author.clone());
        }
    }
    data
}

fn parse_substack(host: &str) -> Option<PlatformData> {
    let publication = host.strip_suffix(".substack.com")?;
    let mut data = PlatformData::new(PlatformKind::Substack);
    data.content_type = Some("article".to_string());
    data.creator = Some(publication.to_string());
    data.extras
        .insert("publication".to_string(), publication.to_string());
    Some(data)
}
