//! Categorizer for LinkShelf.
//!
//! Deterministic, first-match-wins rule chain assigning a category to a
//! bookmark: domain substring, then URL path substring, then keywords found
//! in the title and description, then the page's own keyword list. No
//! scoring, no ties; when nothing matches the category stays unset.

use crate::types::bookmark::BookmarkRecord;
use crate::types::metadata::PageMetadata;

/// Domain-substring rules. Checked first; a hit here beats everything else.
const DOMAIN_RULES: &[(&str, &str)] = &[
    ("github.com", "code"),
    ("gitlab.com", "code"),
    ("bitbucket.org", "code"),
    ("stackoverflow.com", "code"),
    ("youtube.com", "video"),
    ("youtu.be", "video"),
    ("vimeo.com", "video"),
    ("twitch.tv", "video"),
    ("medium.com", "article"),
    ("substack.com", "article"),
    ("dev.to", "article"),
    ("arxiv.org", "research"),
    ("scholar.google", "research"),
    ("wikipedia.org", "reference"),
    ("news.ycombinator.com", "news"),
    ("reddit.com", "social"),
    ("twitter.com", "social"),
    ("x.com", "social"),
    ("linkedin.com", "social"),
    ("amazon.", "shopping"),
    ("ebay.", "shopping"),
];

/// URL-path-substring rules. Checked after domains.
const PATH_RULES: &[(&str, &str)] = &[
    ("/blog/", "article"),
    ("/docs/", "documentation"),
    ("/documentation/", "documentation"),
    ("/wiki/", "reference"),
    ("/watch", "video"),
    ("/tutorial", "learning"),
    ("/course", "learning"),
    ("/paper", "research"),
    ("/news/", "news"),
    ("/recipe", "cooking"),
];

/// Keyword rules, applied to title+description text and then to the fetched
/// keyword list.
const KEYWORD_RULES: &[(&str, &str)] = &[
    ("tutorial", "learning"),
    ("course", "learning"),
    ("how to", "learning"),
    ("documentation", "documentation"),
    ("api reference", "documentation"),
    ("recipe", "cooking"),
    ("review", "review"),
    ("research", "research"),
    ("paper", "research"),
    ("podcast", "audio"),
    ("video", "video"),
    ("news", "news"),
    ("blog", "article"),
];

/// Classifies a bookmark. Returns `None` when no rule matches.
pub fn categorize(record: &BookmarkRecord, metadata: &PageMetadata) -> Option<String> {
    let url = record.url.to_lowercase();
    let domain = record.domain.to_lowercase();

    for (needle, category) in DOMAIN_RULES {
        if domain.contains(needle) {
            return Some((*category).to_string());
        }
    }

    for (needle, category) in PATH_RULES {
        if url.contains(needle) {
            return Some((*category).to_string());
        }
    }

    let mut text = record.title.to_lowercase();
    if let Some(description) = metadata
        .description
        .as_deref()
        .or(record.description.as_deref())
    {
        text.push(' ');
        text.push_str(&description.to_lowercase());
    }
    for (needle, category) in KEYWORD_RULES {
        if text.contains(needle) {
            return Some((*category).to_string());
        }
    }

    for keyword in &metadata.keywords {
        let keyword = keyword.to_lowercase();
        for (needle, category) in KEYWORD_RULES {
            if keyword.contains(needle) {
                return Some((*category).to_string());
            }
        }
    }

    None
}
