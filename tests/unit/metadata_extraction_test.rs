//! Unit tests for lexical metadata extraction and liveness classification.
//!
//! Extraction runs over raw HTML strings; no network is involved.

use linkshelf::services::metadata_fetcher::{classify_liveness, extract_metadata, ProbeOutcome};
use linkshelf::types::bookmark::Liveness;

// === Liveness classification ===

#[test]
fn test_head_2xx_is_alive() {
    assert_eq!(classify_liveness(ProbeOutcome::Status(200), None), Liveness::Alive);
}

#[test]
fn test_head_3xx_is_alive() {
    assert_eq!(classify_liveness(ProbeOutcome::Status(301), None), Liveness::Alive);
}

#[test]
fn test_double_network_failure_is_dead() {
    let result = classify_liveness(ProbeOutcome::Failed, Some(ProbeOutcome::Failed));
    assert_eq!(result, Liveness::Dead);
}

/// A timed-out HEAD whose fallback GET completes at all — even with an error
/// status — must classify as unknown, never dead.
#[test]
fn test_timed_out_head_with_completing_fallback_is_unknown() {
    let result = classify_liveness(ProbeOutcome::TimedOut, Some(ProbeOutcome::Status(403)));
    assert_eq!(result, Liveness::Unknown);

    let result = classify_liveness(ProbeOutcome::TimedOut, Some(ProbeOutcome::Status(200)));
    assert_eq!(result, Liveness::Unknown);
}

#[test]
fn test_error_status_head_falls_back_rather_than_dying() {
    // A 404 page on a responding server is not a dead resource
    let result = classify_liveness(ProbeOutcome::Status(404), Some(ProbeOutcome::Status(404)));
    assert_eq!(result, Liveness::Unknown);
}

#[test]
fn test_timed_out_fallback_is_transient_not_dead() {
    let result = classify_liveness(ProbeOutcome::Failed, Some(ProbeOutcome::TimedOut));
    assert_eq!(result, Liveness::Unknown);
}

// === Meta tag bucketing ===

#[test]
fn test_meta_tags_bucketed_by_prefix() {
    let html = r#"<html><head>
        <meta name="description" content="Plain description">
        <meta property="og:description" content="OG description">
        <meta name="twitter:description" content="Twitter description">
        <meta property="og:title" content="OG Title">
        <meta name="author" content="Jane Writer">
    </head><body></body></html>"#;

    let meta = extract_metadata(html, "https://example.com/page");
    assert_eq!(meta.general.get("description").map(String::as_str), Some("Plain description"));
    assert_eq!(meta.open_graph.get("description").map(String::as_str), Some("OG description"));
    assert_eq!(meta.twitter.get("description").map(String::as_str), Some("Twitter description"));
    assert_eq!(meta.open_graph.get("title").map(String::as_str), Some("OG Title"));
    assert_eq!(meta.author.as_deref(), Some("Jane Writer"));
}

#[test]
fn test_description_priority_og_then_general_then_twitter() {
    let all = r#"<meta property="og:description" content="og">
                 <meta name="description" content="general">
                 <meta name="twitter:description" content="twitter">"#;
    assert_eq!(
        extract_metadata(all, "https://e.com").description.as_deref(),
        Some("og")
    );

    let no_og = r#"<meta name="description" content="general">
                   <meta name="twitter:description" content="twitter">"#;
    assert_eq!(
        extract_metadata(no_og, "https://e.com").description.as_deref(),
        Some("general")
    );

    let twitter_only = r#"<meta name="twitter:description" content="twitter">"#;
    assert_eq!(
        extract_metadata(twitter_only, "https://e.com").description.as_deref(),
        Some("twitter")
    );
}

#[test]
fn test_title_canonical_and_language() {
    let html = r#"<html lang="en-US"><head>
        <title>  The   Page Title </title>
        <link rel="canonical" href="https://example.com/canonical">
    </head></html>"#;

    let meta = extract_metadata(html, "https://example.com/page");
    assert_eq!(meta.title.as_deref(), Some("The Page Title"));
    assert_eq!(meta.canonical_url.as_deref(), Some("https://example.com/canonical"));
    assert_eq!(meta.language.as_deref(), Some("en-US"));
}

// === Keywords ===

#[test]
fn test_keywords_comma_split_trimmed_capped() {
    let html = r#"<meta name="keywords" content=" rust ,, async, web,a,b,c,d,e,f,g,h,i ">"#;
    let meta = extract_metadata(html, "https://e.com");
    assert_eq!(meta.keywords.len(), 10, "keyword list capped at 10");
    assert_eq!(meta.keywords[0], "rust");
    assert_eq!(meta.keywords[1], "async");
    assert!(meta.keywords.iter().all(|k| !k.is_empty() && k.trim() == k));
}

// === JSON-LD ===

#[test]
fn test_json_ld_blocks_parsed_independently() {
    let html = r#"
        <script type="application/ld+json">{"@type": "Article", "author": {"name": "A"}}</script>
        <script type="application/ld+json">{ this is not json</script>
        <script type="application/ld+json">{"@type": "WebSite"}</script>
        <script>var notLd = 1;</script>
    "#;

    let meta = extract_metadata(html, "https://e.com");
    // The malformed middle block is dropped; the others both survive
    assert_eq!(meta.json_ld.len(), 2);
    assert_eq!(meta.json_ld[0]["@type"], "Article");
    assert_eq!(meta.json_ld[1]["@type"], "WebSite");
}

// === Favicon ===

#[test]
fn test_favicon_explicit_link_resolved_absolute() {
    let html = r#"<link rel="icon" href="/static/fav.png">"#;
    let meta = extract_metadata(html, "https://example.com/deep/page");
    assert_eq!(meta.favicon_url.as_deref(), Some("https://example.com/static/fav.png"));
}

#[test]
fn test_favicon_relative_link_resolved_against_page() {
    let html = r#"<link rel="shortcut icon" href="fav.ico">"#;
    let meta = extract_metadata(html, "https://example.com/deep/page");
    assert_eq!(meta.favicon_url.as_deref(), Some("https://example.com/deep/fav.ico"));
}

#[test]
fn test_favicon_defaults_to_root_path() {
    let meta = extract_metadata("<html></html>", "https://example.com/deep/page");
    assert_eq!(meta.favicon_url.as_deref(), Some("https://example.com/favicon.ico"));
}

// === Content snippet ===

#[test]
fn test_snippet_skips_boilerplate_regions_and_blocks() {
    let para = "This paragraph carries enough real article text to qualify as a content block for the snippet.";
    let html = format!(
        r#"<html><body>
        <header><p>Header text that is long enough to qualify but must never appear.</p></header>
        <nav><p>Navigation text that is long enough to qualify but must never appear.</p></nav>
        <script>var x = "script text that is long enough to qualify but must never appear";</script>
        <!-- <p>A commented-out paragraph that is long enough to qualify too.</p> -->
        <p>We use cookies to improve your experience on this site, please accept them.</p>
        <p>{}</p>
        <footer><p>Copyright notice that is long enough to qualify but must never appear.</p></footer>
        </body></html>"#,
        para
    );

    let meta = extract_metadata(&html, "https://e.com");
    assert_eq!(meta.content_snippet.as_deref(), Some(para));
}

#[test]
fn test_snippet_joins_up_to_three_blocks_and_caps_at_300() {
    let block = "x".repeat(150);
    let html = format!(
        "<p>{b}</p><p>{b}</p><p>{b}</p><p>{b}</p>",
        b = block
    );
    let meta = extract_metadata(&html, "https://e.com");
    let snippet = meta.content_snippet.unwrap();
    assert_eq!(snippet.chars().count(), 300, "snippet capped at 300 chars");
}

#[test]
fn test_snippet_ignores_short_blocks() {
    let html = "<p>too short</p>";
    let meta = extract_metadata(html, "https://e.com");
    assert_eq!(meta.content_snippet, None);
}

// === Whole-result behavior ===

#[test]
fn test_empty_page_yields_mostly_empty_metadata() {
    let meta = extract_metadata("", "https://example.com");
    assert_eq!(meta.title, None);
    assert_eq!(meta.description, None);
    assert!(meta.keywords.is_empty());
    assert!(meta.json_ld.is_empty());
    // Only the conventional favicon fallback is derived from the URL alone
    assert_eq!(meta.favicon_url.as_deref(), Some("https://example.com/favicon.ico"));
}
