// Tag enrichment and curation engine
//
// Deterministic multi-pass rewrite of a post's raw tag set into the
// normalized, deduplicated, category-complete set that lands in the manifest.
// The pipeline is a pure function of its arguments: sidecar tags and decoded
// dimensions are read by the caller and injected, so every pass is
// unit-testable without real files.

pub mod curation;
pub mod rating;
pub mod resolution;
pub mod source;

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{TAGME, TAG_FLOOR};
use crate::db::mappings::Mappings;
use crate::db::schema::Post;

/// Output of the enrichment pipeline for one file.
#[derive(Debug, Clone)]
pub struct Enriched {
    /// Final sorted, deduplicated tag list.
    pub tags: Vec<String>,
    /// Comma-joined rendering of `tags` for the manifest.
    pub tag_string: String,
    /// Content rating letter.
    pub rating: char,
    /// The resolved canonical source URL, when any candidate existed.
    pub source: Option<String>,
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Fold internal whitespace runs to a single underscore.
fn normalize_tag(tag: &str) -> String {
    whitespace_re().replace_all(tag.trim(), "_").to_string()
}

/// Repair the `_series)` suffix artifact introduced by character inference.
fn repair_series_suffix(tag: &str) -> String {
    match tag.strip_suffix("_series)") {
        Some(base) => format!("{})", base),
        None => tag.to_string(),
    }
}

/// Run the full enrichment pipeline for one post.
///
/// `sidecar_tags` are the parsed companion-file tags and `dimensions` the
/// decoded pixel size (None when probing failed; resolution tags are then
/// omitted). `filename` feeds the source heuristics.
pub fn enrich_post(
    post: &Post,
    sidecar_tags: &[String],
    dimensions: Option<(u32, u32)>,
    filename: &str,
    mappings: &Mappings,
    safe_max: i64,
    questionable_max: i64,
) -> Enriched {
    // 1. Union category tags (prefixed except general) with sidecar tags
    let mut tags: Vec<String> = Vec::new();
    tags.extend(post.general.iter().cloned());
    tags.extend(post.character.iter().map(|t| format!("character:{}", t)));
    tags.extend(post.series.iter().map(|t| format!("series:{}", t)));
    tags.extend(post.artist.iter().map(|t| format!("artist:{}", t)));
    tags.extend(sidecar_tags.iter().cloned());

    // 2. Character and artist inference from the mapping tables
    tags = infer_categories(tags, mappings);

    // 3. Resolution tagging: always recomputed from decoded dimensions
    resolution::retag_resolution(&mut tags, dimensions);

    // 4. Source resolution
    let resolved_source = source::resolve_best_source(&post.source, filename);
    if let Some(ref url) = resolved_source {
        tags.push(format!("source:{}", url));
    }

    // 5. Normalize whitespace and repair the inference suffix artifact
    tags = tags
        .iter()
        .map(|t| repair_series_suffix(&normalize_tag(t)))
        .collect();

    // 6. Curation: merge table, cosplay collapse, cross-namespace dedup
    curation::apply_curation(&mut tags);

    // 7. Flag sparse posts for manual review
    if tags.len() < TAG_FLOOR {
        tags.push(TAGME.to_string());
    }

    // 8. Rating, computed before placeholder tags so they never influence it
    let rating = rating::calculate_rating(
        &tags,
        std::slice::from_ref(&post.rating),
        &mappings.tag_weights,
        safe_max,
        questionable_max,
    );

    // 9. Category completeness: downstream consumers can always filter
    for prefix in ["artist:", "character:", "series:"] {
        if !tags.iter().any(|t| t.starts_with(prefix)) {
            tags.push(format!("{}{}", prefix, TAGME));
        }
    }

    // 10. Deduplicate and sort
    tags.sort_unstable();
    tags.dedup();

    let tag_string = tags.join(", ");

    Enriched {
        tags,
        tag_string,
        rating,
        source: resolved_source,
    }
}

/// For every bare tag present in the character table, add `character:<tag>`
/// plus its series tags and drop the bare tag; likewise map artist aliases to
/// their canonical `artist:` tag.
fn infer_categories(tags: Vec<String>, mappings: &Mappings) -> Vec<String> {
    let mut with_characters = Vec::with_capacity(tags.len());
    for tag in &tags {
        with_characters.push(tag.clone());
        if let Some(series_list) = mappings.character_series.get(tag.as_str()) {
            with_characters.push(format!("character:{}", tag));
            with_characters.extend(series_list.iter().map(|s| format!("series:{}", s)));
        }
    }
    let stage1: Vec<String> = with_characters
        .into_iter()
        .filter(|t| !mappings.character_series.contains_key(t.as_str()))
        .collect();

    let mut with_artists = Vec::with_capacity(stage1.len());
    for tag in &stage1 {
        with_artists.push(tag.clone());
        if let Some(canonical) = mappings.artist_alias.get(tag.as_str()) {
            with_artists.push(format!("artist:{}", canonical));
        }
    }
    with_artists
        .into_iter()
        .filter(|t| !mappings.artist_alias.contains_key(t.as_str()))
        .collect()
}

// ----- Sidecar tags -----

/// Unescape the HTML entities that occur in exported sidecar files.
fn html_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Parse free-text sidecar content into tags: comma/semicolon separated,
/// HTML-unescaped, `#` comment lines skipped, whitespace folded to
/// underscores.
pub fn parse_sidecar_text(text: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for line in text.lines() {
        let line = html_unescape(line.trim());
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for part in line.split([',', ';']) {
            let tag = normalize_tag(part);
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Read companion `.txt` tags for a media file. Checks both `stem.txt` and
/// `full_name.txt` next to the file. Unreadable sidecars are skipped.
pub fn read_sidecar_tags(media_path: &Path) -> Vec<String> {
    let mut tags = Vec::new();

    let mut candidates = Vec::new();
    candidates.push(media_path.with_extension("txt"));
    if let Some(name) = media_path.file_name().and_then(|n| n.to_str()) {
        if let Some(parent) = media_path.parent() {
            candidates.push(parent.join(format!("{}.txt", name)));
        }
    }
    candidates.dedup();

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }
        match std::fs::read_to_string(&candidate) {
            Ok(text) => tags.extend(parse_sidecar_text(&text)),
            Err(e) => log::warn!("Failed to read sidecar {}: {}", candidate.display(), e),
        }
    }

    tags
}
