// Tag curation
//
// Final cleanup passes over the enriched tag set: collapse known duplicate
// spellings via the static merge table, fold cosplay variants, and drop bare
// tags shadowed by a prefixed counterpart in another namespace.

use std::collections::HashSet;

use crate::constants::TAGME;

const NAMESPACE_PREFIXES: [&str; 4] = ["artist:", "character:", "series:", "source:"];

/// Static alias/merge table for known duplicate spellings.
const MERGE_TABLE: &[(&str, &str)] = &[
    ("character:samurai_(7th_dragon_series)", "character:samurai_(7th_dragon)"),
    ("deep-blue_series", "series:deep-blue"),
    ("samurai_(7th_dragon)", "character:samurai_(7th_dragon)"),
    ("series:fate_(series)", "series:fate"),
    ("series:pokemon_(anime)", "series:pokemon"),
    ("series:pokemon_(classic_anime)", "series:pokemon"),
    ("series:pokemon_(game)", "series:pokemon"),
    ("series:pokemon_bw_(anime)", "series:pokemon_bw"),
    ("series:pokemon_dppt_(anime)", "series:pokemon_dppt"),
    ("series:pokemon_emerald", "series:pokemon_rse"),
    ("series:pokemon_rse_(anime)", "series:pokemon_rse"),
    ("series:pokemon_sm_(anime)", "series:pokemon_sm"),
    ("series:pokemon_xy_(anime)", "series:pokemon_xy"),
    ("series:x-men:_the_animated_series", "series:x-men"),
    ("x-men:_the_animated_series", "series:x-men"),
    ("x-men_film_series", "series:x-men"),
];

fn merge_tag(tag: &str) -> &str {
    MERGE_TABLE
        .iter()
        .find(|(from, _)| *from == tag)
        .map(|(_, to)| *to)
        .unwrap_or(tag)
}

fn is_shadowed(tag: &str, set: &HashSet<&str>) -> bool {
    if tag.contains(':') {
        return false;
    }
    NAMESPACE_PREFIXES
        .iter()
        .any(|p| set.contains(format!("{}{}", p, tag).as_str()))
}

/// Apply the curation passes in place:
/// 1. drop bare tags shadowed by a prefixed counterpart;
/// 2. rewrite through the merge table;
/// 3. drop tags newly shadowed after merging;
/// 4. collapse `<name>_(cosplay)` into bare `cosplay` when a matching
///    `character:<name>` tag is present;
/// 5. scrub any pre-existing `tagme` (the floor check re-adds it if needed).
pub fn apply_curation(tags: &mut Vec<String>) {
    let original: HashSet<&str> = tags.iter().map(|s| s.as_str()).collect();
    let step1: Vec<String> = tags
        .iter()
        .filter(|t| !is_shadowed(t, &original))
        .cloned()
        .collect();

    let step2: Vec<String> = step1.iter().map(|t| merge_tag(t).to_string()).collect();

    let merged: HashSet<&str> = step2.iter().map(|s| s.as_str()).collect();
    let step3: Vec<String> = step2
        .iter()
        .filter(|t| !is_shadowed(t, &merged))
        .cloned()
        .collect();

    let step3_set: HashSet<&str> = step3.iter().map(|s| s.as_str()).collect();
    let mut step4 = Vec::with_capacity(step3.len());
    for tag in &step3 {
        if let Some(base) = tag.strip_suffix("_(cosplay)") {
            if step3_set.contains(format!("character:{}", base).as_str()) {
                step4.push("cosplay".to_string());
                continue;
            }
        }
        step4.push(tag.clone());
    }

    tags.clear();
    tags.extend(step4.into_iter().filter(|t| t != TAGME));
}
