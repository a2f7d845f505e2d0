// Read-only mapping tables, loaded once per run and shared by reference
// across all workers.

use std::collections::HashMap;
use std::path::Path;

use log::info;
use rusqlite::Connection;

use crate::error::{BooruError, Result};

/// Lookup tables for tag enrichment and rating classification.
#[derive(Debug, Default)]
pub struct Mappings {
    /// Bare character tag -> one or more series tags.
    pub character_series: HashMap<String, Vec<String>>,
    /// Bare tag -> canonical artist tag.
    pub artist_alias: HashMap<String, String>,
    /// Tag -> rating weight.
    pub tag_weights: HashMap<String, i64>,
}

/// Paths to the three mapping-table files.
pub struct MappingPaths<'a> {
    pub characters: &'a Path,
    pub artists: &'a Path,
    pub tag_ratings: &'a Path,
}

impl Mappings {
    /// Load all mapping tables. A missing file is a fatal startup error.
    pub fn load(paths: &MappingPaths) -> Result<Self> {
        for (name, path) in [
            ("character", paths.characters),
            ("artist", paths.artists),
            ("tag rating", paths.tag_ratings),
        ] {
            if !path.is_file() {
                return Err(BooruError::Startup(format!(
                    "{} mapping table not found: {}",
                    name,
                    path.display()
                )));
            }
        }

        let character_series = load_character_series(paths.characters)?;
        let artist_alias = load_artist_alias(paths.artists)?;
        let tag_weights = load_tag_weights(paths.tag_ratings)?;

        info!(
            "Loaded {} character mappings, {} artist aliases, {} tag weights",
            character_series.len(),
            artist_alias.len(),
            tag_weights.len()
        );

        Ok(Self {
            character_series,
            artist_alias,
            tag_weights,
        })
    }
}

fn load_character_series(path: &Path) -> Result<HashMap<String, Vec<String>>> {
    let conn = Connection::open(path)?;
    let mut map: HashMap<String, Vec<String>> = HashMap::new();

    let mut stmt = conn.prepare("SELECT * FROM data")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let character: String = row.get(0)?;
        let series: String = row.get(1)?;
        let character = character.trim();
        let series = series.trim();
        if character.is_empty() || series.is_empty() {
            continue;
        }
        let entry = map.entry(character.to_string()).or_default();
        if !entry.iter().any(|s| s == series) {
            entry.push(series.to_string());
        }
    }

    Ok(map)
}

fn load_artist_alias(path: &Path) -> Result<HashMap<String, String>> {
    let conn = Connection::open(path)?;
    let mut map = HashMap::new();

    let mut stmt = conn.prepare("SELECT * FROM data")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let alias: String = row.get(0)?;
        let canonical: String = row.get(1)?;
        let alias = alias.trim();
        let canonical = canonical.trim();
        if !alias.is_empty() && !canonical.is_empty() {
            map.insert(alias.to_string(), canonical.to_string());
        }
    }

    Ok(map)
}

fn load_tag_weights(path: &Path) -> Result<HashMap<String, i64>> {
    let conn = Connection::open(path)?;
    let mut map = HashMap::new();

    let mut stmt = conn.prepare("SELECT * FROM dominant_tag_ratings")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let tag: String = row.get(0)?;
        let weight: i64 = row.get(1)?;
        let tag = tag.trim();
        if !tag.is_empty() {
            map.insert(tag.to_string(), weight);
        }
    }

    Ok(map)
}
