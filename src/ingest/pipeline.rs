// Per-batch orchestration
//
// One batch flows through four stages: resolve against the cache, classify
// whatever is still a stub, enrich every importable file into its final tag
// string, then generate the batch's thumbnails. Stage failures are per-file;
// the batch always completes.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::constants::THUMBNAILS_FOLDER;
use crate::db::mappings::Mappings;
use crate::db::schema::Post;
use crate::db::Cache;
use crate::error::Result;
use crate::ingest::existence::ExistenceChecker;
use crate::ingest::{resolver, Existence, MediaFile};
use crate::manifest::ManifestRow;
use crate::metadata;
use crate::oracle::{OracleThresholds, TagOracle};
use crate::preview::{self, ThumbTask};
use crate::tags::{self, Enriched};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache_path: PathBuf,
    pub threads: usize,
    pub skip_existing: bool,
    pub update_cache: bool,
    pub thumbnails: bool,
    pub prefix: String,
    pub safe_max: i64,
    pub questionable_max: i64,
    pub thresholds: OracleThresholds,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub rows: Vec<ManifestRow>,
    pub classified: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub thumbs_generated: usize,
}

/// Join a prefix and a relative path with forward slashes, the separator the
/// manifest consumer expects on every platform.
fn slash_join(prefix: &str, rel: &Path) -> String {
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("{}/{}", prefix, parts.join("/"))
}

/// Parse the enriched tag list back into category fields for persistence.
/// Prefixed tags return to their columns; the source travels in its own
/// field, not as a tag.
fn post_from_enriched(md5: &str, pixel_hash: &str, enriched: &Enriched) -> Post {
    let mut post = Post {
        md5: md5.to_string(),
        pixel_hash: pixel_hash.to_string(),
        rating: enriched.rating.to_string(),
        source: enriched.source.clone().unwrap_or_default(),
        general: Vec::new(),
        character: Vec::new(),
        artist: Vec::new(),
        series: Vec::new(),
    };
    for tag in &enriched.tags {
        if let Some(v) = tag.strip_prefix("character:") {
            post.character.push(v.to_string());
        } else if let Some(v) = tag.strip_prefix("artist:") {
            post.artist.push(v.to_string());
        } else if let Some(v) = tag.strip_prefix("series:") {
            post.series.push(v.to_string());
        } else if tag.strip_prefix("source:").is_none() {
            post.general.push(tag.clone());
        }
    }
    post
}

/// Run one batch end to end and return its manifest rows plus counters.
pub fn process_batch(
    files: &[MediaFile],
    config: &PipelineConfig,
    mappings: &Mappings,
    oracle: Option<&dyn TagOracle>,
    checker: Option<&dyn ExistenceChecker>,
) -> Result<BatchOutcome> {
    let mut results = resolver::resolve_batch(
        files,
        &config.cache_path,
        config.threads,
        config.skip_existing,
        checker,
    );

    let cache = Cache::open(&config.cache_path)?;
    let mut outcome = BatchOutcome::default();

    if let Some(oracle) = oracle {
        outcome.classified = resolver::classify_batch(
            &mut results,
            oracle,
            &config.thresholds,
            &cache,
            config.update_cache,
        )?;
    }

    let mut tasks: Vec<ThumbTask> = Vec::new();

    for result in results {
        let res = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping file: {}", e);
                outcome.failed += 1;
                continue;
            }
        };

        match res.existence {
            Existence::Present => {
                // The catalog already carries this file and its thumbnail.
                // Skipping here keeps it out of the manifest and out of the
                // thumbnail task list in one step.
                info!("{} already in catalog, skipping", res.file.file_name());
                outcome.skipped_existing += 1;
                continue;
            }
            Existence::Error => {
                warn!(
                    "Existence check failed for {}, leaving it out of the manifest",
                    res.file.file_name()
                );
                outcome.failed += 1;
                continue;
            }
            Existence::Absent => {}
        }

        let rel = match res.file.relative_path() {
            Ok(r) => r.to_path_buf(),
            Err(e) => {
                warn!("Skipping {}: {}", res.file.path.display(), e);
                outcome.failed += 1;
                continue;
            }
        };

        let sidecar = tags::read_sidecar_tags(&res.file.path);
        let dims = metadata::probe_dimensions(&res.file.path, res.file.format);
        let enriched = tags::enrich_post(
            &res.post,
            &sidecar,
            dims,
            &res.file.file_name(),
            mappings,
            config.safe_max,
            config.questionable_max,
        );

        if config.update_cache {
            let post = post_from_enriched(&res.post.md5, &res.post.pixel_hash, &enriched);
            cache.upsert(&post)?;
        }

        let thumb_rel = Path::new(THUMBNAILS_FOLDER).join(&rel);
        let thumbnail = if config.thumbnails {
            slash_join(&config.prefix, &thumb_rel)
        } else {
            String::new()
        };

        if config.thumbnails {
            let dest = res.file.root.join(&thumb_rel);
            if !dest.exists() {
                tasks.push(ThumbTask {
                    source: res.file.path.clone(),
                    dest,
                    format: res.file.format,
                });
            }
        }

        outcome.rows.push(ManifestRow {
            path: slash_join(&config.prefix, &rel),
            tags: enriched.tag_string.clone(),
            rating: enriched.rating,
            thumbnail,
        });
    }

    if !tasks.is_empty() {
        outcome.thumbs_generated = preview::generate_batch(&tasks, config.threads);
    }

    Ok(outcome)
}
