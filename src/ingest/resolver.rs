// Concurrent batch resolution
//
// A bounded pool of OS threads drains a shared work index over the batch.
// Each worker opens its own cache connection at spawn and owns it for the
// pool's lifetime. Results land in index-aligned slots so batch order is
// preserved regardless of completion order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, warn};

use crate::db::Cache;
use crate::error::{BooruError, Result};
use crate::hash;
use crate::ingest::existence::ExistenceChecker;
use crate::ingest::{Existence, FormatClass, MediaFile, ResolutionResult};
use crate::oracle::{apply_verdict, OracleThresholds, TagOracle};

/// Resolve every file in the batch against the cache. The returned vector is
/// index-aligned with `files`; per-file failures are `Err` slots.
pub fn resolve_batch(
    files: &[MediaFile],
    cache_path: &Path,
    threads: usize,
    skip_existing: bool,
    checker: Option<&dyn ExistenceChecker>,
) -> Vec<Result<ResolutionResult>> {
    let n = files.len();
    let workers = threads.max(1).min(n.max(1));
    let next = AtomicUsize::new(0);

    let mut slots: Vec<Option<Result<ResolutionResult>>> = (0..n).map(|_| None).collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let next = &next;
                s.spawn(move || {
                    let mut local: Vec<(usize, Result<ResolutionResult>)> = Vec::new();

                    let cache = match Cache::open(cache_path) {
                        Ok(c) => c,
                        Err(e) => {
                            error!("Worker could not open cache: {}", e);
                            loop {
                                let i = next.fetch_add(1, Ordering::SeqCst);
                                if i >= n {
                                    break;
                                }
                                local.push((
                                    i,
                                    Err(BooruError::Startup(format!(
                                        "Cache unavailable in worker: {}",
                                        e
                                    ))),
                                ));
                            }
                            return local;
                        }
                    };

                    loop {
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        if i >= n {
                            break;
                        }
                        let result =
                            resolve_one(&files[i], &cache, skip_existing, checker);
                        local.push((i, result));
                    }
                    local
                })
            })
            .collect();

        for handle in handles {
            if let Ok(local) = handle.join() {
                for (i, result) in local {
                    slots[i] = Some(result);
                }
            }
        }
    });

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.unwrap_or_else(|| {
                Err(BooruError::Startup(format!(
                    "Worker died before resolving {}",
                    files[i].path.display()
                )))
            })
        })
        .collect()
}

/// Resolve one file: content hash first, stored pixel hash reused or
/// backfilled on a hit, pixel-hash adoption or stub insertion on a miss.
fn resolve_one(
    file: &MediaFile,
    cache: &Cache,
    skip_existing: bool,
    checker: Option<&dyn ExistenceChecker>,
) -> Result<ResolutionResult> {
    let md5 = hash::content_hash(&file.path)?;
    let is_video = file.format == FormatClass::Video;

    let (post, needs_classification) = match cache.get_by_md5(&md5)? {
        Some(mut post) => {
            if post.pixel_hash.is_empty() {
                let px = pixel_hash_for(file, &md5, is_video)?;
                cache.set_pixel_hash(&md5, &px)?;
                post.pixel_hash = px;
            }
            let stub = post.is_stub();
            (post, stub)
        }
        None => {
            let px = pixel_hash_for(file, &md5, is_video)?;
            match cache.get_by_pixel_hash(&px)? {
                // Same pixels under a different encoding: adopt the record
                Some(post) => {
                    let stub = post.is_stub();
                    (post, stub)
                }
                None => (cache.insert_stub(&md5, &px)?, true),
            }
        }
    };

    let existence = match (skip_existing, checker) {
        (true, Some(c)) => c.check(&md5),
        _ => Existence::Absent,
    };

    Ok(ResolutionResult {
        file: file.clone(),
        md5,
        pixel_hash: post.pixel_hash.clone(),
        post,
        existence,
        needs_classification,
    })
}

/// Video has no canonical pixel form; its content hash doubles as the pixel
/// hash.
fn pixel_hash_for(file: &MediaFile, md5: &str, is_video: bool) -> Result<String> {
    if is_video {
        Ok(md5.to_string())
    } else {
        hash::compute_pixel_hash(&file.path)
    }
}

/// Send every unclassified file in the batch to the oracle in a single call
/// and fold the verdicts back into the resolved posts. An oracle failure is
/// logged and leaves the stubs untouched; the run continues. Returns the
/// number of files classified.
pub fn classify_batch(
    results: &mut [Result<ResolutionResult>],
    oracle: &dyn TagOracle,
    thresholds: &OracleThresholds,
    cache: &Cache,
    update_cache: bool,
) -> Result<usize> {
    let targets: Vec<usize> = results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| match r {
            Ok(res) if res.needs_classification => Some(i),
            _ => None,
        })
        .collect();

    if targets.is_empty() {
        return Ok(0);
    }

    let paths: Vec<PathBuf> = targets
        .iter()
        .filter_map(|&i| results[i].as_ref().ok().map(|r| r.file.path.clone()))
        .collect();

    let verdicts = match oracle.classify(&paths) {
        Ok(v) => v,
        Err(e) => {
            warn!("Classification failed for batch of {}: {}", paths.len(), e);
            return Ok(0);
        }
    };

    for (&slot, verdict) in targets.iter().zip(verdicts.iter()) {
        if let Ok(res) = &mut results[slot] {
            apply_verdict(&mut res.post, verdict, thresholds);
            res.needs_classification = false;
            if update_cache {
                cache.upsert(&res.post)?;
            }
        }
    }

    Ok(targets.len())
}
