// Resolver and pipeline tests

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::db::mappings::Mappings;
use crate::db::schema::Post;
use crate::db::Cache;
use crate::ingest::existence::ExistenceChecker;
use crate::ingest::pipeline::{process_batch, PipelineConfig};
use crate::ingest::{resolver, Existence, MediaFile};
use crate::oracle::{OracleThresholds, OracleVerdict, TagOracle};

fn new_cache_file(dir: &Path) -> PathBuf {
    let path = dir.join("posts_cache.db");
    fs::File::create(&path).unwrap();
    // Bootstrap the schema the way the first worker would
    Cache::open(&path).unwrap();
    path
}

fn media(dir: &Path, name: &str, bytes: &[u8]) -> MediaFile {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    MediaFile::new(path, dir.to_path_buf()).unwrap()
}

fn thresholds() -> OracleThresholds {
    OracleThresholds {
        general: 0.5,
        character: 0.35,
        rating: 0.3,
    }
}

struct FixedOracle {
    verdict: OracleVerdict,
}

impl TagOracle for FixedOracle {
    fn classify(&self, files: &[PathBuf]) -> crate::error::Result<Vec<OracleVerdict>> {
        Ok(files.iter().map(|_| self.verdict.clone()).collect())
    }
}

struct OneHashChecker {
    present_md5: String,
}

impl ExistenceChecker for OneHashChecker {
    fn check(&self, md5: &str) -> Existence {
        if md5 == self.present_md5 {
            Existence::Present
        } else {
            Existence::Absent
        }
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let files: Vec<MediaFile> = (0..6)
        .map(|i| media(dir.path(), &format!("clip{}.mp4", i), format!("video-{}", i).as_bytes()))
        .collect();

    let seq_dir = dir.path().join("seq");
    let par_dir = dir.path().join("par");
    fs::create_dir_all(&seq_dir).unwrap();
    fs::create_dir_all(&par_dir).unwrap();
    let seq_cache = new_cache_file(&seq_dir);
    let par_cache = new_cache_file(&par_dir);

    let sequential = resolver::resolve_batch(&files, &seq_cache, 1, false, None);
    let parallel = resolver::resolve_batch(&files, &par_cache, 4, false, None);

    assert_eq!(sequential.len(), parallel.len());
    for (s, p) in sequential.iter().zip(parallel.iter()) {
        let (s, p) = (s.as_ref().unwrap(), p.as_ref().unwrap());
        assert_eq!(s.md5, p.md5);
        assert_eq!(s.pixel_hash, p.pixel_hash);
        assert_eq!(s.post, p.post);
        assert!(s.needs_classification);
    }

    // No record corrupted, one row per file
    let cache = Cache::open(&par_cache).unwrap();
    for result in &parallel {
        let r = result.as_ref().unwrap();
        let stored = cache.get_by_md5(&r.md5).unwrap().unwrap();
        assert!(stored.is_stub());
        assert_eq!(stored.pixel_hash, r.pixel_hash);
    }
}

#[test]
fn test_rerun_short_circuits_and_classified_posts_are_reused() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());
    let files = vec![media(dir.path(), "a.mp4", b"payload-a")];

    let first = resolver::resolve_batch(&files, &cache_path, 1, false, None);
    let first = first[0].as_ref().unwrap();
    assert!(first.needs_classification);

    // Classify out of band
    let cache = Cache::open(&cache_path).unwrap();
    let mut post = Post::stub(&first.md5, &first.pixel_hash);
    post.rating = "s".to_string();
    post.general = vec!["1girl".to_string()];
    cache.upsert(&post).unwrap();

    let second = resolver::resolve_batch(&files, &cache_path, 1, false, None);
    let second = second[0].as_ref().unwrap();
    assert!(!second.needs_classification);
    assert_eq!(second.post.rating, "s");
    assert_eq!(second.post.general, vec!["1girl"]);
}

#[test]
fn test_filename_hash_is_trusted() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());
    let embedded = "0123456789ABCDEF0123456789abcdef";
    let files = vec![media(dir.path(), &format!("{}.mp4", embedded), b"ignored")];

    let results = resolver::resolve_batch(&files, &cache_path, 1, false, None);
    let r = results[0].as_ref().unwrap();
    assert_eq!(r.md5, embedded.to_lowercase());
}

#[test]
fn test_per_file_errors_are_isolated() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());
    let files = vec![
        media(dir.path(), "ok1.mp4", b"one"),
        media(dir.path(), "broken.png", b"not an image at all"),
        media(dir.path(), "ok2.mp4", b"two"),
    ];

    let results = resolver::resolve_batch(&files, &cache_path, 2, false, None);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
}

#[test]
fn test_pixel_hash_adoption_across_encodings() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());

    let mut img = image::RgbaImage::new(2, 2);
    img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
    let png = dir.path().join("first.png");
    let webp = dir.path().join("second.webp");
    img.save(&png).unwrap();
    img.save(&webp).unwrap();

    let png_file = MediaFile::new(png, dir.path().to_path_buf()).unwrap();
    let webp_file = MediaFile::new(webp, dir.path().to_path_buf()).unwrap();

    let first = resolver::resolve_batch(std::slice::from_ref(&png_file), &cache_path, 1, false, None);
    let first = first[0].as_ref().unwrap();

    // Classify the png's record
    let cache = Cache::open(&cache_path).unwrap();
    let mut post = first.post.clone();
    post.rating = "q".to_string();
    post.character = vec!["alice".to_string()];
    cache.upsert(&post).unwrap();

    // Different bytes, same pixels: the webp adopts the classified record
    let second = resolver::resolve_batch(std::slice::from_ref(&webp_file), &cache_path, 1, false, None);
    let second = second[0].as_ref().unwrap();
    assert_ne!(second.md5, first.md5);
    assert_eq!(second.pixel_hash, first.pixel_hash);
    assert_eq!(second.post.md5, first.md5);
    assert_eq!(second.post.character, vec!["alice"]);
    assert!(!second.needs_classification);
}

#[test]
fn test_existence_check_marks_present() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());
    let files = vec![
        media(dir.path(), "a.mp4", b"first"),
        media(dir.path(), "b.mp4", b"second"),
    ];

    let probe = resolver::resolve_batch(&files, &cache_path, 1, false, None);
    let present_md5 = probe[0].as_ref().unwrap().md5.clone();

    let checker = OneHashChecker { present_md5 };
    let results = resolver::resolve_batch(&files, &cache_path, 1, true, Some(&checker));
    assert_eq!(results[0].as_ref().unwrap().existence, Existence::Present);
    assert_eq!(results[1].as_ref().unwrap().existence, Existence::Absent);
}

#[test]
fn test_classify_batch_fills_stubs_and_persists() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());
    let files = vec![media(dir.path(), "a.mp4", b"payload")];

    let mut results = resolver::resolve_batch(&files, &cache_path, 1, false, None);

    let verdict = OracleVerdict {
        general: HashMap::from([("smile".to_string(), 0.9)]),
        rating: HashMap::from([("general".to_string(), 0.8)]),
        ..Default::default()
    };
    let oracle = FixedOracle { verdict };
    let cache = Cache::open(&cache_path).unwrap();

    let classified =
        resolver::classify_batch(&mut results, &oracle, &thresholds(), &cache, true).unwrap();
    assert_eq!(classified, 1);

    let r = results[0].as_ref().unwrap();
    assert!(!r.needs_classification);
    assert_eq!(r.post.rating, "s");

    let stored = cache.get_by_md5(&r.md5).unwrap().unwrap();
    assert_eq!(stored.general, vec!["smile"]);
    assert_eq!(stored.rating, "s");

    // Nothing left to classify on a second pass
    let again =
        resolver::classify_batch(&mut results, &oracle, &thresholds(), &cache, true).unwrap();
    assert_eq!(again, 0);
}

#[test]
fn test_process_batch_emits_rows() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());
    let files = vec![
        media(dir.path(), "a.mp4", b"one"),
        media(dir.path(), "b.mp4", b"two"),
    ];

    let config = PipelineConfig {
        cache_path,
        threads: 2,
        skip_existing: false,
        update_cache: false,
        thumbnails: false,
        prefix: "import".to_string(),
        safe_max: 50,
        questionable_max: 250,
        thresholds: thresholds(),
    };

    let outcome = process_batch(&files, &config, &Mappings::default(), None, None).unwrap();
    assert_eq!(outcome.rows.len(), 2);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.rows[0].path, "import/a.mp4");
    // Unclassified stubs carry the needs-work marker and an unknown rating
    assert!(outcome.rows[0].tags.contains("tagme"));
    assert_eq!(outcome.rows[0].rating, '?');
}

#[test]
fn test_present_files_get_no_row_and_no_thumbnail() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());
    let files = vec![media(dir.path(), "a.mp4", b"bytes")];

    let probe = resolver::resolve_batch(&files, &cache_path, 1, false, None);
    let present_md5 = probe[0].as_ref().unwrap().md5.clone();
    let checker = OneHashChecker { present_md5 };

    let config = PipelineConfig {
        cache_path,
        threads: 1,
        skip_existing: true,
        update_cache: false,
        thumbnails: true,
        prefix: "import".to_string(),
        safe_max: 50,
        questionable_max: 250,
        thresholds: thresholds(),
    };

    let outcome =
        process_batch(&files, &config, &Mappings::default(), None, Some(&checker)).unwrap();
    assert_eq!(outcome.skipped_existing, 1);
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.thumbs_generated, 0);
    assert!(!dir.path().join("thumbnails/a.mp4").exists());
}

#[test]
fn test_process_batch_convergence_with_update_cache() {
    let dir = TempDir::new().unwrap();
    let cache_path = new_cache_file(dir.path());
    let files = vec![media(dir.path(), "a.mp4", b"payload")];

    let config = PipelineConfig {
        cache_path: cache_path.clone(),
        threads: 1,
        skip_existing: false,
        update_cache: true,
        thumbnails: false,
        prefix: "import".to_string(),
        safe_max: 50,
        questionable_max: 250,
        thresholds: thresholds(),
    };

    let first = process_batch(&files, &config, &Mappings::default(), None, None).unwrap();
    let cache = Cache::open(&cache_path).unwrap();
    let md5 = crate::hash::content_hash(&files[0].path).unwrap();
    let after_first = cache.get_by_md5(&md5).unwrap().unwrap();

    let second = process_batch(&files, &config, &Mappings::default(), None, None).unwrap();
    let after_second = cache.get_by_md5(&md5).unwrap().unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(first.rows[0].tags, second.rows[0].tags);
    assert_eq!(first.rows[0].rating, second.rows[0].rating);
}
