// boorubatch CLI binary
//
// Walks an image collection, resolves each file against the metadata cache,
// classifies whatever the cache has never seen, enriches the tag sets, and
// writes a Shimmie bulk-import CSV (plus thumbnails on request).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

mod constants;
mod db;
mod error;
mod hash;
mod ingest;
mod manifest;
mod metadata;
mod oracle;
mod preview;
mod tags;
mod tools;

use constants::{
    CHARACTER_DB_FILENAME, DEFAULT_BATCH_SIZE, DEFAULT_CHARACTER_THRESHOLD,
    DEFAULT_GENERAL_THRESHOLD, DEFAULT_QUESTIONABLE_MAX, DEFAULT_RATING_THRESHOLD,
    DEFAULT_SAFE_MAX, MANIFEST_FILENAME, ARTIST_DB_FILENAME, TAG_RATING_DB_FILENAME,
};
use db::mappings::{MappingPaths, Mappings};
use db::Cache;
use ingest::discover::{chunk_batches, discover_media};
use ingest::existence::{CatalogChecker, ExistenceChecker};
use ingest::pipeline::{process_batch, PipelineConfig};
use oracle::{CommandOracle, OracleThresholds, TagOracle};

#[derive(Parser)]
#[command(name = "boorubatch")]
#[command(about = "Batch booru import: cache-backed tagging, curation and manifest generation", long_about = None)]
#[command(version)]
struct Args {
    /// Image collection root
    #[arg(long)]
    images: PathBuf,

    /// Optional separate video collection root
    #[arg(long)]
    videos: Option<PathBuf>,

    /// Files per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch: usize,

    /// Worker threads (default: half the CPUs)
    #[arg(long)]
    threads: Option<usize>,

    /// Persist resolved posts back into the cache
    #[arg(long)]
    update_cache: bool,

    /// Generate thumbnails alongside the manifest
    #[arg(long)]
    thumbnail: bool,

    /// Skip files the target catalog already has (needs --spath)
    #[arg(long, requires = "spath")]
    skip_existing: bool,

    /// Target catalog root, for existence checks
    #[arg(long)]
    spath: Option<PathBuf>,

    /// Catalog user for existence checks
    #[arg(long, default_value = "admin")]
    dbuser: String,

    /// Path prefix for manifest rows
    #[arg(long, default_value = "import")]
    prefix: String,

    /// Weighted score ceiling for rating s
    #[arg(long, default_value_t = DEFAULT_SAFE_MAX)]
    smax: i64,

    /// Weighted score ceiling for rating q
    #[arg(long, default_value_t = DEFAULT_QUESTIONABLE_MAX)]
    qmax: i64,

    /// General tag confidence threshold
    #[arg(long, default_value_t = DEFAULT_GENERAL_THRESHOLD)]
    gt: f64,

    /// Character tag confidence threshold
    #[arg(long, default_value_t = DEFAULT_CHARACTER_THRESHOLD)]
    ct: f64,

    /// Rating confidence threshold
    #[arg(long, default_value_t = DEFAULT_RATING_THRESHOLD)]
    rt: f64,

    /// External classifier command, e.g. "python tagger.py --quiet"
    #[arg(long)]
    oracle_cmd: Option<String>,

    /// Post cache path (default: <db-dir>/posts_cache.db)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Directory holding the mapping databases
    #[arg(long, default_value = "db")]
    db_dir: PathBuf,
}

fn default_threads() -> usize {
    (num_cpus::get() / 2).max(1)
}

fn print_banner(args: &Args, threads: usize, cache_path: &Path, file_count: usize) {
    println!("boorubatch");
    println!("  images:        {}", args.images.display());
    if let Some(videos) = &args.videos {
        println!("  videos:        {}", videos.display());
    }
    println!("  cache:         {}", cache_path.display());
    println!("  files:         {}", file_count);
    println!("  batch size:    {}", args.batch);
    println!("  threads:       {}", threads);
    println!("  update cache:  {}", args.update_cache);
    println!("  thumbnails:    {}", args.thumbnail);
    println!("  skip existing: {}", args.skip_existing);
}

fn run(args: Args) -> Result<()> {
    if !args.images.is_dir() {
        bail!("Image root is not a directory: {}", args.images.display());
    }
    if let Some(videos) = &args.videos {
        if !videos.is_dir() {
            bail!("Video root is not a directory: {}", videos.display());
        }
    }

    let characters = args.db_dir.join(CHARACTER_DB_FILENAME);
    let artists = args.db_dir.join(ARTIST_DB_FILENAME);
    let tag_ratings = args.db_dir.join(TAG_RATING_DB_FILENAME);
    let mappings = Mappings::load(&MappingPaths {
        characters: &characters,
        artists: &artists,
        tag_ratings: &tag_ratings,
    })
    .context("Failed to load mapping databases")?;

    let cache_path = args
        .cache
        .clone()
        .unwrap_or_else(|| db::cache_path(&args.db_dir));
    // Fail before any work if the cache is unusable
    Cache::open(&cache_path).context("Failed to open post cache")?;

    let oracle: Option<CommandOracle> = match &args.oracle_cmd {
        Some(cmd) => Some(CommandOracle::new(cmd).context("Invalid oracle command")?),
        None => None,
    };

    let checker: Option<CatalogChecker> = match (args.skip_existing, &args.spath) {
        (true, Some(spath)) => Some(CatalogChecker::new(spath.clone(), args.dbuser.clone())),
        _ => None,
    };

    let threads = args.threads.unwrap_or_else(default_threads).max(1);

    let files = discover_media(&args.images, args.videos.as_deref());
    if files.is_empty() {
        println!("No importable media found under {}", args.images.display());
        return Ok(());
    }

    print_banner(&args, threads, &cache_path, files.len());

    let config = PipelineConfig {
        cache_path,
        threads,
        skip_existing: args.skip_existing,
        update_cache: args.update_cache,
        thumbnails: args.thumbnail,
        prefix: args.prefix.clone(),
        safe_max: args.smax,
        questionable_max: args.qmax,
        thresholds: OracleThresholds {
            general: args.gt,
            character: args.ct,
            rating: args.rt,
        },
    };

    let batches = chunk_batches(files, args.batch);
    let total_batches = batches.len();

    let mut rows = Vec::new();
    let mut classified = 0usize;
    let mut skipped_existing = 0usize;
    let mut failed = 0usize;
    let mut thumbs = 0usize;

    for (i, batch) in batches.iter().enumerate() {
        info!("Batch {}/{} ({} files)", i + 1, total_batches, batch.len());
        let outcome = process_batch(
            batch,
            &config,
            &mappings,
            oracle.as_ref().map(|o| o as &dyn TagOracle),
            checker.as_ref().map(|c| c as &dyn ExistenceChecker),
        )?;
        classified += outcome.classified;
        skipped_existing += outcome.skipped_existing;
        failed += outcome.failed;
        thumbs += outcome.thumbs_generated;
        rows.extend(outcome.rows);
    }

    let manifest_path = args.images.join(MANIFEST_FILENAME);
    let written = manifest::write_manifest(rows, &manifest_path)?;

    println!("Done.");
    println!("  rows written:     {}", written);
    println!("  classified:       {}", classified);
    println!("  already imported: {}", skipped_existing);
    println!("  failed:           {}", failed);
    if args.thumbnail {
        println!("  thumbnails:       {}", thumbs);
    }
    println!("  manifest:         {}", manifest_path.display());

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    run(Args::parse())
}
