// Shared constants
// Thresholds and formats match the catalog conventions the cache was built
// against. Do not change without rebuilding the cache.

// Hashing
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB

// Image extensions eligible for import
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "jxl", "avif"];

// Video extensions (pixel hash degenerates to the content hash for these)
pub const VIDEO_EXTENSIONS: [&str; 8] = [
    "gif", "webm", "mp4", "flv", "m4v", "f4v", "f4p", "ogv",
];

// Folder excluded from discovery and used for generated previews
pub const THUMBNAILS_FOLDER: &str = "thumbnails";

// Manifest
pub const MANIFEST_FILENAME: &str = "import.csv";

// Batch defaults
pub const DEFAULT_BATCH_SIZE: usize = 20;

// Rating thresholds (weighted score -> letter)
pub const DEFAULT_SAFE_MAX: i64 = 50;
pub const DEFAULT_QUESTIONABLE_MAX: i64 = 250;

// Oracle confidence thresholds
pub const DEFAULT_GENERAL_THRESHOLD: f64 = 0.5;
pub const DEFAULT_CHARACTER_THRESHOLD: f64 = 0.35;
pub const DEFAULT_RATING_THRESHOLD: f64 = 0.3;

// Thumbnail settings
pub const THUMB_LONG_EDGE: u32 = 512;
pub const THUMB_QUALITY: u32 = 92;
pub const THUMB_FORMAT: &str = "webp";

// Tag floor below which a post is flagged for manual review
pub const TAG_FLOOR: usize = 15;
pub const TAGME: &str = "tagme";

// Resolution tagging thresholds
pub const RES_SIDE_INCREDIBLE: u32 = 10_000;
pub const RES_PIXELS_ABSURD: u64 = 7_680_000;
pub const RES_PIXELS_HIGH: u64 = 3_686_400;
pub const RES_PIXELS_LOW: u64 = 589_824;
pub const RES_ASPECT_WIDE: f64 = 4.0;
pub const RES_ASPECT_TALL: f64 = 0.25;

// Mapping table filenames (under the database directory)
pub const CHARACTER_DB_FILENAME: &str = "characters.db";
pub const ARTIST_DB_FILENAME: &str = "artists.db";
pub const TAG_RATING_DB_FILENAME: &str = "tag_rating_dominant.db";
pub const CACHE_DB_FILENAME: &str = "posts_cache.db";
