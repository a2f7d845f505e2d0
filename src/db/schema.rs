// Post record schema and query helpers

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// The cached metadata record for one piece of content, keyed by the MD5
/// content hash. The four tag sets are stored as comma-joined strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub md5: String,
    pub pixel_hash: String,
    pub rating: String,
    pub source: String,
    pub general: Vec<String>,
    pub character: Vec<String>,
    pub artist: Vec<String>,
    pub series: Vec<String>,
}

impl Post {
    /// A freshly created record: all fields empty, rating unknown.
    pub fn stub(md5: &str, pixel_hash: &str) -> Self {
        Self {
            md5: md5.to_string(),
            pixel_hash: pixel_hash.to_string(),
            rating: "?".to_string(),
            source: String::new(),
            general: Vec::new(),
            character: Vec::new(),
            artist: Vec::new(),
            series: Vec::new(),
        }
    }

    /// True when the post has never been classified.
    pub fn is_stub(&self) -> bool {
        self.rating == "?"
            && self.general.is_empty()
            && self.character.is_empty()
            && self.artist.is_empty()
            && self.series.is_empty()
    }
}

fn join_set(tags: &[String]) -> String {
    let mut sorted: Vec<&str> = tags.iter().map(|s| s.as_str()).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(",")
}

fn split_set(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

/// Create the posts table and pixel-hash index if absent. Safe to run from
/// every connection, including two racing on first-time creation.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS posts (
            md5 TEXT PRIMARY KEY,
            pixel_hash TEXT,
            rating TEXT,
            source TEXT,
            general TEXT,
            character TEXT,
            artist TEXT,
            series TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_posts_pixel_hash ON posts(pixel_hash);",
    )?;
    Ok(())
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    let general: String = row.get(4)?;
    let character: String = row.get(5)?;
    let artist: String = row.get(6)?;
    let series: String = row.get(7)?;
    Ok(Post {
        md5: row.get(0)?,
        pixel_hash: row.get(1)?,
        rating: row.get(2)?,
        source: row.get(3)?,
        general: split_set(&general),
        character: split_set(&character),
        artist: split_set(&artist),
        series: split_set(&series),
    })
}

const POST_COLUMNS: &str = "md5, pixel_hash, rating, source, general, character, artist, series";

pub fn get_post_by_md5(conn: &Connection, md5: &str) -> Result<Option<Post>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM posts WHERE md5 = ?1", POST_COLUMNS),
            params![md5],
            row_to_post,
        )
        .optional()?;
    Ok(result)
}

pub fn get_post_by_pixel_hash(conn: &Connection, pixel_hash: &str) -> Result<Option<Post>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM posts WHERE pixel_hash = ?1", POST_COLUMNS),
            params![pixel_hash],
            row_to_post,
        )
        .optional()?;
    Ok(result)
}

/// Insert an empty record so later runs short-circuit without recomputation.
/// Returns the stored stub.
pub fn insert_stub_post(conn: &Connection, md5: &str, pixel_hash: &str) -> Result<Post> {
    conn.execute(
        "INSERT OR IGNORE INTO posts (md5, pixel_hash, rating, source, general, character, artist, series)
         VALUES (?1, ?2, '?', '', '', '', '', '')",
        params![md5, pixel_hash],
    )?;
    Ok(Post::stub(md5, pixel_hash))
}

/// Backfill a pixel hash onto an existing record.
pub fn set_pixel_hash(conn: &Connection, md5: &str, pixel_hash: &str) -> Result<()> {
    conn.execute(
        "UPDATE posts SET pixel_hash = ?2 WHERE md5 = ?1",
        params![md5, pixel_hash],
    )?;
    Ok(())
}

/// Write a post, skipping the write when the stored field tuple already
/// matches. Keeps the store idempotent under repeated runs. Returns true when
/// a write happened.
pub fn upsert_post(conn: &Connection, post: &Post) -> Result<bool> {
    let new_tuple = (
        post.rating.clone(),
        post.source.clone(),
        join_set(&post.general),
        join_set(&post.character),
        join_set(&post.artist),
        join_set(&post.series),
    );

    let existing: Option<(String, String, String, String, String, String)> = conn
        .query_row(
            "SELECT rating, source, general, character, artist, series FROM posts WHERE md5 = ?1",
            params![post.md5],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;

    if existing.as_ref() == Some(&new_tuple) {
        return Ok(false);
    }

    conn.execute(
        "INSERT OR REPLACE INTO posts (md5, pixel_hash, rating, source, general, character, artist, series)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            post.md5,
            post.pixel_hash,
            new_tuple.0,
            new_tuple.1,
            new_tuple.2,
            new_tuple.3,
            new_tuple.4,
            new_tuple.5,
        ],
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Cache;

    #[test]
    fn test_stub_roundtrip() {
        let cache = Cache::open_in_memory().unwrap();
        let stub = cache.insert_stub("a".repeat(32).as_str(), "b").unwrap();
        assert!(stub.is_stub());

        let loaded = cache.get_by_md5(&"a".repeat(32)).unwrap().unwrap();
        assert_eq!(loaded, stub);
        assert_eq!(loaded.rating, "?");
    }

    #[test]
    fn test_pixel_hash_lookup() {
        let cache = Cache::open_in_memory().unwrap();
        cache.insert_stub("m1", "px1").unwrap();

        let found = cache.get_by_pixel_hash("px1").unwrap().unwrap();
        assert_eq!(found.md5, "m1");
        assert!(cache.get_by_pixel_hash("px2").unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let cache = Cache::open_in_memory().unwrap();
        cache.insert_stub("m1", "px1").unwrap();

        let mut post = Post::stub("m1", "px1");
        post.rating = "s".to_string();
        post.general = vec!["1girl".to_string(), "smile".to_string()];
        post.character = vec!["alice".to_string()];

        // First write: tuple differs from the stub
        assert!(cache.upsert(&post).unwrap());
        // Second write with identical data is a no-op
        assert!(!cache.upsert(&post).unwrap());

        // Stored record matches after reload
        let loaded = cache.get_by_md5("m1").unwrap().unwrap();
        assert_eq!(loaded.rating, "s");
        assert_eq!(loaded.general, vec!["1girl", "smile"]);
    }

    #[test]
    fn test_upsert_order_insensitive() {
        let cache = Cache::open_in_memory().unwrap();
        cache.insert_stub("m1", "px1").unwrap();

        let mut post = Post::stub("m1", "px1");
        post.general = vec!["b".to_string(), "a".to_string()];
        assert!(cache.upsert(&post).unwrap());

        // Same set, different order: stored tuple is identical, no write
        post.general = vec!["a".to_string(), "b".to_string()];
        assert!(!cache.upsert(&post).unwrap());
    }

    #[test]
    fn test_ensure_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
    }

    #[test]
    fn test_set_pixel_hash_backfill() {
        let cache = Cache::open_in_memory().unwrap();
        cache.insert_stub("m1", "").unwrap();
        cache.set_pixel_hash("m1", "px9").unwrap();
        let loaded = cache.get_by_md5("m1").unwrap().unwrap();
        assert_eq!(loaded.pixel_hash, "px9");
    }
}
