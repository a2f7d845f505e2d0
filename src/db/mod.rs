// Metadata cache
//
// The cache is the only durable state: one row per content hash, carrying the
// rating/source/tag sets resolved on a previous run. Every worker opens its
// own connection against the same file; connections are never shared across
// threads.

pub mod mappings;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::{BooruError, Result};

/// A handle to the post cache. Constructed once per worker at spawn time and
/// owned by that worker for the lifetime of the pool.
pub struct Cache {
    conn: Connection,
}

impl Cache {
    /// Open the cache at the given path. The file must already exist; a
    /// missing cache is a startup error, checked before any batch runs.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BooruError::Startup(format!(
                "Post cache not found: {}. The cache is mandatory.",
                path.display()
            )));
        }

        let conn = Connection::open(path)?;

        // WAL keeps concurrent readers cheap while one writer commits
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(30))?;

        schema::ensure_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Open an in-memory cache for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn get_by_md5(&self, md5: &str) -> Result<Option<schema::Post>> {
        schema::get_post_by_md5(&self.conn, md5)
    }

    pub fn get_by_pixel_hash(&self, pixel_hash: &str) -> Result<Option<schema::Post>> {
        schema::get_post_by_pixel_hash(&self.conn, pixel_hash)
    }

    pub fn insert_stub(&self, md5: &str, pixel_hash: &str) -> Result<schema::Post> {
        schema::insert_stub_post(&self.conn, md5, pixel_hash)
    }

    pub fn set_pixel_hash(&self, md5: &str, pixel_hash: &str) -> Result<()> {
        schema::set_pixel_hash(&self.conn, md5, pixel_hash)
    }

    pub fn upsert(&self, post: &schema::Post) -> Result<bool> {
        schema::upsert_post(&self.conn, post)
    }
}

/// Default cache path under the database directory.
pub fn cache_path(db_dir: &Path) -> PathBuf {
    db_dir.join(crate::constants::CACHE_DB_FILENAME)
}
