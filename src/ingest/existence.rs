// Catalog existence check
//
// Asks the target catalog whether a content hash is already imported. The
// check shells out to the catalog's own CLI; any failure is a tri-state
// `Error`, logged and carried through so one flaky lookup never aborts a
// batch.

use std::path::PathBuf;
use std::process::Command;

use log::warn;

use crate::ingest::Existence;
use crate::tools;

pub trait ExistenceChecker: Sync {
    fn check(&self, md5: &str) -> Existence;
}

/// Queries a Shimmie-style catalog via `php index.php -u <user> search
/// md5:<hash>` run from the catalog root, scanning stdout for the hash.
pub struct CatalogChecker {
    catalog_root: PathBuf,
    db_user: String,
}

impl CatalogChecker {
    pub fn new(catalog_root: PathBuf, db_user: String) -> Self {
        Self {
            catalog_root,
            db_user,
        }
    }
}

impl ExistenceChecker for CatalogChecker {
    fn check(&self, md5: &str) -> Existence {
        let php = tools::php_path();
        let query = format!("md5:{}", md5);
        let output = Command::new(&php)
            .arg("index.php")
            .args(["-u", &self.db_user, "search", &query])
            .current_dir(&self.catalog_root)
            .output();

        match output {
            Ok(out) if out.status.success() => {
                if String::from_utf8_lossy(&out.stdout).contains(md5) {
                    Existence::Present
                } else {
                    Existence::Absent
                }
            }
            Ok(out) => {
                warn!(
                    "Existence check exited with {} ({} index.php -u {} search {} in {})",
                    out.status,
                    php.display(),
                    self.db_user,
                    query,
                    self.catalog_root.display()
                );
                Existence::Error
            }
            Err(e) => {
                warn!(
                    "Existence check failed to launch ({} index.php -u {} search {} in {}): {}",
                    php.display(),
                    self.db_user,
                    query,
                    self.catalog_root.display(),
                    e
                );
                Existence::Error
            }
        }
    }
}
