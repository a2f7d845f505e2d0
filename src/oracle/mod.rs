// Classification oracle interface
//
// The oracle is an external inference service: given a batch of images it
// returns per-image category -> tag -> confidence maps. The core filters each
// category by its threshold and folds the survivors into the post record. The
// model itself lives outside this crate; the subprocess client below feeds
// file paths to a configured command and parses one JSON verdict per image
// from stdout.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use crate::db::schema::Post;
use crate::error::{BooruError, Result};

/// Confidence thresholds applied per category.
#[derive(Debug, Clone, Copy)]
pub struct OracleThresholds {
    pub general: f64,
    pub character: f64,
    pub rating: f64,
}

/// One image's raw confidence maps as returned by the oracle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OracleVerdict {
    #[serde(default)]
    pub general: HashMap<String, f64>,
    #[serde(default)]
    pub character: HashMap<String, f64>,
    #[serde(default)]
    pub artist: HashMap<String, f64>,
    #[serde(default)]
    pub series: HashMap<String, f64>,
    #[serde(default)]
    pub rating: HashMap<String, f64>,
}

/// The classification oracle, batched. One call per batch.
pub trait TagOracle: Sync {
    fn classify(&self, files: &[PathBuf]) -> Result<Vec<OracleVerdict>>;
}

/// Subprocess-backed oracle: invokes the configured command with the batch's
/// file paths appended and expects a JSON array of verdicts on stdout,
/// index-aligned with the input.
pub struct CommandOracle {
    program: String,
    base_args: Vec<String>,
}

impl CommandOracle {
    /// Build from a command string, e.g. `"python tagger.py --quiet"`.
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| BooruError::Oracle("Empty oracle command".to_string()))?;
        Ok(Self {
            program,
            base_args: parts.collect(),
        })
    }
}

impl TagOracle for CommandOracle {
    fn classify(&self, files: &[PathBuf]) -> Result<Vec<OracleVerdict>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(files)
            .output()
            .map_err(|e| BooruError::Oracle(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BooruError::Oracle(format!(
                "Oracle exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let verdicts: Vec<OracleVerdict> = serde_json::from_slice(&output.stdout)
            .map_err(|e| BooruError::Oracle(format!("Failed to parse oracle output: {}", e)))?;

        if verdicts.len() != files.len() {
            return Err(BooruError::Oracle(format!(
                "Oracle returned {} verdicts for {} files",
                verdicts.len(),
                files.len()
            )));
        }

        Ok(verdicts)
    }
}

fn surviving(map: &HashMap<String, f64>, threshold: f64) -> Vec<String> {
    let mut tags: Vec<String> = map
        .iter()
        .filter(|(_, conf)| **conf > threshold)
        .map(|(tag, _)| tag.clone())
        .collect();
    tags.sort_unstable();
    tags
}

/// Fold a threshold-filtered verdict into a post's empty fields. The rating
/// letter comes from the surviving rating categories with priority
/// explicit > questionable/sensitive > general.
pub fn apply_verdict(post: &mut Post, verdict: &OracleVerdict, thresholds: &OracleThresholds) {
    post.general = surviving(&verdict.general, thresholds.general);
    post.character = surviving(&verdict.character, thresholds.character);
    post.artist = surviving(&verdict.artist, thresholds.character);
    post.series = surviving(&verdict.series, thresholds.character);

    let ratings = surviving(&verdict.rating, thresholds.rating);
    post.rating = if ratings.iter().any(|r| r == "explicit") {
        "e".to_string()
    } else if ratings.iter().any(|r| r == "questionable" || r == "sensitive") {
        "q".to_string()
    } else if ratings.iter().any(|r| r == "general") {
        "s".to_string()
    } else {
        "?".to_string()
    };
}
