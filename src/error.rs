// Error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BooruError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Decode error for {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("FFprobe error: {0}")]
    FFprobe(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl From<image::ImageError> for BooruError {
    fn from(err: image::ImageError) -> Self {
        BooruError::Decode {
            path: String::new(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BooruError>;
