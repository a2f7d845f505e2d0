// Identity resolution: content hash + canonical pixel hash
//
// The content hash is an MD5 of the raw file bytes. Filenames that already
// carry a 32-hex digest are trusted without rehashing. The pixel hash digests
// a canonicalized decode (RGBA, PAM header) so the same image re-encoded into
// a different container still resolves to one cache record.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use md5::{Digest, Md5};
use regex::Regex;

use crate::constants::HASH_CHUNK_SIZE;
use crate::error::{BooruError, Result};

static MD5_RE: OnceLock<Regex> = OnceLock::new();

fn md5_re() -> &'static Regex {
    MD5_RE.get_or_init(|| Regex::new(r"[a-fA-F0-9]{32}").unwrap())
}

/// Extract a 32-hex-digit content hash embedded in a filename stem, if any.
/// The digest is returned lowercased.
pub fn hash_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    md5_re().find(stem).map(|m| m.as_str().to_lowercase())
}

/// Compute the MD5 content hash by streaming the file in fixed chunks.
pub fn compute_md5(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| BooruError::Hash(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| BooruError::Hash(format!("Failed to read {}: {}", path.display(), e)))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Resolve the content hash for a file: filename-embedded digest when
/// present, streaming digest otherwise.
pub fn content_hash(path: &Path) -> Result<String> {
    match hash_from_filename(path) {
        Some(h) => Ok(h),
        None => compute_md5(path),
    }
}

/// Compute the canonical pixel hash of an image.
///
/// The decoded image is forced to RGBA and serialized as a PAM (P7) buffer:
/// ASCII header followed by raw RGBA bytes, the whole buffer MD5-digested.
/// Decode failures are per-file errors, never fatal to a batch.
pub fn compute_pixel_hash(path: &Path) -> Result<String> {
    let img = image::open(path).map_err(|e| BooruError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let rgba = img.to_rgba8();
    Ok(pixel_hash_of_rgba(rgba.width(), rgba.height(), rgba.as_raw()))
}

/// Digest a raw RGBA buffer under the P7 header framing.
pub fn pixel_hash_of_rgba(width: u32, height: u32, raw: &[u8]) -> String {
    let header = format!(
        "P7\nWIDTH {}\nHEIGHT {}\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n",
        width, height
    );

    let mut hasher = Md5::new();
    hasher.update(header.as_bytes());
    hasher.update(raw);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_md5_known_value() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Hello, World!").unwrap();

        let hash = compute_md5(file.path()).unwrap();
        assert_eq!(hash, "65a8e27d8879283831b664bd8b7f0ad4");
    }

    #[test]
    fn test_md5_is_idempotent() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"same bytes every time").unwrap();

        let a = compute_md5(file.path()).unwrap();
        let b = compute_md5(file.path()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_from_filename() {
        let p = Path::new("gelbooru_12345_0a1b2c3d4e5f60718293a4b5c6d7e8f9.jpg");
        assert_eq!(
            hash_from_filename(p).as_deref(),
            Some("0a1b2c3d4e5f60718293a4b5c6d7e8f9")
        );

        // Uppercase digests are normalized
        let p = Path::new("0A1B2C3D4E5F60718293A4B5C6D7E8F9.png");
        assert_eq!(
            hash_from_filename(p).as_deref(),
            Some("0a1b2c3d4e5f60718293a4b5c6d7e8f9")
        );

        assert_eq!(hash_from_filename(Path::new("vacation_photo.jpg")), None);
    }

    #[test]
    fn test_pixel_hash_is_deterministic() {
        let raw = vec![0u8; 2 * 2 * 4];
        let a = pixel_hash_of_rgba(2, 2, &raw);
        let b = pixel_hash_of_rgba(2, 2, &raw);
        assert_eq!(a, b);

        // Same bytes under different dimensions must differ (header is hashed)
        let c = pixel_hash_of_rgba(4, 1, &raw);
        assert_ne!(a, c);
    }

    #[test]
    fn test_pixel_hash_decode_failure_is_typed() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not an image at all").unwrap();

        let err = compute_pixel_hash(file.path()).unwrap_err();
        assert!(matches!(err, BooruError::Decode { .. }));
    }
}
