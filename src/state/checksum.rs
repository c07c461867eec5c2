//! Content checksums used for drift detection.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Prefix identifying the hash algorithm in stored checksums.
pub const CHECKSUM_PREFIX: &str = "sha256:";

/// Checksum of a byte slice, e.g. `sha256:9f86d0…`.
pub fn content_checksum(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{}{}", CHECKSUM_PREFIX, hex::encode(digest))
}

/// Checksum of a file on disk, or `None` if it does not exist.
pub fn file_checksum(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content_checksum(&content))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
