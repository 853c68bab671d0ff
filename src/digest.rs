//! BLAKE3 digests of input documents, stamped into generated scripts.

use crate::error::{Error, Result};
use std::path::Path;

const PREFIX: &str = "blake3:";
const SHORT_HEX: usize = 16;

/// Digest of a document on disk. Read failures name the offending path.
pub fn hash_file(path: &Path) -> Result<String> {
    let unreadable = |e: std::io::Error| Error::InvalidInput {
        path: path.to_path_buf(),
        reason: format!("cannot hash: {}", e),
    };
    let mut file = std::fs::File::open(path).map_err(unreadable)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(&mut file).map_err(unreadable)?;
    Ok(format!("{}{}", PREFIX, hasher.finalize().to_hex()))
}

/// Digest of in-memory document bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{}{}", PREFIX, blake3::hash(data).to_hex())
}

/// Abbreviated digest for script headers: prefix plus 16 hex digits.
pub fn short(digest: &str) -> &str {
    let hex_start = digest.strip_prefix(PREFIX).map_or(0, |_| PREFIX.len());
    &digest[..(hex_start + SHORT_HEX).min(digest.len())]
}
