//! Content hashing.
//!
//! A document's identity across runs is the SHA-256 of the raw source
//! bytes, never its path or name. Renaming or moving a file keeps its
//! prior results; editing a single byte makes it a new document.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::core::error::Result;

/// Read block size for streamed hashing
const BLOCK_SIZE: usize = 1024 * 1024;

/// Hash a byte slice into lowercase hex
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a file's contents into lowercase hex
///
/// The file is read in fixed-size blocks so memory stays flat for
/// large audio files.
///
/// # Arguments
///
/// * `path` - File to hash
///
/// # Returns
///
/// The 64-character hex digest or an IO error
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
