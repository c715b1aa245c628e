// src/hash.rs

//! SHA-256 digests for published artifacts
//!
//! Every `sha256` field in an index is produced here from the exact bytes
//! on disk at build time. Files are streamed, never read whole, so large
//! firmware images and pack archives hash in constant memory.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer for streaming file hashes (64 KB)
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 of a byte slice
pub fn sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 of everything a reader yields
pub fn sha256_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute the SHA-256 of a file's full content
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    sha256_reader(&mut file)
}
