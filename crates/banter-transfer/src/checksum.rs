//! SHA-256 checksums for transferred files.
//!
//! The sender computes the digest before offering, the receiver recomputes
//! it after landing the bytes; equal hex strings mean the relay was clean.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::TransferError;

/// Digest a whole file, chunked so large files never sit in memory.
pub async fn file_sha256(path: &Path) -> Result<String, TransferError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Digest a byte slice; the in-memory twin of [`file_sha256`].
pub fn bytes_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
