//! The peer sides of the data channel: upload and download.

use std::path::{Path, PathBuf};

use banter_protocol::TransferRole;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::checksum::file_sha256;
use crate::error::TransferError;
use crate::rendezvous::TRANSFER_ID_LEN;
use crate::storage::unique_destination;

/// Where a download landed and whether it matched the offered checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub actual_checksum: String,
    pub verified: bool,
}

async fn connect_with_header(
    addr: impl ToSocketAddrs,
    id: &str,
    role: TransferRole,
) -> Result<TcpStream, TransferError> {
    // A wrong-length id would silently eat the first payload bytes.
    if id.len() != TRANSFER_ID_LEN {
        return Err(TransferError::BadHeader);
    }
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(id.as_bytes()).await?;
    stream.write_all(&[role.as_byte()]).await?;
    Ok(stream)
}

/// Sender side: stream the file and half-close so the relay sees EOF.
pub async fn upload(
    addr: impl ToSocketAddrs,
    id: &str,
    path: &Path,
) -> Result<u64, TransferError> {
    let mut stream = connect_with_header(addr, id, TransferRole::Sender).await?;
    let mut file = tokio::fs::File::open(path).await?;
    let sent = tokio::io::copy(&mut file, &mut stream).await?;
    stream.shutdown().await?;
    tracing::info!(path = %path.display(), bytes = sent, "upload finished");
    Ok(sent)
}

/// Receiver side: stream to a fresh file under `dir` until EOF, then
/// verify. A checksum mismatch is reported, not fatal — the file is kept.
pub async fn download(
    addr: impl ToSocketAddrs,
    id: &str,
    dir: &Path,
    filename: &str,
    expected_checksum: &str,
) -> Result<Downloaded, TransferError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = unique_destination(dir, filename);

    let mut stream = connect_with_header(addr, id, TransferRole::Receiver).await?;
    let mut file = tokio::fs::File::create(&path).await?;
    let received = tokio::io::copy(&mut stream, &mut file).await?;
    file.flush().await?;
    drop(file);

    let actual_checksum = file_sha256(&path).await?;
    let verified = actual_checksum == expected_checksum;
    if verified {
        tracing::info!(path = %path.display(), bytes = received, "download verified");
    } else {
        tracing::warn!(path = %path.display(), "checksum mismatch, file kept");
    }
    Ok(Downloaded {
        path,
        actual_checksum,
        verified,
    })
}
