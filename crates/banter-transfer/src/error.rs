//! Transfer errors.

use banter_protocol::TransferRole;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed transfer header")]
    BadHeader,

    #[error("timed out waiting for the transfer header")]
    HeaderTimeout,

    #[error("unknown transfer id {0:?}")]
    UnknownTransfer(String),

    #[error("transfer {0:?} already has a parked {1}")]
    DuplicateRole(String, TransferRole),
}
