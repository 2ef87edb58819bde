//! File transfer for banter.
//!
//! A transfer is negotiated on the control channel but the bytes never touch
//! it. Instead the server runs a second listener — the data channel — where
//! both peers dial in with a one-line header and get spliced together:
//!
//! ```text
//! sender ──┐                       ┌── receiver
//!          ├──> data channel relay ┤
//!  "id"+s ─┘    (single use id)    └─ "id"+r
//! ```
//!
//! This crate owns everything below the negotiation:
//!
//! - [`Rendezvous`] — the pairing table and relay on the server side
//! - [`PendingTransfers`] — offers awaiting an answer, FIFO per receiver
//! - [`upload`] / [`download`] — the peer sides of the data channel
//! - [`file_sha256`] — the checksum both ends compare
//! - [`unique_destination`] — collision-free landing paths for downloads

mod checksum;
mod error;
mod peer;
mod pending;
mod rendezvous;
mod storage;

pub use checksum::{bytes_sha256, file_sha256};
pub use error::TransferError;
pub use peer::{Downloaded, download, upload};
pub use pending::{PendingTransfers, TransferOffer};
pub use rendezvous::{HEADER_LEN, Rendezvous, TRANSFER_ID_LEN, transfer_id};
pub use storage::unique_destination;
