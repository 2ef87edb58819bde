//! Wire protocol for banter.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientCommand`], [`ServerCommand`] and their field enums) —
//!   every command that can travel on the control channel.
//! - **Codec** ([`encode_line`], [`decode_line`], [`CommandCodec`]) — how a
//!   command becomes a `<TOKEN> <json-body>` line and back.
//! - **Codes** ([`codes`]) — the numeric error codes carried by `ERROR`
//!   responses.
//! - **Errors** ([`ProtocolError`]) — what can go wrong on the wire, split
//!   into recoverable (bad line, keep reading) and fatal (framing broken).
//!
//! The protocol layer only knows how to serialize and deserialize commands.
//! Sessions, games, and transfers live above it.

mod codec;
pub mod codes;
mod error;
mod types;

pub use codec::{
    ClientCodec, CommandCodec, MAX_LINE_LEN, ServerCodec, decode_line, encode_line,
};
pub use error::ProtocolError;
pub use types::{
    ClientCommand, Decision, FileTransferStatus, Hand, ServerCommand, Status, TransferRole,
};
