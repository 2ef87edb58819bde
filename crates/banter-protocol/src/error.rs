//! Protocol-level errors.

use thiserror::Error;

/// Everything that can go wrong while reading or writing the wire format.
///
/// Not every variant should kill a connection: a body that fails to parse is
/// the sender's problem and the line has already been consumed, while a
/// too-long line means the framing itself can no longer be trusted.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode command: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode command: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid wire line: {0}")]
    InvalidLine(String),

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// True when the offending input was fully consumed and the stream can
    /// keep being read. Decode failures are recoverable; framing and I/O
    /// failures are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProtocolError::Decode(_) | ProtocolError::InvalidLine(_)
        )
    }
}
