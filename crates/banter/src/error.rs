//! Top-level server error.

use thiserror::Error;

/// Umbrella over the layer errors so `?` flows cleanly through the
/// server crate.
#[derive(Debug, Error)]
pub enum BanterError {
    #[error(transparent)]
    Protocol(#[from] banter_protocol::ProtocolError),

    #[error(transparent)]
    Session(#[from] banter_session::SessionError),

    #[error(transparent)]
    Game(#[from] banter_games::GameError),

    #[error(transparent)]
    Transfer(#[from] banter_transfer::TransferError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let error: BanterError = io.into();
        assert!(matches!(error, BanterError::Io(_)));
        assert!(error.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_session_error_is_transparent() {
        let inner = banter_session::SessionError::NotFound("ghost".to_string());
        let error: BanterError = inner.clone().into();
        assert_eq!(error.to_string(), inner.to_string());
    }
}
