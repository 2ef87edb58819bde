//! Game errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("{0} has no ongoing match")]
    NotInMatch(String),

    #[error("no game found for {0}")]
    GameNotFound(String),

    #[error("it is not {0}'s turn")]
    NotYourTurn(String),

    #[error("cell ({row}, {col}) cannot be played")]
    InvalidMove { row: i32, col: i32 },
}
