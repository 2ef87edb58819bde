//! Session errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("username {0:?} is already taken")]
    NameTaken(String),

    #[error("username {0:?} is not 3-14 word characters")]
    InvalidUsername(String),

    #[error("no session for {0:?}")]
    NotFound(String),
}
