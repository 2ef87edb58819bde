//! Session tracking for banter.
//!
//! A session is one authenticated control connection: a username plus the
//! queue that reaches its writer task. This crate owns:
//!
//! 1. **Validation** — what counts as a username ([`valid_username`])
//! 2. **The registry** — atomic test-and-insert login, routing, presence
//!    fan-out ([`Registry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← decides who to tell what
//!     ↕
//! Session Layer (this crate)  ← knows who is logged in and how to reach them
//!     ↕
//! Protocol Layer (below)  ← provides the ServerCommand being routed
//! ```

mod error;
mod registry;

pub use error::SessionError;
pub use registry::{
    ClientSender, Registry, Session, USERNAME_MAX_LEN, USERNAME_MIN_LEN, valid_username,
};
