//! Game engines for banter.
//!
//! Two turn-based games run over the same chat connections:
//!
//! - **Rock-Paper-Scissors** ([`RpsEngine`]) — simultaneous moves, the match
//!   resolves and disappears the instant the second hand lands.
//! - **Tic-Tac-Toe** ([`TttEngine`]) — alternating moves on a keyed board;
//!   finished games stay until explicitly removed so the caller can still
//!   resolve the opponent for the result fan-out.
//!
//! Both start from the same invite handshake, tracked by [`InviteBoard`].
//!
//! The engines are plain state machines: no locks, no IO. The server holds
//! each behind its own async mutex and fans out notifications itself.

mod error;
mod invites;
mod rps;
mod tictactoe;

pub use error::GameError;
pub use invites::{GameKind, InviteBoard};
pub use rps::{RpsEngine, RpsOutcome};
pub use tictactoe::{Mark, TttEngine, TttOutcome};
