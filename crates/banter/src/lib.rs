//! banter — a multi-user chat server over plain TCP.
//!
//! One process, two listeners:
//!
//! - the **control channel** speaks newline-framed `<COMMAND> <json>` lines:
//!   login, broadcast and private chat, presence, keepalive, and the
//!   negotiation for games and file transfers
//! - the **data channel** carries file-transfer bytes between two clients,
//!   paired by a one-time id handed out on the control channel
//!
//! ```no_run
//! use banter::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), banter::BanterError> {
//!     let server = ChatServer::bind(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::BanterError;
pub use server::{ChatServer, PROTOCOL_VERSION};
