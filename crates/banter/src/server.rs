//! Listener setup and the accept loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;

use banter_games::{InviteBoard, RpsEngine, TttEngine};
use banter_session::Registry;
use banter_transfer::{PendingTransfers, Rendezvous};

use crate::config::ServerConfig;
use crate::error::BanterError;
use crate::handler::handle_connection;

/// Protocol version announced in the READY greeting.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state, one async mutex per structure.
///
/// Lock discipline: never hold two of these at once. Handlers compute
/// under one lock, release it, then talk to the next structure; the rare
/// races that opens up are each resolved explicitly (a failed delivery
/// rolls back the step that preceded it).
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) rps: Mutex<RpsEngine>,
    pub(crate) ttt: Mutex<TttEngine>,
    pub(crate) invites: Mutex<InviteBoard>,
    pub(crate) transfers: Mutex<PendingTransfers>,
    pub(crate) rendezvous: Rendezvous,
    pub(crate) config: ServerConfig,
}

/// The chat server: a control listener for line-framed commands and a
/// data listener for file-transfer byte streams.
pub struct ChatServer {
    chat_listener: TcpListener,
    data_listener: TcpListener,
    state: Arc<ServerState>,
}

impl ChatServer {
    /// Bind both listeners. Fails fast if either address is unusable.
    pub async fn bind(config: ServerConfig) -> Result<Self, BanterError> {
        let chat_listener = TcpListener::bind(&config.chat_addr).await?;
        let data_listener = TcpListener::bind(&config.data_addr).await?;
        let state = Arc::new(ServerState {
            registry: Mutex::new(Registry::new()),
            rps: Mutex::new(RpsEngine::new()),
            ttt: Mutex::new(TttEngine::new()),
            invites: Mutex::new(InviteBoard::new()),
            transfers: Mutex::new(PendingTransfers::new()),
            rendezvous: Rendezvous::new(config.transfer_wait),
            config,
        });
        Ok(Self { chat_listener, data_listener, state })
    }

    /// Control-channel address actually bound.
    pub fn chat_addr(&self) -> io::Result<SocketAddr> {
        self.chat_listener.local_addr()
    }

    /// Data-channel address actually bound.
    pub fn data_addr(&self) -> io::Result<SocketAddr> {
        self.data_listener.local_addr()
    }

    /// Accept forever on both listeners, one task per connection.
    pub async fn run(self) -> Result<(), BanterError> {
        tracing::info!(
            chat = %self.chat_addr()?,
            data = %self.data_addr()?,
            "server listening"
        );
        loop {
            tokio::select! {
                accepted = self.chat_listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "control connection accepted");
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(error) = handle_connection(stream, state).await {
                                tracing::debug!(%peer, %error, "connection ended with error");
                            }
                        });
                    }
                    Err(error) => tracing::error!(%error, "control accept failed"),
                },
                accepted = self.data_listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "data connection accepted");
                        let rendezvous = self.state.rendezvous.clone();
                        tokio::spawn(async move {
                            if let Err(error) = rendezvous.admit(stream).await {
                                tracing::warn!(%peer, %error, "data connection rejected");
                            }
                        });
                    }
                    Err(error) => tracing::error!(%error, "data accept failed"),
                },
            }
        }
    }
}
