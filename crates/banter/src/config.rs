//! Server configuration.

use std::time::Duration;

/// Runtime knobs for [`ChatServer`](crate::ChatServer).
///
/// `Default` matches the classic deployment: control channel on 1234,
/// data channel on 1235. Tests override the addresses with port 0 to get
/// ephemeral ports.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the control channel (commands and chat).
    pub chat_addr: String,
    /// Bind address for the data channel (file-transfer byte streams).
    pub data_addr: String,
    /// PING cadence. A PING must be answered before the next tick fires,
    /// otherwise the connection is hung up.
    pub keepalive_interval: Duration,
    /// How long a registered transfer may wait for both peers to dial in.
    pub transfer_wait: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            chat_addr: "0.0.0.0:1234".to_string(),
            data_addr: "0.0.0.0:1235".to_string(),
            keepalive_interval: Duration::from_secs(10),
            transfer_wait: Duration::from_secs(30),
        }
    }
}
