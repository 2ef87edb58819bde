//! Pairing data-channel connections and relaying the bytes.
//!
//! The control channel mints an id per accepted transfer; both peers then
//! dial the data port and present `<id><role>`. Whoever arrives first parks.
//! The complementary arrival triggers the relay; the id is single-use and
//! expires if the pair never completes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use banter_protocol::TransferRole;
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::error::TransferError;

/// Length of a transfer id on the wire: 16 random bytes as hex.
pub const TRANSFER_ID_LEN: usize = 32;
/// The data-channel header: the id plus one role byte.
pub const HEADER_LEN: usize = TRANSFER_ID_LEN + 1;

/// Mint a fresh transfer id.
pub fn transfer_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug)]
enum Slot {
    /// Announced on the control channel; nobody has dialed in yet.
    Expected,
    /// One side arrived and is parked waiting for its counterpart.
    Waiting { role: TransferRole, stream: TcpStream },
}

/// The shared pairing table. Cloning hands out another handle to the same
/// table, so the accept loop, the dispatcher, and the sweep tasks all see
/// one set of slots.
#[derive(Debug, Clone)]
pub struct Rendezvous {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    slots: Mutex<HashMap<String, Slot>>,
    wait: Duration,
}

impl Rendezvous {
    /// `wait` bounds the whole pairing: registration to relay, and also the
    /// header read of each arriving connection.
    pub fn new(wait: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                wait,
            }),
        }
    }

    /// Register a transfer and start its expiry clock. Returns the minted
    /// id to hand to both peers.
    pub async fn open(&self) -> String {
        let id = transfer_id();
        self.inner
            .slots
            .lock()
            .await
            .insert(id.clone(), Slot::Expected);
        tracing::debug!(%id, "transfer registered");

        let this = self.clone();
        let expiring = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.wait).await;
            // Dropping a parked slot drops its socket, which is how a
            // half-open pair learns it is over.
            if this.inner.slots.lock().await.remove(&expiring).is_some() {
                tracing::warn!(id = %expiring, "transfer expired before pairing");
            }
        });
        id
    }

    /// Drive one accepted data-channel connection: read the header, then
    /// park, reject, or — on the second arrival — relay sender to receiver
    /// until the sender half-closes.
    pub async fn admit(&self, mut stream: TcpStream) -> Result<(), TransferError> {
        let mut header = [0u8; HEADER_LEN];
        tokio::time::timeout(self.inner.wait, stream.read_exact(&mut header))
            .await
            .map_err(|_| TransferError::HeaderTimeout)??;

        let id = std::str::from_utf8(&header[..TRANSFER_ID_LEN])
            .map_err(|_| TransferError::BadHeader)?
            .to_string();
        let role =
            TransferRole::from_byte(header[TRANSFER_ID_LEN]).ok_or(TransferError::BadHeader)?;

        let (mut sender, mut receiver) = {
            let mut slots = self.inner.slots.lock().await;
            match slots.remove(&id) {
                None => return Err(TransferError::UnknownTransfer(id)),
                Some(Slot::Expected) => {
                    tracing::debug!(%id, %role, "first peer parked");
                    slots.insert(id.clone(), Slot::Waiting { role, stream });
                    return Ok(());
                }
                Some(Slot::Waiting {
                    role: parked_role,
                    stream: parked,
                }) => {
                    if parked_role == role {
                        // Keep the first arrival, refuse the newcomer.
                        slots.insert(
                            id.clone(),
                            Slot::Waiting {
                                role: parked_role,
                                stream: parked,
                            },
                        );
                        return Err(TransferError::DuplicateRole(id, role));
                    }
                    match role {
                        TransferRole::Sender => (stream, parked),
                        TransferRole::Receiver => (parked, stream),
                    }
                }
            }
        };

        tracing::debug!(%id, "peers paired, relaying");
        let copied = tokio::io::copy(&mut sender, &mut receiver).await?;
        receiver.shutdown().await?;
        tracing::info!(%id, bytes = copied, "transfer relayed");
        Ok(())
    }
}
