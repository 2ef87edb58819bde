//! Per-connection protocol handling.
//!
//! Each control connection gets one read loop (this module) and one writer
//! task. Replies and fan-out from other connections all funnel through the
//! same outbound queue, so a client observes everything in a single order.
//!
//! Authentication state lives in [`Conn`]; the cleanup that must run when a
//! connection dies — registry removal, LEFT fan-out, abandoning matches and
//! offers — hangs off a guard so it runs exactly once on every exit path.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::codec::Framed;

use banter_games::{GameError, GameKind, RpsOutcome, TttOutcome};
use banter_protocol::{
    ClientCommand, Decision, FileTransferStatus, Hand, ServerCodec, ServerCommand, Status,
    TransferRole, codes,
};
use banter_session::{ClientSender, SessionError};
use banter_transfer::TransferOffer;

use crate::error::BanterError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// Mutable per-connection state.
struct Conn {
    tx: ClientSender,
    user: Option<PresenceGuard>,
    awaiting_pong: bool,
}

impl Conn {
    fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|guard| guard.username.as_str())
    }

    /// Queue a command for this connection's writer task. A closed queue
    /// means the writer is gone and the read loop is about to notice.
    fn send(&self, command: ServerCommand) {
        let _ = self.tx.send(command);
    }
}

/// Runs disconnect cleanup exactly once, no matter which path tears the
/// connection down.
struct PresenceGuard {
    username: String,
    state: Arc<ServerState>,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        let username = std::mem::take(&mut self.username);
        let state = Arc::clone(&self.state);
        // Drop is synchronous; push the actual cleanup onto the runtime.
        tokio::spawn(async move {
            disconnect_cleanup(&state, &username).await;
        });
    }
}

pub(crate) async fn handle_connection(
    stream: TcpStream,
    state: Arc<ServerState>,
) -> Result<(), BanterError> {
    let peer = stream.peer_addr()?;
    let (mut sink, mut lines) = Framed::new(stream, ServerCodec::new()).split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            if sink.send(command).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut conn = Conn {
        tx,
        user: None,
        awaiting_pong: false,
    };
    conn.send(ServerCommand::Ready {
        version: PROTOCOL_VERSION,
    });

    let mut keepalive = tokio::time::interval(state.config.keepalive_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first PING
    // goes out a full interval after the greeting.
    keepalive.tick().await;

    loop {
        tokio::select! {
            _ = keepalive.tick() => {
                if conn.awaiting_pong {
                    tracing::info!(%peer, user = ?conn.username(), "keepalive missed, hanging up");
                    conn.send(ServerCommand::Hangup {});
                    break;
                }
                conn.awaiting_pong = true;
                conn.send(ServerCommand::Ping {});
            }
            incoming = lines.next() => match incoming {
                None => {
                    tracing::debug!(%peer, "connection closed by peer");
                    break;
                }
                Some(Err(error)) if error.is_recoverable() => {
                    // The codec already discarded the offending line.
                    tracing::debug!(%peer, %error, "ignoring malformed line");
                }
                Some(Err(error)) => {
                    tracing::debug!(%peer, %error, "read failed, closing");
                    break;
                }
                Some(Ok(command)) => {
                    if dispatch(&state, &mut conn, command).await {
                        break;
                    }
                }
            }
        }
    }

    // Dropping the queue lets the writer flush queued farewells (BYE_RESP,
    // HANGUP) before the sink closes; dropping the guard runs cleanup.
    drop(conn);
    let _ = writer.await;
    Ok(())
}

/// Handle one decoded command. Returns true when the connection should
/// close.
async fn dispatch(state: &Arc<ServerState>, conn: &mut Conn, command: ClientCommand) -> bool {
    tracing::trace!(?command, user = ?conn.username(), "dispatch");
    match command {
        ClientCommand::Pong {} => {
            conn.awaiting_pong = false;
        }
        ClientCommand::Enter { username } => enter(state, conn, &username).await,
        ClientCommand::Broadcast { message } => broadcast(state, conn, message).await,
        ClientCommand::ListReq {} => list(state, conn).await,
        ClientCommand::PrivateMsgReq { receiver, message } => {
            private_msg(state, conn, &receiver, message).await;
        }
        ClientCommand::RpsStartReq { opponent } => {
            game_start(state, conn, &opponent, GameKind::Rps).await;
        }
        ClientCommand::TttStartReq { opponent } => {
            game_start(state, conn, &opponent, GameKind::TicTacToe).await;
        }
        ClientCommand::RpsInviteResp { decision } => {
            invite_answer(state, conn, decision, GameKind::Rps).await;
        }
        ClientCommand::TttInviteResp { decision } => {
            invite_answer(state, conn, decision, GameKind::TicTacToe).await;
        }
        ClientCommand::RpsMoveReq { hand } => rps_move(state, conn, hand).await,
        ClientCommand::TttMoveReq { row, col } => ttt_move(state, conn, row, col).await,
        ClientCommand::FileTransferReq {
            receiver,
            filename,
            checksum,
            ..
        } => file_offer(state, conn, receiver, filename, checksum).await,
        ClientCommand::FileTransferResp { status } => file_answer(state, conn, status).await,
        ClientCommand::Bye {} => {
            conn.send(ServerCommand::ByeResp {});
            return true;
        }
    }
    false
}

// ==================== login and chat ====================

async fn enter(state: &Arc<ServerState>, conn: &mut Conn, username: &str) {
    if conn.username().is_some() {
        conn.send(ServerCommand::EnterResp {
            status: Status::Error,
            code: Some(codes::ALREADY_LOGGED_IN),
        });
        return;
    }
    let mut registry = state.registry.lock().await;
    match registry.join(username, conn.tx.clone()) {
        Ok(()) => {
            conn.user = Some(PresenceGuard {
                username: username.to_string(),
                state: Arc::clone(state),
            });
            conn.send(ServerCommand::EnterResp {
                status: Status::Ok,
                code: None,
            });
            // Same lock hold as the insert: nobody can route to this name
            // without also having been told it joined.
            registry.broadcast_except(
                username,
                &ServerCommand::Joined {
                    username: username.to_string(),
                },
            );
        }
        Err(SessionError::InvalidUsername(_)) => conn.send(ServerCommand::EnterResp {
            status: Status::Error,
            code: Some(codes::NAME_INVALID),
        }),
        Err(_) => conn.send(ServerCommand::EnterResp {
            status: Status::Error,
            code: Some(codes::NAME_TAKEN),
        }),
    }
}

async fn broadcast(state: &ServerState, conn: &Conn, message: String) {
    let Some(username) = conn.username() else {
        conn.send(ServerCommand::BroadcastResp {
            status: Status::Error,
            code: Some(codes::BROADCAST_NOT_LOGGED_IN),
        });
        return;
    };
    state.registry.lock().await.broadcast_except(
        username,
        &ServerCommand::Broadcast {
            username: username.to_string(),
            message,
        },
    );
    conn.send(ServerCommand::BroadcastResp {
        status: Status::Ok,
        code: None,
    });
}

async fn list(state: &ServerState, conn: &Conn) {
    if conn.username().is_none() {
        conn.send(ServerCommand::ListResp {
            status: Status::Error,
            code: Some(codes::LIST_NOT_LOGGED_IN),
            clients: Vec::new(),
        });
        return;
    }
    let clients = state.registry.lock().await.usernames();
    conn.send(ServerCommand::ListResp {
        status: Status::Ok,
        code: None,
        clients,
    });
}

async fn private_msg(state: &ServerState, conn: &Conn, receiver: &str, message: String) {
    let Some(sender) = conn.username() else {
        conn.send(ServerCommand::PrivateMsgResp {
            status: Status::Error,
            code: Some(codes::PM_NOT_LOGGED_IN),
        });
        return;
    };
    if receiver == sender {
        conn.send(ServerCommand::PrivateMsgResp {
            status: Status::Error,
            code: Some(codes::PM_SELF),
        });
        return;
    }
    let delivered = state.registry.lock().await.send_to(
        receiver,
        ServerCommand::PrivateMsg {
            sender: sender.to_string(),
            message,
        },
    );
    match delivered {
        Ok(()) => conn.send(ServerCommand::PrivateMsgResp {
            status: Status::Ok,
            code: None,
        }),
        Err(_) => conn.send(ServerCommand::PrivateMsgResp {
            status: Status::Error,
            code: Some(codes::PM_RECEIVER_NOT_FOUND),
        }),
    }
}

// ==================== games ====================

fn start_resp(
    kind: GameKind,
    status: Status,
    code: Option<u16>,
    players: Option<(String, String)>,
) -> ServerCommand {
    let (player1, player2) = match players {
        Some((player1, player2)) => (Some(player1), Some(player2)),
        None => (None, None),
    };
    match kind {
        GameKind::Rps => ServerCommand::RpsStartResp {
            status,
            code,
            player1,
            player2,
        },
        GameKind::TicTacToe => ServerCommand::TttStartResp {
            status,
            code,
            player1,
            player2,
        },
    }
}

fn invite_from(kind: GameKind, sender: &str) -> ServerCommand {
    let sender = sender.to_string();
    match kind {
        GameKind::Rps => ServerCommand::RpsInvite { sender },
        GameKind::TicTacToe => ServerCommand::TttInvite { sender },
    }
}

fn invite_declined(kind: GameKind) -> ServerCommand {
    match kind {
        GameKind::Rps => ServerCommand::RpsInviteDeclined {},
        GameKind::TicTacToe => ServerCommand::TttInviteDeclined {},
    }
}

fn game_ready(kind: GameKind) -> ServerCommand {
    match kind {
        GameKind::Rps => ServerCommand::RpsReady {},
        GameKind::TicTacToe => ServerCommand::TttReady {},
    }
}

/// The players of whichever active match blocks `a` or `b` from starting a
/// new one, checking `a` first.
async fn blocking_match(
    state: &ServerState,
    kind: GameKind,
    a: &str,
    b: &str,
) -> Option<(String, String)> {
    match kind {
        GameKind::Rps => {
            let rps = state.rps.lock().await;
            if let Some(opponent) = rps.opponent_of(a) {
                Some((a.to_string(), opponent.to_string()))
            } else {
                rps.opponent_of(b)
                    .map(|opponent| (b.to_string(), opponent.to_string()))
            }
        }
        GameKind::TicTacToe => {
            let ttt = state.ttt.lock().await;
            ttt.players_of(a).or_else(|| ttt.players_of(b))
        }
    }
}

async fn game_start(state: &ServerState, conn: &Conn, opponent: &str, kind: GameKind) {
    let Some(me) = conn.username() else {
        conn.send(start_resp(
            kind,
            Status::Error,
            Some(codes::GAME_NOT_LOGGED_IN),
            None,
        ));
        return;
    };
    if opponent == me {
        conn.send(start_resp(kind, Status::Error, Some(codes::GAME_SELF), None));
        return;
    }
    if !state.registry.lock().await.contains(opponent) {
        conn.send(start_resp(
            kind,
            Status::Error,
            Some(codes::GAME_OPPONENT_NOT_FOUND),
            None,
        ));
        return;
    }
    if let Some(players) = blocking_match(state, kind, me, opponent).await {
        let code = match kind {
            GameKind::Rps => codes::RPS_BUSY,
            GameKind::TicTacToe => codes::TTT_BUSY,
        };
        conn.send(start_resp(kind, Status::Error, Some(code), Some(players)));
        return;
    }

    if let Some(replaced) = state.invites.lock().await.offer(kind, me, opponent) {
        tracing::debug!(game = %kind, %replaced, target = %opponent, "invite replaced");
    }
    if state
        .registry
        .lock()
        .await
        .send_to(opponent, invite_from(kind, me))
        .is_err()
    {
        // The target vanished between the check and the invite.
        state.invites.lock().await.take(kind, opponent);
        conn.send(start_resp(
            kind,
            Status::Error,
            Some(codes::GAME_OPPONENT_NOT_FOUND),
            None,
        ));
        return;
    }
    conn.send(start_resp(kind, Status::Ok, None, None));
}

async fn invite_answer(state: &ServerState, conn: &Conn, decision: Decision, kind: GameKind) {
    let Some(me) = conn.username() else {
        tracing::debug!(game = %kind, "invite answer from unauthenticated connection ignored");
        return;
    };
    let Some(inviter) = state.invites.lock().await.take(kind, me) else {
        tracing::debug!(game = %kind, user = %me, "no pending invite to answer");
        return;
    };

    if decision == Decision::Decline {
        let _ = state
            .registry
            .lock()
            .await
            .send_to(&inviter, invite_declined(kind));
        return;
    }

    // Accept: both sides must still be free, otherwise the acceptance
    // degrades to a decline and the one-match-per-player rule holds.
    if blocking_match(state, kind, &inviter, me).await.is_some() {
        tracing::debug!(game = %kind, %inviter, acceptor = %me, "accept arrived while a match is running");
        let _ = state
            .registry
            .lock()
            .await
            .send_to(&inviter, invite_declined(kind));
        conn.send(invite_declined(kind));
        return;
    }

    match kind {
        GameKind::Rps => state.rps.lock().await.start_match(&inviter, me),
        GameKind::TicTacToe => {
            state.ttt.lock().await.start_match(&inviter, me);
        }
    }

    let registry = state.registry.lock().await;
    if registry.send_to(&inviter, game_ready(kind)).is_ok() {
        conn.send(game_ready(kind));
    } else {
        drop(registry);
        tracing::debug!(game = %kind, %inviter, "inviter left before the match could start");
        match kind {
            GameKind::Rps => {
                let _ = state.rps.lock().await.remove_player(me);
            }
            GameKind::TicTacToe => {
                let _ = state.ttt.lock().await.remove_player(me);
            }
        }
        conn.send(invite_declined(kind));
    }
}

async fn rps_move(state: &ServerState, conn: &Conn, hand: Hand) {
    let Some(me) = conn.username() else {
        conn.send(ServerCommand::RpsMoveResp {
            status: Status::Error,
            code: Some(codes::RPS_NO_GAME),
        });
        return;
    };
    match state.rps.lock().await.play(me, hand) {
        Err(_) => conn.send(ServerCommand::RpsMoveResp {
            status: Status::Error,
            code: Some(codes::RPS_NO_GAME),
        }),
        Ok(RpsOutcome::Waiting) => conn.send(ServerCommand::RpsMoveResp {
            status: Status::Ok,
            code: None,
        }),
        Ok(RpsOutcome::Resolved { opponent, winner }) => {
            conn.send(ServerCommand::RpsMoveResp {
                status: Status::Ok,
                code: None,
            });
            let result = ServerCommand::RpsResult { winner };
            conn.send(result.clone());
            let _ = state.registry.lock().await.send_to(&opponent, result);
        }
    }
}

async fn ttt_move(state: &ServerState, conn: &Conn, row: i32, col: i32) {
    let Some(me) = conn.username() else {
        conn.send(ServerCommand::TttMoveResp {
            status: Status::Error,
            code: Some(codes::TTT_NO_GAME),
        });
        return;
    };

    // One lock hold across move, opponent lookup, and removal keeps the
    // whole step atomic per match.
    let mut ttt = state.ttt.lock().await;
    let outcome = match ttt.play(me, row, col) {
        Ok(outcome) => outcome,
        Err(error) => {
            drop(ttt);
            let code = match error {
                GameError::NotYourTurn(_) => codes::TTT_NOT_YOUR_TURN,
                GameError::InvalidMove { .. } => codes::TTT_INVALID_MOVE,
                GameError::GameNotFound(_) | GameError::NotInMatch(_) => codes::TTT_NO_GAME,
            };
            conn.send(ServerCommand::TttMoveResp {
                status: Status::Error,
                code: Some(code),
            });
            return;
        }
    };
    let opponent = ttt.opponent_of(me);
    let finished = match outcome {
        TttOutcome::Continue => None,
        TttOutcome::Win => Some(Some(me.to_string())),
        TttOutcome::Draw => Some(None),
    };
    if finished.is_some() {
        if let Some(key) = ttt.key_for(me) {
            ttt.remove_match(&key);
        }
    }
    drop(ttt);

    conn.send(ServerCommand::TttMoveResp {
        status: Status::Ok,
        code: None,
    });
    let registry = state.registry.lock().await;
    if let Some(opponent) = opponent.as_deref() {
        let _ = registry.send_to(opponent, ServerCommand::TttMove { row, col });
    }
    if let Some(winner) = finished {
        let result = ServerCommand::TttResult { winner };
        conn.send(result.clone());
        if let Some(opponent) = opponent.as_deref() {
            let _ = registry.send_to(opponent, result);
        }
    }
}

// ==================== file transfer ====================

fn file_resp_err(code: u16) -> ServerCommand {
    ServerCommand::FileTransferResp {
        status: FileTransferStatus::Error,
        code: Some(code),
    }
}

async fn file_offer(
    state: &ServerState,
    conn: &Conn,
    receiver: String,
    filename: String,
    checksum: String,
) {
    let Some(sender) = conn.username() else {
        conn.send(file_resp_err(codes::FILE_NOT_LOGGED_IN));
        return;
    };
    if receiver == sender {
        conn.send(file_resp_err(codes::FILE_SELF));
        return;
    }

    // Queue first, forward second: the receiver may answer the moment the
    // forward lands, and the answer must find the offer already queued.
    state.transfers.lock().await.push(TransferOffer {
        sender: sender.to_string(),
        receiver: receiver.clone(),
        filename: filename.clone(),
        checksum: checksum.clone(),
    });
    // The forwarded sender is the session identity, not whatever the
    // client put in the request.
    let forwarded = state.registry.lock().await.send_to(
        &receiver,
        ServerCommand::FileTransferReq {
            sender: sender.to_string(),
            receiver: receiver.clone(),
            filename: filename.clone(),
            checksum,
        },
    );
    if forwarded.is_err() {
        state
            .transfers
            .lock()
            .await
            .retract(&receiver, sender, &filename);
        conn.send(file_resp_err(codes::FILE_RECEIVER_NOT_FOUND));
        return;
    }
    conn.send(ServerCommand::FileTransferResp {
        status: FileTransferStatus::Ok,
        code: None,
    });
}

async fn file_answer(state: &ServerState, conn: &Conn, decision: Decision) {
    let Some(me) = conn.username() else {
        tracing::debug!("file transfer answer from unauthenticated connection ignored");
        return;
    };
    let Some(offer) = state.transfers.lock().await.pop(me) else {
        tracing::debug!(user = %me, "no pending file offer to answer");
        return;
    };

    if decision == Decision::Decline {
        let _ = state.registry.lock().await.send_to(
            &offer.sender,
            ServerCommand::FileTransferResp {
                status: FileTransferStatus::Decline,
                code: None,
            },
        );
        return;
    }

    let id = state.rendezvous.open().await;
    let to_sender = ServerCommand::FileTransferReady {
        uuid: id.clone(),
        role: TransferRole::Sender,
        checksum: offer.checksum.clone(),
        filename: offer.filename.clone(),
    };
    if state
        .registry
        .lock()
        .await
        .send_to(&offer.sender, to_sender)
        .is_err()
    {
        // Sender already gone; the unused slot expires on its own.
        tracing::debug!(sender = %offer.sender, "file sender left before the transfer could start");
        return;
    }
    conn.send(ServerCommand::FileTransferReady {
        uuid: id,
        role: TransferRole::Receiver,
        checksum: offer.checksum,
        filename: offer.filename,
    });
}

// ==================== teardown ====================

/// Remove every trace of a departed user: session, presence, invites,
/// matches, and file offers.
async fn disconnect_cleanup(state: &ServerState, username: &str) {
    {
        let mut registry = state.registry.lock().await;
        if registry.remove(username).is_none() {
            return;
        }
        registry.broadcast_except(
            username,
            &ServerCommand::Left {
                username: username.to_string(),
            },
        );
    }
    state.invites.lock().await.clear_player(username);
    if let Some(opponent) = state.rps.lock().await.remove_player(username) {
        tracing::debug!(%username, %opponent, "rps match dropped with its player");
    }
    if let Some((_, opponent)) = state.ttt.lock().await.remove_player(username) {
        tracing::debug!(%username, %opponent, "ttt match dropped with its player");
    }
    state.transfers.lock().await.drop_player(username);
    tracing::info!(%username, "disconnect cleanup finished");
}
