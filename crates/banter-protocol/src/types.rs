//! Command types for the control channel.
//!
//! Commands serialize adjacently tagged: the variant name becomes the line
//! token (`command`), the fields become the JSON body (`body`). The codec
//! splits that pair back into `<TOKEN> <json>` when writing a line, so the
//! shapes below are exactly what travels on the wire:
//!
//! ```json
//! { "command": "ENTER", "body": { "username": "alice" } }
//! ```
//!
//! Variants that carry no fields are still struct variants (`Pong {}`) so
//! their body round-trips as `{}` rather than `null`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field enums
// ---------------------------------------------------------------------------

/// Outcome marker carried by every `*_RESP` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Error,
}

/// A yes/no answer to an invite or a file offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Decline,
}

/// Status of a file-transfer response relayed back to the sender.
///
/// Unlike [`Status`] this is three-valued: the receiver may decline without
/// it being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileTransferStatus {
    Ok,
    Decline,
    Error,
}

/// A Rock-Paper-Scissors move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

/// Which end of a file transfer a data-channel connection claims to be.
///
/// Encoded as a single character on the wire (`"s"` / `"r"`) and as a single
/// byte in the data-channel header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferRole {
    #[serde(rename = "s")]
    Sender,
    #[serde(rename = "r")]
    Receiver,
}

impl TransferRole {
    pub fn as_byte(self) -> u8 {
        match self {
            TransferRole::Sender => b's',
            TransferRole::Receiver => b'r',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(TransferRole::Sender),
            b'r' => Some(TransferRole::Receiver),
            _ => None,
        }
    }
}

impl fmt::Display for TransferRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferRole::Sender => write!(f, "sender"),
            TransferRole::Receiver => write!(f, "receiver"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Every command a client may send on the control channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "body", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCommand {
    /// Log in with a username. Must be the first authenticated action.
    Enter { username: String },
    /// Answer to a server `PING`.
    Pong {},
    /// Say something to everyone else.
    Broadcast { message: String },
    /// Ask for the list of logged-in users.
    ListReq {},
    /// Say something to one user.
    PrivateMsgReq { receiver: String, message: String },
    RpsStartReq {
        opponent: String,
    },
    RpsInviteResp {
        decision: Decision,
    },
    RpsMoveReq {
        #[serde(rename = "move")]
        hand: Hand,
    },
    TttStartReq {
        opponent: String,
    },
    TttInviteResp {
        decision: Decision,
    },
    /// Place a mark. Signed on purpose: an out-of-range number is a policy
    /// error (invalid move), not a framing error.
    TttMoveReq {
        row: i32,
        col: i32,
    },
    /// Offer a file to `receiver`. The server trusts the session identity,
    /// not the `sender` field.
    FileTransferReq {
        sender: String,
        receiver: String,
        filename: String,
        checksum: String,
    },
    /// Answer the oldest pending file offer addressed to this session.
    FileTransferResp {
        status: Decision,
    },
    /// Orderly goodbye; the server answers `BYE_RESP` and closes.
    Bye {},
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Every command the server may send on the control channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "body", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerCommand {
    /// Greeting sent immediately after accept.
    Ready { version: u32 },
    EnterResp {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
    },
    /// Keepalive probe; the client must answer `PONG` before the next one.
    Ping {},
    BroadcastResp {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
    },
    /// A broadcast from another user, fanned out.
    Broadcast { username: String, message: String },
    /// Presence: someone logged in.
    Joined { username: String },
    /// Presence: someone left, however their connection ended.
    Left { username: String },
    ListResp {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        clients: Vec<String>,
    },
    PrivateMsgResp {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
    },
    /// A private message delivered to its receiver.
    PrivateMsg { sender: String, message: String },
    /// Ack for a game-start request. On the match-ongoing error the body
    /// names the players of the blocking match.
    RpsStartResp {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player1: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player2: Option<String>,
    },
    RpsInvite {
        sender: String,
    },
    RpsInviteDeclined {},
    /// Both players: the match is on, send a move.
    RpsReady {},
    RpsMoveResp {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
    },
    /// Match over. `winner` is `null` on a tie, so it always serializes.
    RpsResult { winner: Option<String> },
    TttStartResp {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player1: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player2: Option<String>,
    },
    TttInvite {
        sender: String,
    },
    TttInviteDeclined {},
    /// Both players: the board is live, the inviter holds X and moves first.
    TttReady {},
    TttMoveResp {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
    },
    /// The opponent's move, relayed.
    TttMove { row: i32, col: i32 },
    /// Game over. `winner` is `null` on a draw.
    TttResult { winner: Option<String> },
    /// A file offer forwarded to its receiver; `sender` is the session name
    /// the server authenticated, never the client-supplied field.
    FileTransferReq {
        sender: String,
        receiver: String,
        filename: String,
        checksum: String,
    },
    /// The fate of a file offer, relayed back to the sender.
    FileTransferResp {
        status: FileTransferStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
    },
    /// Both ends: connect to the data channel with this id and role.
    FileTransferReady {
        uuid: String,
        #[serde(rename = "type")]
        role: TransferRole,
        checksum: String,
        filename: String,
    },
    ByeResp {},
    /// The server is closing this connection (missed keepalive).
    Hangup {},
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json, to_value};

    // ==== tokens ====

    #[test]
    fn test_client_tokens_are_screaming_snake() {
        let value = to_value(ClientCommand::RpsStartReq {
            opponent: "bob".into(),
        })
        .unwrap();
        assert_eq!(value["command"], "RPS_START_REQ");
        assert_eq!(value["body"], json!({ "opponent": "bob" }));
    }

    #[test]
    fn test_empty_body_variants_serialize_as_empty_object() {
        let value = to_value(ClientCommand::Pong {}).unwrap();
        assert_eq!(value, json!({ "command": "PONG", "body": {} }));
        let value = to_value(ServerCommand::RpsReady {}).unwrap();
        assert_eq!(value, json!({ "command": "RPS_READY", "body": {} }));
    }

    // ==== renamed fields ====

    #[test]
    fn test_move_field_uses_wire_name() {
        let value = to_value(ClientCommand::RpsMoveReq { hand: Hand::Rock }).unwrap();
        assert_eq!(value["body"], json!({ "move": "rock" }));

        let back: ClientCommand =
            from_value(json!({ "command": "RPS_MOVE_REQ", "body": { "move": "scissors" } }))
                .unwrap();
        assert_eq!(
            back,
            ClientCommand::RpsMoveReq {
                hand: Hand::Scissors
            }
        );
    }

    #[test]
    fn test_transfer_ready_role_uses_wire_name() {
        let value = to_value(ServerCommand::FileTransferReady {
            uuid: "ab".repeat(16),
            role: TransferRole::Sender,
            checksum: "00ff".into(),
            filename: "notes.txt".into(),
        })
        .unwrap();
        assert_eq!(value["command"], "FILE_TRANSFER_READY");
        assert_eq!(value["body"]["type"], "s");
        assert_eq!(value["body"]["uuid"], "ab".repeat(16));
    }

    // ==== status / code ====

    #[test]
    fn test_ok_response_omits_code() {
        let value = to_value(ServerCommand::EnterResp {
            status: Status::Ok,
            code: None,
        })
        .unwrap();
        assert_eq!(value["body"], json!({ "status": "OK" }));
    }

    #[test]
    fn test_error_response_carries_code() {
        let value = to_value(ServerCommand::EnterResp {
            status: Status::Error,
            code: Some(5000),
        })
        .unwrap();
        assert_eq!(value["body"], json!({ "status": "ERROR", "code": 5000 }));
    }

    #[test]
    fn test_result_winner_is_null_on_tie() {
        let value = to_value(ServerCommand::RpsResult { winner: None }).unwrap();
        assert_eq!(value["body"], json!({ "winner": null }));
        let value = to_value(ServerCommand::TttResult {
            winner: Some("alice".into()),
        })
        .unwrap();
        assert_eq!(value["body"], json!({ "winner": "alice" }));
    }

    // ==== field enums ====

    #[test]
    fn test_decision_casing() {
        assert_eq!(to_value(Decision::Accept).unwrap(), json!("ACCEPT"));
        assert_eq!(to_value(Decision::Decline).unwrap(), json!("DECLINE"));
    }

    #[test]
    fn test_transfer_role_bytes() {
        assert_eq!(TransferRole::Sender.as_byte(), b's');
        assert_eq!(TransferRole::from_byte(b'r'), Some(TransferRole::Receiver));
        assert_eq!(TransferRole::from_byte(b'x'), None);
    }

    #[test]
    fn test_unknown_token_fails_to_decode() {
        let result: Result<ClientCommand, _> =
            from_value(json!({ "command": "WIBBLE", "body": {} }));
        assert!(result.is_err());
    }
}
