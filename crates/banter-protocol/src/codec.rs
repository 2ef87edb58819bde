//! The line codec: `<TOKEN> <json-body>\n`.
//!
//! Commands serialize through serde as `{ "command": ..., "body": ... }`;
//! [`encode_line`] and [`decode_line`] rearrange that pair into the wire
//! line and back. [`CommandCodec`] wraps them as a tokio-util
//! [`Decoder`]/[`Encoder`] so a connection can be driven through `Framed`.

use std::marker::PhantomData;

use bytes::BytesMut;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::types::{ClientCommand, ServerCommand};

/// Upper bound on a single wire line, command token included.
///
/// Chat messages and file offers fit comfortably; anything bigger is a
/// misbehaving peer and ends the connection.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Render one command as a wire line (no trailing newline).
pub fn encode_line<T: Serialize>(command: &T) -> Result<String, ProtocolError> {
    let value = serde_json::to_value(command).map_err(ProtocolError::Encode)?;
    let serde_json::Value::Object(mut parts) = value else {
        return Err(ProtocolError::InvalidLine(
            "command did not serialize to an object".into(),
        ));
    };
    let Some(serde_json::Value::String(token)) = parts.remove("command") else {
        return Err(ProtocolError::InvalidLine(
            "command token missing from serialized form".into(),
        ));
    };
    let body = parts
        .remove("body")
        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
    Ok(format!("{token} {body}"))
}

/// Parse one wire line. A token with no body is read as `TOKEN {}`.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (token, rest) = match line.split_once(' ') {
        Some((token, rest)) => (token, rest.trim()),
        None => (line.trim(), ""),
    };
    if token.is_empty() {
        return Err(ProtocolError::InvalidLine("empty command token".into()));
    }
    let body: serde_json::Value = if rest.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(rest).map_err(ProtocolError::Decode)?
    };
    let tagged = serde_json::json!({ "command": token, "body": body });
    serde_json::from_value(tagged).map_err(ProtocolError::Decode)
}

/// Newline-delimited codec over the command enums.
///
/// Generic over direction: the server decodes [`ClientCommand`] and encodes
/// [`ServerCommand`], a client the reverse. Use the [`ServerCodec`] /
/// [`ClientCodec`] aliases.
#[derive(Debug)]
pub struct CommandCodec<In, Out> {
    max_line_len: usize,
    _direction: PhantomData<fn(Out) -> In>,
}

/// Codec for the server end of a connection.
pub type ServerCodec = CommandCodec<ClientCommand, ServerCommand>;
/// Codec for the client end of a connection.
pub type ClientCodec = CommandCodec<ServerCommand, ClientCommand>;

impl<In, Out> CommandCodec<In, Out> {
    pub fn new() -> Self {
        Self {
            max_line_len: MAX_LINE_LEN,
            _direction: PhantomData,
        }
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            max_line_len,
            _direction: PhantomData,
        }
    }
}

impl<In, Out> Default for CommandCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: DeserializeOwned, Out> Decoder for CommandCodec<In, Out> {
    type Item = In;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<In>, ProtocolError> {
        let Some(newline) = src.iter().position(|&b| b == b'\n') else {
            if src.len() > self.max_line_len {
                return Err(ProtocolError::LineTooLong(self.max_line_len));
            }
            return Ok(None);
        };
        if newline > self.max_line_len {
            return Err(ProtocolError::LineTooLong(self.max_line_len));
        }
        // Consume the line before parsing so a decode failure never leaves
        // the buffer desynchronized.
        let raw = src.split_to(newline + 1);
        let line = std::str::from_utf8(&raw[..newline])
            .map_err(|_| ProtocolError::InvalidLine("line is not valid utf-8".into()))?;
        decode_line(line).map(Some)
    }
}

impl<In, Out: Serialize> Encoder<Out> for CommandCodec<In, Out> {
    type Error = ProtocolError;

    fn encode(&mut self, command: Out, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let line = encode_line(&command)?;
        dst.reserve(line.len() + 1);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hand, Status, TransferRole};

    // ==== encode_line ====

    #[test]
    fn test_encode_line_token_then_body() {
        let line = encode_line(&ClientCommand::Enter {
            username: "alice".into(),
        })
        .unwrap();
        assert_eq!(line, r#"ENTER {"username":"alice"}"#);
    }

    #[test]
    fn test_encode_line_empty_body() {
        let line = encode_line(&ClientCommand::Bye {}).unwrap();
        assert_eq!(line, "BYE {}");
    }

    #[test]
    fn test_encode_line_ready_carries_role_char() {
        let line = encode_line(&ServerCommand::FileTransferReady {
            uuid: "0123456789abcdef0123456789abcdef".into(),
            role: TransferRole::Receiver,
            checksum: "aa".into(),
            filename: "a.txt".into(),
        })
        .unwrap();
        assert!(line.starts_with("FILE_TRANSFER_READY {"));
        assert!(line.contains(r#""type":"r""#));
    }

    // ==== decode_line ====

    #[test]
    fn test_decode_line_round_trips() {
        let commands = [
            ClientCommand::Enter {
                username: "bob_77".into(),
            },
            ClientCommand::PrivateMsgReq {
                receiver: "alice".into(),
                message: "hi there".into(),
            },
            ClientCommand::RpsMoveReq { hand: Hand::Paper },
            ClientCommand::TttMoveReq { row: 2, col: 0 },
        ];
        for command in commands {
            let line = encode_line(&command).unwrap();
            let back: ClientCommand = decode_line(&line).unwrap();
            assert_eq!(back, command);
        }
    }

    #[test]
    fn test_decode_line_bare_token_gets_empty_body() {
        let command: ClientCommand = decode_line("PONG").unwrap();
        assert_eq!(command, ClientCommand::Pong {});
        let command: ClientCommand = decode_line("LIST_REQ ").unwrap();
        assert_eq!(command, ClientCommand::ListReq {});
    }

    #[test]
    fn test_decode_line_tolerates_crlf() {
        let command: ServerCommand = decode_line("PING {}\r\n").unwrap();
        assert_eq!(command, ServerCommand::Ping {});
    }

    #[test]
    fn test_decode_line_unknown_token_is_recoverable() {
        let err = decode_line::<ClientCommand>("TELEPORT {}").unwrap_err();
        assert!(err.is_recoverable(), "unknown token must not be fatal");
    }

    #[test]
    fn test_decode_line_malformed_body_is_recoverable() {
        let err = decode_line::<ClientCommand>("ENTER {not json").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_decode_line_empty_is_error() {
        assert!(decode_line::<ClientCommand>("").is_err());
        assert!(decode_line::<ClientCommand>("   ").is_err());
    }

    // ==== Decoder / Encoder ====

    fn decode_all(codec: &mut ServerCodec, buf: &mut BytesMut) -> Vec<ClientCommand> {
        let mut out = Vec::new();
        while let Ok(Some(command)) = codec.decode(buf) {
            out.push(command);
        }
        out
    }

    #[test]
    fn test_decoder_splits_frames_and_keeps_partial() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::from(
            &br#"ENTER {"username":"alice"}
PONG {}
BROADCAST {"mess"#[..],
        );
        let commands = decode_all(&mut codec, &mut buf);
        assert_eq!(
            commands,
            vec![
                ClientCommand::Enter {
                    username: "alice".into()
                },
                ClientCommand::Pong {},
            ]
        );
        // The partial third line stays buffered.
        assert_eq!(&buf[..], br#"BROADCAST {"mess"#);
    }

    #[test]
    fn test_decoder_consumes_bad_line_and_continues() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::from(&b"ENTER garbage\nPONG {}\n"[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(err.is_recoverable());
        // The stream is still usable after the bad line.
        let next = codec.decode(&mut buf).unwrap();
        assert_eq!(next, Some(ClientCommand::Pong {}));
    }

    #[test]
    fn test_decoder_rejects_oversized_line() {
        let mut codec: ServerCodec = CommandCodec::with_max_line_len(32);
        let mut buf = BytesMut::from(vec![b'a'; 64].as_slice());
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::LineTooLong(32)));
    }

    #[test]
    fn test_encoder_appends_newline() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(
                ClientCommand::Broadcast {
                    message: "hello".into(),
                },
                &mut buf,
            )
            .unwrap();
        assert_eq!(&buf[..], b"BROADCAST {\"message\":\"hello\"}\n");
    }

    #[test]
    fn test_encoder_decoder_pair_across_directions() {
        let mut server = ServerCodec::new();
        let mut client = ClientCodec::new();
        let mut wire = BytesMut::new();

        client
            .encode(ClientCommand::ListReq {}, &mut wire)
            .unwrap();
        assert_eq!(
            server.decode(&mut wire).unwrap(),
            Some(ClientCommand::ListReq {})
        );

        server
            .encode(
                ServerCommand::ListResp {
                    status: Status::Ok,
                    code: None,
                    clients: vec!["alice".into(), "bob".into()],
                },
                &mut wire,
            )
            .unwrap();
        assert_eq!(
            client.decode(&mut wire).unwrap(),
            Some(ServerCommand::ListResp {
                status: Status::Ok,
                code: None,
                clients: vec!["alice".into(), "bob".into()],
            })
        );
    }
}
