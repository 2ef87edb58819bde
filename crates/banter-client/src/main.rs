//! Interactive console client for banter.
//!
//! Plain lines are broadcast to everyone in the room; `/help` lists the
//! slash commands for private messages, games, and file transfers. File
//! bytes move over the separate data channel in background tasks, so chat
//! stays responsive while a transfer runs.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing_subscriber::EnvFilter;

use banter_protocol::{
    ClientCodec, ClientCommand, Decision, FileTransferStatus, Hand, ServerCommand, Status,
    TransferRole, codes,
};
use banter_transfer::{download, file_sha256, upload};

type Chat = Framed<TcpStream, ClientCodec>;
type Input = Lines<BufReader<Stdin>>;

const HELP: &str = "\
commands:
  /all                 list who is online
  /dm USER MESSAGE     private message
  /rps USER            challenge USER to rock-paper-scissors
  /ttt USER            challenge USER to tic-tac-toe
  /y | /n              accept or decline a game invite
  /r | /p | /s         play rock, paper, or scissors
  /move ROW COL        place your tic-tac-toe mark (0-2)
  /send USER PATH      offer USER the file at PATH
  /files               list incoming file offers
  /a | /d              accept or decline the oldest file offer
  /exit                leave
anything else is broadcast to everyone";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Game {
    Rps,
    Ttt,
}

struct PendingFile {
    sender: String,
    filename: String,
}

struct ClientArgs {
    server: String,
    data: String,
    downloads: PathBuf,
}

/// Everything the input and server handlers share.
struct ClientState {
    username: String,
    /// Files registered by `/send`, keyed by wire filename.
    outgoing: HashMap<String, PathBuf>,
    /// Incoming offers, oldest first — the order the server settles them in.
    offers: VecDeque<PendingFile>,
    /// The game invite a `/y` or `/n` would answer.
    invite: Option<Game>,
}

fn parse_args() -> ClientArgs {
    let mut args = ClientArgs {
        server: "127.0.0.1:1234".to_string(),
        data: "127.0.0.1:1235".to_string(),
        downloads: PathBuf::from("downloads"),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--server" => {
                if let Some(value) = it.next() {
                    args.server = value;
                }
            }
            "--data" => {
                if let Some(value) = it.next() {
                    args.data = value;
                }
            }
            "--downloads" => {
                if let Some(value) = it.next() {
                    args.downloads = PathBuf::from(value);
                }
            }
            "--help" | "-h" => {
                println!(
                    "usage: banter-client [--server HOST:PORT] [--data HOST:PORT] [--downloads DIR]"
                );
                std::process::exit(0);
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }
    args
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args();
    let stream = TcpStream::connect(&args.server).await?;
    let mut chat = Framed::new(stream, ClientCodec::new());

    match chat.next().await {
        Some(Ok(ServerCommand::Ready { version })) => {
            println!("connected to {} (protocol v{version})", args.server);
        }
        other => return Err(format!("unexpected greeting: {other:?}").into()),
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let Some(username) = log_in(&mut chat, &mut input).await? else {
        return Ok(());
    };
    println!("logged in as {username} — /help for commands");

    let mut state = ClientState {
        username,
        outgoing: HashMap::new(),
        offers: VecDeque::new(),
        invite: None,
    };

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else { break };
                if handle_input(&mut chat, &mut state, line.trim()).await? {
                    break;
                }
            }
            incoming = chat.next() => match incoming {
                None => {
                    println!("* connection closed by server");
                    break;
                }
                Some(Err(error)) if error.is_recoverable() => {
                    tracing::warn!(%error, "ignoring malformed line from server");
                }
                Some(Err(error)) => return Err(error.into()),
                Some(Ok(command)) => {
                    if handle_server(&mut chat, &mut state, &args, command).await? {
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Prompt until the server accepts a username. `None` means stdin closed.
async fn log_in(
    chat: &mut Chat,
    input: &mut Input,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    loop {
        println!("pick a username (3-14 letters, digits, underscore):");
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        let username = line.trim().to_string();
        if username.is_empty() {
            continue;
        }
        chat.send(ClientCommand::Enter {
            username: username.clone(),
        })
        .await?;
        loop {
            match chat.next().await {
                Some(Ok(ServerCommand::EnterResp {
                    status: Status::Ok, ..
                })) => return Ok(Some(username)),
                Some(Ok(ServerCommand::EnterResp { code, .. })) => {
                    println!("rejected: {}", describe(code));
                    break;
                }
                Some(Ok(ServerCommand::Ping {})) => {
                    chat.send(ClientCommand::Pong {}).await?;
                }
                Some(Ok(other)) => {
                    tracing::debug!(?other, "ignoring while logging in");
                }
                Some(Err(error)) if error.is_recoverable() => {
                    tracing::warn!(%error, "ignoring malformed line from server");
                }
                Some(Err(error)) => return Err(error.into()),
                None => return Err("server closed the connection".into()),
            }
        }
    }
}

/// Handle one line of console input. Returns true to exit.
async fn handle_input(
    chat: &mut Chat,
    state: &mut ClientState,
    line: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    if line.is_empty() {
        return Ok(false);
    }
    if !line.starts_with('/') {
        chat.send(ClientCommand::Broadcast {
            message: line.to_string(),
        })
        .await?;
        return Ok(false);
    }

    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        "/help" => println!("{HELP}"),
        "/exit" => {
            // The main loop keeps running until BYE_RESP comes back.
            chat.send(ClientCommand::Bye {}).await?;
        }
        "/all" => chat.send(ClientCommand::ListReq {}).await?,
        "/dm" => match rest.split_once(' ') {
            Some((receiver, message)) if !message.trim().is_empty() => {
                chat.send(ClientCommand::PrivateMsgReq {
                    receiver: receiver.to_string(),
                    message: message.trim().to_string(),
                })
                .await?;
            }
            _ => println!("usage: /dm USER MESSAGE"),
        },
        "/rps" if !rest.is_empty() => {
            chat.send(ClientCommand::RpsStartReq {
                opponent: rest.to_string(),
            })
            .await?;
        }
        "/ttt" if !rest.is_empty() => {
            chat.send(ClientCommand::TttStartReq {
                opponent: rest.to_string(),
            })
            .await?;
        }
        "/rps" | "/ttt" => println!("usage: {command} USER"),
        "/y" | "/yes" => answer_invite(chat, state, Decision::Accept).await?,
        "/n" | "/no" => answer_invite(chat, state, Decision::Decline).await?,
        "/r" => chat.send(ClientCommand::RpsMoveReq { hand: Hand::Rock }).await?,
        "/p" => chat.send(ClientCommand::RpsMoveReq { hand: Hand::Paper }).await?,
        "/s" => {
            chat.send(ClientCommand::RpsMoveReq {
                hand: Hand::Scissors,
            })
            .await?;
        }
        "/move" => match parse_move(rest) {
            Some((row, col)) => chat.send(ClientCommand::TttMoveReq { row, col }).await?,
            None => println!("usage: /move ROW COL"),
        },
        "/send" => send_file(chat, state, rest).await?,
        "/files" => {
            if state.offers.is_empty() {
                println!("no pending file offers");
            } else {
                for (i, offer) in state.offers.iter().enumerate() {
                    println!("  {i}: '{}' from {}", offer.filename, offer.sender);
                }
                println!("/a accepts the oldest, /d declines it");
            }
        }
        "/a" | "/accept" => answer_file(chat, state, Decision::Accept).await?,
        "/d" | "/decline" => answer_file(chat, state, Decision::Decline).await?,
        other => println!("unknown command {other} — /help lists commands"),
    }
    Ok(false)
}

fn parse_move(rest: &str) -> Option<(i32, i32)> {
    let mut parts = rest.split_whitespace();
    let row = parts.next()?.parse().ok()?;
    let col = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((row, col))
}

async fn answer_invite(
    chat: &mut Chat,
    state: &mut ClientState,
    decision: Decision,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(game) = state.invite.take() else {
        println!("no game invite to answer");
        return Ok(());
    };
    let command = match game {
        Game::Rps => ClientCommand::RpsInviteResp { decision },
        Game::Ttt => ClientCommand::TttInviteResp { decision },
    };
    chat.send(command).await?;
    Ok(())
}

async fn answer_file(
    chat: &mut Chat,
    state: &mut ClientState,
    decision: Decision,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(offer) = state.offers.pop_front() else {
        println!("no file offers to answer");
        return Ok(());
    };
    match decision {
        Decision::Accept => println!("accepting '{}' from {}", offer.filename, offer.sender),
        Decision::Decline => println!("declining '{}' from {}", offer.filename, offer.sender),
    }
    chat.send(ClientCommand::FileTransferResp { status: decision })
        .await?;
    Ok(())
}

async fn send_file(
    chat: &mut Chat,
    state: &mut ClientState,
    rest: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some((receiver, path)) = rest.split_once(' ') else {
        println!("usage: /send USER PATH");
        return Ok(());
    };
    let path = PathBuf::from(path.trim());
    let Some(filename) = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
    else {
        println!("not a sendable path: {}", path.display());
        return Ok(());
    };
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            println!("no such file: {}", path.display());
            return Ok(());
        }
    }
    let checksum = match file_sha256(&path).await {
        Ok(checksum) => checksum,
        Err(error) => {
            println!("cannot read {}: {error}", path.display());
            return Ok(());
        }
    };
    state.outgoing.insert(filename.clone(), path);
    chat.send(ClientCommand::FileTransferReq {
        sender: state.username.clone(),
        receiver: receiver.to_string(),
        filename,
        checksum,
    })
    .await?;
    Ok(())
}

/// Handle one command from the server. Returns true to exit.
async fn handle_server(
    chat: &mut Chat,
    state: &mut ClientState,
    args: &ClientArgs,
    command: ServerCommand,
) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        ServerCommand::Ping {} => chat.send(ClientCommand::Pong {}).await?,
        ServerCommand::Ready { version } => {
            tracing::debug!(version, "duplicate READY ignored");
        }
        ServerCommand::Hangup {} => {
            println!("* the server hung up (keepalive missed)");
            return Ok(true);
        }
        ServerCommand::ByeResp {} => {
            println!("* goodbye");
            return Ok(true);
        }

        ServerCommand::Broadcast { username, message } => println!("{username}: {message}"),
        ServerCommand::PrivateMsg { sender, message } => println!("[dm] {sender}: {message}"),
        ServerCommand::Joined { username } => println!("* {username} joined"),
        ServerCommand::Left { username } => println!("* {username} left"),

        ServerCommand::EnterResp { status, code }
        | ServerCommand::BroadcastResp { status, code }
        | ServerCommand::PrivateMsgResp { status, code } => report(status, code),
        ServerCommand::ListResp {
            status,
            code,
            clients,
        } => {
            if status == Status::Ok {
                println!("online: {}", clients.join(", "));
            } else {
                report(status, code);
            }
        }

        ServerCommand::RpsStartResp {
            status,
            code,
            player1,
            player2,
        } => match status {
            Status::Ok => println!("* challenge sent, waiting for an answer"),
            Status::Error => report_blocked(code, player1, player2),
        },
        ServerCommand::TttStartResp {
            status,
            code,
            player1,
            player2,
        } => match status {
            Status::Ok => println!("* challenge sent, waiting for an answer"),
            Status::Error => report_blocked(code, player1, player2),
        },
        ServerCommand::RpsInvite { sender } => {
            state.invite = Some(Game::Rps);
            println!("* {sender} challenges you to rock-paper-scissors — /y or /n");
        }
        ServerCommand::TttInvite { sender } => {
            state.invite = Some(Game::Ttt);
            println!("* {sender} challenges you to tic-tac-toe — /y or /n");
        }
        ServerCommand::RpsInviteDeclined {} => {
            println!("* rock-paper-scissors challenge declined");
        }
        ServerCommand::TttInviteDeclined {} => println!("* tic-tac-toe challenge declined"),
        ServerCommand::RpsReady {} => println!("* rock-paper-scissors started — /r, /p, or /s"),
        ServerCommand::TttReady {} => {
            println!("* tic-tac-toe started — /move ROW COL; the challenger is X and opens");
        }
        ServerCommand::RpsMoveResp { status, code } => {
            if status == Status::Ok {
                println!("* hand played");
            } else {
                report(status, code);
            }
        }
        ServerCommand::TttMoveResp { status, code } => report(status, code),
        ServerCommand::RpsResult { winner } => match winner {
            Some(winner) if winner == state.username => println!("* you win!"),
            Some(winner) => println!("* {winner} wins"),
            None => println!("* tie — nobody wins"),
        },
        ServerCommand::TttMove { row, col } => println!("* opponent played {row} {col}"),
        ServerCommand::TttResult { winner } => match winner {
            Some(winner) if winner == state.username => println!("* you win!"),
            Some(winner) => println!("* {winner} wins"),
            None => println!("* draw"),
        },

        ServerCommand::FileTransferReq {
            sender, filename, ..
        } => {
            println!("* {sender} offers '{filename}' — /a to accept, /d to decline");
            state.offers.push_back(PendingFile { sender, filename });
        }
        ServerCommand::FileTransferResp { status, code } => match status {
            FileTransferStatus::Ok => println!("* offer delivered, waiting for an answer"),
            FileTransferStatus::Decline => println!("* your file offer was declined"),
            FileTransferStatus::Error => report(Status::Error, code),
        },
        ServerCommand::FileTransferReady {
            uuid,
            role,
            checksum,
            filename,
        } => start_transfer(state, args, uuid, role, checksum, filename),
    }
    Ok(false)
}

/// Kick off the data-channel side of an accepted transfer in the
/// background.
fn start_transfer(
    state: &mut ClientState,
    args: &ClientArgs,
    uuid: String,
    role: TransferRole,
    checksum: String,
    filename: String,
) {
    let data = args.data.clone();
    match role {
        TransferRole::Sender => {
            let Some(path) = state.outgoing.remove(&filename) else {
                println!("! no file registered for '{filename}'");
                return;
            };
            tokio::spawn(async move {
                match upload(data.as_str(), &uuid, &path).await {
                    Ok(sent) => println!("* sent '{filename}' ({sent} bytes)"),
                    Err(error) => println!("! sending '{filename}' failed: {error}"),
                }
            });
        }
        TransferRole::Receiver => {
            let downloads = args.downloads.clone();
            tokio::spawn(async move {
                match download(data.as_str(), &uuid, &downloads, &filename, &checksum).await {
                    Ok(landed) if landed.verified => {
                        println!("* received '{}' ({})", filename, landed.path.display());
                    }
                    Ok(landed) => {
                        println!(
                            "! '{}' landed at {} but the checksum does not match — kept anyway",
                            filename,
                            landed.path.display()
                        );
                    }
                    Err(error) => println!("! receiving '{filename}' failed: {error}"),
                }
            });
        }
    }
}

fn report(status: Status, code: Option<u16>) {
    if status == Status::Error {
        println!("! {}", describe(code));
    }
}

/// Busy responses name the match that is in the way; everything else goes
/// through the code table.
fn report_blocked(code: Option<u16>, player1: Option<String>, player2: Option<String>) {
    if let (Some(player1), Some(player2)) = (player1, player2) {
        println!("! blocked: {player1} and {player2} are already playing");
    } else {
        println!("! {}", describe(code));
    }
}

fn describe(code: Option<u16>) -> String {
    match code {
        None => "request failed".to_string(),
        Some(code) => format!("{} ({code})", describe_code(code)),
    }
}

fn describe_code(code: u16) -> &'static str {
    match code {
        codes::NAME_TAKEN => "that name is taken",
        codes::NAME_INVALID => "usernames are 3-14 letters, digits, or underscores",
        codes::ALREADY_LOGGED_IN => "this connection is already logged in",
        codes::BROADCAST_NOT_LOGGED_IN
        | codes::LIST_NOT_LOGGED_IN
        | codes::PM_NOT_LOGGED_IN
        | codes::GAME_NOT_LOGGED_IN
        | codes::FILE_NOT_LOGGED_IN => "log in first",
        codes::PM_RECEIVER_NOT_FOUND
        | codes::GAME_OPPONENT_NOT_FOUND
        | codes::FILE_RECEIVER_NOT_FOUND => "no such user",
        codes::PM_SELF => "that would be talking to yourself",
        codes::GAME_SELF => "you cannot play against yourself",
        codes::FILE_SELF => "you cannot send a file to yourself",
        codes::RPS_BUSY | codes::TTT_BUSY => "one of you is already in a match",
        codes::RPS_NO_GAME => "no rock-paper-scissors match running",
        codes::TTT_NO_GAME => "no tic-tac-toe match running",
        codes::TTT_INVALID_MOVE => "that cell is taken or out of range",
        codes::TTT_NOT_YOUR_TURN => "not your turn",
        _ => "request failed",
    }
}
