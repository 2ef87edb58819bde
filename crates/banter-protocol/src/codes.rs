//! Numeric error codes carried by `ERROR` responses.
//!
//! The code space is partitioned per feature so a client can tell at a
//! glance which command family a failure belongs to.

// Login (ENTER)
pub const NAME_TAKEN: u16 = 5000;
pub const NAME_INVALID: u16 = 5001;
pub const ALREADY_LOGGED_IN: u16 = 5002;

// Broadcast
pub const BROADCAST_NOT_LOGGED_IN: u16 = 6000;

// List
pub const LIST_NOT_LOGGED_IN: u16 = 9000;

// Private messages
pub const PM_NOT_LOGGED_IN: u16 = 10001;
pub const PM_RECEIVER_NOT_FOUND: u16 = 10002;
pub const PM_SELF: u16 = 10003;

// Game start (shared by both games) and RPS moves
pub const GAME_NOT_LOGGED_IN: u16 = 11001;
pub const GAME_OPPONENT_NOT_FOUND: u16 = 11002;
pub const GAME_SELF: u16 = 11003;
pub const RPS_BUSY: u16 = 11004;
pub const RPS_NO_GAME: u16 = 11005;

// Tic-Tac-Toe
pub const TTT_NO_GAME: u16 = 12006;
pub const TTT_INVALID_MOVE: u16 = 12007;
pub const TTT_BUSY: u16 = 12008;
pub const TTT_NOT_YOUR_TURN: u16 = 12009;

// File transfer
pub const FILE_NOT_LOGGED_IN: u16 = 13000;
pub const FILE_RECEIVER_NOT_FOUND: u16 = 13001;
pub const FILE_SELF: u16 = 13002;
