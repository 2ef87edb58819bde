//! Invite tracking shared by both games.
//!
//! An invite lives from `*_START_REQ` until the target answers. The board
//! remembers, per game and target, who asked — the answer carries no names,
//! so this is how the server finds the inviter again.

use std::collections::HashMap;
use std::fmt;

/// Which game an invite (or a busy-check) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    Rps,
    TicTacToe,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Rps => write!(f, "rps"),
            GameKind::TicTacToe => write!(f, "ttt"),
        }
    }
}

/// Pending invites, keyed by `(game, target)`.
#[derive(Debug, Default)]
pub struct InviteBoard {
    pending: HashMap<(GameKind, String), String>,
}

impl InviteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an invite. A newer invite for the same game and target
    /// replaces the older one; the replaced inviter is returned so the
    /// caller can log it.
    pub fn offer(&mut self, kind: GameKind, inviter: &str, target: &str) -> Option<String> {
        self.pending
            .insert((kind, target.to_string()), inviter.to_string())
    }

    /// Consume the pending invite for `(kind, target)`, returning the
    /// inviter. An answer with nothing pending returns `None`.
    pub fn take(&mut self, kind: GameKind, target: &str) -> Option<String> {
        self.pending.remove(&(kind, target.to_string()))
    }

    /// Drop every invite sent by or addressed to `player`. Used on
    /// disconnect.
    pub fn clear_player(&mut self, player: &str) {
        self.pending
            .retain(|(_, target), inviter| target != player && inviter != player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_then_take() {
        let mut board = InviteBoard::new();
        board.offer(GameKind::Rps, "alice", "bob");
        assert_eq!(board.take(GameKind::Rps, "bob"), Some("alice".into()));
        assert_eq!(board.take(GameKind::Rps, "bob"), None);
    }

    #[test]
    fn test_games_do_not_share_invites() {
        let mut board = InviteBoard::new();
        board.offer(GameKind::Rps, "alice", "bob");
        assert_eq!(board.take(GameKind::TicTacToe, "bob"), None);
        assert_eq!(board.take(GameKind::Rps, "bob"), Some("alice".into()));
    }

    #[test]
    fn test_newer_invite_replaces_older() {
        let mut board = InviteBoard::new();
        assert_eq!(board.offer(GameKind::TicTacToe, "alice", "carol"), None);
        assert_eq!(
            board.offer(GameKind::TicTacToe, "bob", "carol"),
            Some("alice".into())
        );
        assert_eq!(board.take(GameKind::TicTacToe, "carol"), Some("bob".into()));
    }

    #[test]
    fn test_clear_player_drops_both_directions() {
        let mut board = InviteBoard::new();
        board.offer(GameKind::Rps, "alice", "bob");
        board.offer(GameKind::TicTacToe, "carol", "alice");
        board.offer(GameKind::Rps, "dave", "carol");
        board.clear_player("alice");
        assert_eq!(board.take(GameKind::Rps, "bob"), None);
        assert_eq!(board.take(GameKind::TicTacToe, "alice"), None);
        assert_eq!(board.take(GameKind::Rps, "carol"), Some("dave".into()));
    }
}
