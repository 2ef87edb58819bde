//! Tic-Tac-Toe.
//!
//! Matches are keyed `"<player1>:<player2>"`. Player 1 is the inviter, holds
//! X, and moves first. The engine deliberately does **not** discard a
//! finished match: the caller still needs it intact to resolve the opponent
//! for the result fan-out, and removes it with [`TttEngine::remove_match`]
//! afterwards.

use std::collections::HashMap;
use std::fmt;

use crate::error::GameError;

/// A player's symbol on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// What a successful move produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TttOutcome {
    Continue,
    /// The mover completed a line. The match is still in the engine.
    Win,
    /// Board full, nobody won. The match is still in the engine.
    Draw,
}

#[derive(Debug)]
struct TttMatch {
    player1: String,
    player2: String,
    board: [[Option<Mark>; 3]; 3],
    turn: Mark,
}

impl TttMatch {
    fn has_player(&self, player: &str) -> bool {
        self.player1 == player || self.player2 == player
    }

    fn mark_of(&self, player: &str) -> Mark {
        if self.player1 == player { Mark::X } else { Mark::O }
    }

    fn is_won_by(&self, mark: Mark) -> bool {
        let b = &self.board;
        let m = Some(mark);
        (0..3).any(|i| (0..3).all(|j| b[i][j] == m))
            || (0..3).any(|j| (0..3).all(|i| b[i][j] == m))
            || (0..3).all(|i| b[i][i] == m)
            || (0..3).all(|i| b[i][2 - i] == m)
    }

    fn is_full(&self) -> bool {
        self.board.iter().flatten().all(Option::is_some)
    }
}

/// All Tic-Tac-Toe matches, keyed by the player pair.
#[derive(Debug, Default)]
pub struct TttEngine {
    games: HashMap<String, TttMatch>,
}

impl TttEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the match. `player1` invited, holds X, and moves first.
    /// Callers guarantee neither player is already in a match.
    pub fn start_match(&mut self, player1: &str, player2: &str) -> String {
        let key = format!("{player1}:{player2}");
        self.games.insert(
            key.clone(),
            TttMatch {
                player1: player1.to_string(),
                player2: player2.to_string(),
                board: [[None; 3]; 3],
                turn: Mark::X,
            },
        );
        tracing::info!(%player1, %player2, "ttt match started");
        key
    }

    pub fn is_playing(&self, player: &str) -> bool {
        self.games.values().any(|game| game.has_player(player))
    }

    pub fn key_for(&self, player: &str) -> Option<String> {
        self.games
            .iter()
            .find(|(_, game)| game.has_player(player))
            .map(|(key, _)| key.clone())
    }

    /// The players of the match containing `player`, in (player1, player2)
    /// order.
    pub fn players_of(&self, player: &str) -> Option<(String, String)> {
        self.games
            .values()
            .find(|game| game.has_player(player))
            .map(|game| (game.player1.clone(), game.player2.clone()))
    }

    pub fn opponent_of(&self, player: &str) -> Option<String> {
        self.games.values().find_map(|game| {
            if game.player1 == player {
                Some(game.player2.clone())
            } else if game.player2 == player {
                Some(game.player1.clone())
            } else {
                None
            }
        })
    }

    /// Place a mark: check membership, turn, and the cell, then place, flip
    /// the turn, and evaluate.
    pub fn play(&mut self, player: &str, row: i32, col: i32) -> Result<TttOutcome, GameError> {
        let Some(game) = self.games.values_mut().find(|game| game.has_player(player)) else {
            return Err(GameError::GameNotFound(player.to_string()));
        };
        let mark = game.mark_of(player);
        if game.turn != mark {
            return Err(GameError::NotYourTurn(player.to_string()));
        }
        if !(0..3).contains(&row) || !(0..3).contains(&col) {
            return Err(GameError::InvalidMove { row, col });
        }
        let (r, c) = (row as usize, col as usize);
        if game.board[r][c].is_some() {
            return Err(GameError::InvalidMove { row, col });
        }

        game.board[r][c] = Some(mark);
        game.turn = mark.other();

        if game.is_won_by(mark) {
            tracing::info!(winner = %player, "ttt match won");
            Ok(TttOutcome::Win)
        } else if game.is_full() {
            tracing::info!(player1 = %game.player1, player2 = %game.player2, "ttt match drawn");
            Ok(TttOutcome::Draw)
        } else {
            Ok(TttOutcome::Continue)
        }
    }

    /// Explicitly discard a match. Returns false if the key was unknown.
    pub fn remove_match(&mut self, key: &str) -> bool {
        let removed = self.games.remove(key).is_some();
        if removed {
            tracing::debug!(%key, "ttt match removed");
        }
        removed
    }

    /// Tear down the match containing `player`, if any, returning its key
    /// and the abandoned opponent. Used on disconnect.
    pub fn remove_player(&mut self, player: &str) -> Option<(String, String)> {
        let key = self.key_for(player)?;
        let game = self.games.remove(&key)?;
        let opponent = if game.player1 == player {
            game.player2
        } else {
            game.player1
        };
        tracing::debug!(%player, %opponent, "ttt match abandoned");
        Some((key, opponent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_match() -> TttEngine {
        let mut engine = TttEngine::new();
        engine.start_match("alice", "bob");
        engine
    }

    /// Play a scripted alternating sequence, asserting every move before the
    /// last one continues the game.
    fn play_script(engine: &mut TttEngine, moves: &[(&str, i32, i32)]) -> TttOutcome {
        let (last, earlier) = moves.split_last().unwrap();
        for (player, row, col) in earlier {
            assert_eq!(engine.play(player, *row, *col), Ok(TttOutcome::Continue));
        }
        engine.play(last.0, last.1, last.2).unwrap()
    }

    // ==== setup ====

    #[test]
    fn test_start_match_keys_by_pair() {
        let engine = engine_with_match();
        assert_eq!(engine.key_for("alice"), Some("alice:bob".into()));
        assert_eq!(engine.key_for("bob"), Some("alice:bob".into()));
        assert_eq!(engine.players_of("bob"), Some(("alice".into(), "bob".into())));
        assert!(!engine.is_playing("carol"));
    }

    // ==== turn order ====

    #[test]
    fn test_inviter_moves_first() {
        let mut engine = engine_with_match();
        assert_eq!(
            engine.play("bob", 0, 0),
            Err(GameError::NotYourTurn("bob".into()))
        );
        assert_eq!(engine.play("alice", 0, 0), Ok(TttOutcome::Continue));
    }

    #[test]
    fn test_no_double_move() {
        let mut engine = engine_with_match();
        engine.play("alice", 0, 0).unwrap();
        assert_eq!(
            engine.play("alice", 1, 1),
            Err(GameError::NotYourTurn("alice".into()))
        );
    }

    #[test]
    fn test_failed_move_does_not_consume_turn() {
        let mut engine = engine_with_match();
        engine.play("alice", 1, 1).unwrap();
        // Bob fumbles twice; it is still his turn afterwards.
        assert!(engine.play("bob", 1, 1).is_err());
        assert!(engine.play("bob", 5, 0).is_err());
        assert_eq!(engine.play("bob", 0, 1), Ok(TttOutcome::Continue));
    }

    // ==== invalid moves ====

    #[test]
    fn test_play_without_game() {
        let mut engine = TttEngine::new();
        assert_eq!(
            engine.play("ghost", 0, 0),
            Err(GameError::GameNotFound("ghost".into()))
        );
    }

    #[test]
    fn test_out_of_bounds_is_invalid_move() {
        let mut engine = engine_with_match();
        assert_eq!(
            engine.play("alice", 3, 0),
            Err(GameError::InvalidMove { row: 3, col: 0 })
        );
        assert_eq!(
            engine.play("alice", 0, -1),
            Err(GameError::InvalidMove { row: 0, col: -1 })
        );
    }

    #[test]
    fn test_occupied_cell_is_invalid_move() {
        let mut engine = engine_with_match();
        engine.play("alice", 0, 0).unwrap();
        assert_eq!(
            engine.play("bob", 0, 0),
            Err(GameError::InvalidMove { row: 0, col: 0 })
        );
    }

    // ==== endings ====

    #[test]
    fn test_row_win_leaves_match_for_caller() {
        let mut engine = engine_with_match();
        let outcome = play_script(
            &mut engine,
            &[
                ("alice", 0, 0),
                ("bob", 1, 0),
                ("alice", 0, 1),
                ("bob", 1, 1),
                ("alice", 0, 2),
            ],
        );
        assert_eq!(outcome, TttOutcome::Win);
        // No self-clean: the caller reads the opponent, then removes.
        assert_eq!(engine.opponent_of("alice"), Some("bob".into()));
        assert!(engine.remove_match("alice:bob"));
        assert!(!engine.is_playing("alice"));
    }

    #[test]
    fn test_column_win() {
        let mut engine = engine_with_match();
        let outcome = play_script(
            &mut engine,
            &[
                ("alice", 0, 2),
                ("bob", 0, 0),
                ("alice", 1, 2),
                ("bob", 1, 0),
                ("alice", 2, 2),
            ],
        );
        assert_eq!(outcome, TttOutcome::Win);
    }

    #[test]
    fn test_diagonal_wins() {
        let mut engine = engine_with_match();
        let outcome = play_script(
            &mut engine,
            &[
                ("alice", 0, 0),
                ("bob", 0, 1),
                ("alice", 1, 1),
                ("bob", 0, 2),
                ("alice", 2, 2),
            ],
        );
        assert_eq!(outcome, TttOutcome::Win);

        let mut engine = engine_with_match();
        let outcome = play_script(
            &mut engine,
            &[
                ("alice", 0, 2),
                ("bob", 0, 0),
                ("alice", 1, 1),
                ("bob", 0, 1),
                ("alice", 2, 0),
            ],
        );
        assert_eq!(outcome, TttOutcome::Win);
    }

    #[test]
    fn test_invitee_can_win() {
        let mut engine = engine_with_match();
        let outcome = play_script(
            &mut engine,
            &[
                ("alice", 0, 0),
                ("bob", 2, 0),
                ("alice", 0, 1),
                ("bob", 2, 1),
                ("alice", 1, 1),
                ("bob", 2, 2),
            ],
        );
        assert_eq!(outcome, TttOutcome::Win);
    }

    #[test]
    fn test_full_board_without_line_is_a_draw() {
        let mut engine = engine_with_match();
        let outcome = play_script(
            &mut engine,
            &[
                ("alice", 0, 0),
                ("bob", 0, 1),
                ("alice", 0, 2),
                ("bob", 1, 1),
                ("alice", 1, 0),
                ("bob", 1, 2),
                ("alice", 2, 1),
                ("bob", 2, 0),
                ("alice", 2, 2),
            ],
        );
        assert_eq!(outcome, TttOutcome::Draw);
        // Same rule as a win: the caller removes the match.
        assert!(engine.is_playing("alice"));
    }

    // ==== teardown ====

    #[test]
    fn test_remove_player_returns_key_and_opponent() {
        let mut engine = engine_with_match();
        assert_eq!(
            engine.remove_player("bob"),
            Some(("alice:bob".into(), "alice".into()))
        );
        assert!(!engine.is_playing("alice"));
        assert_eq!(engine.remove_player("bob"), None);
    }

    #[test]
    fn test_remove_unknown_match_is_noop() {
        let mut engine = engine_with_match();
        assert!(!engine.remove_match("carol:dave"));
        assert!(engine.is_playing("alice"));
    }
}
