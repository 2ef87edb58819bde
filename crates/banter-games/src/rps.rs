//! Rock-Paper-Scissors.
//!
//! Moves are simultaneous: each player submits a hand without seeing the
//! other's. The engine holds the first hand until the second arrives, then
//! resolves and destroys the match in the same step, so a finished match can
//! never be observed and both players are immediately free to start another.

use std::collections::HashMap;

use banter_protocol::Hand;

use crate::error::GameError;

/// What a successful move produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpsOutcome {
    /// First hand in; waiting for the opponent.
    Waiting,
    /// Second hand in; the match resolved and is gone.
    Resolved {
        opponent: String,
        /// `None` on a tie.
        winner: Option<String>,
    },
}

/// All active Rock-Paper-Scissors matches.
///
/// `pairings` is symmetric: each player of an active match keys their
/// opponent, so membership and opponent lookup are single probes and a
/// player can be in at most one match.
#[derive(Debug, Default)]
pub struct RpsEngine {
    pairings: HashMap<String, String>,
    moves: HashMap<String, Hand>,
}

impl RpsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pairing both ways. Callers guarantee neither player is in
    /// a match; the invite flow enforces that.
    pub fn start_match(&mut self, a: &str, b: &str) {
        self.pairings.insert(a.to_string(), b.to_string());
        self.pairings.insert(b.to_string(), a.to_string());
        tracing::info!(player1 = %a, player2 = %b, "rps match started");
    }

    pub fn is_playing(&self, player: &str) -> bool {
        self.pairings.contains_key(player)
    }

    pub fn opponent_of(&self, player: &str) -> Option<&str> {
        self.pairings.get(player).map(String::as_str)
    }

    /// Submit a hand. Re-submitting before the opponent has moved simply
    /// overwrites the earlier hand.
    pub fn play(&mut self, player: &str, hand: Hand) -> Result<RpsOutcome, GameError> {
        let Some(opponent) = self.pairings.get(player).cloned() else {
            return Err(GameError::NotInMatch(player.to_string()));
        };
        let Some(theirs) = self.moves.get(&opponent).copied() else {
            self.moves.insert(player.to_string(), hand);
            return Ok(RpsOutcome::Waiting);
        };

        // Both hands are in: resolve and tear down in one step.
        self.pairings.remove(player);
        self.pairings.remove(&opponent);
        self.moves.remove(player);
        self.moves.remove(&opponent);

        let winner = if hand == theirs {
            None
        } else if beats(hand, theirs) {
            Some(player.to_string())
        } else {
            Some(opponent.clone())
        };
        tracing::info!(%player, %opponent, winner = ?winner, "rps match resolved");
        Ok(RpsOutcome::Resolved { opponent, winner })
    }

    /// Tear down the match containing `player`, if any, returning the
    /// abandoned opponent. Used on disconnect.
    pub fn remove_player(&mut self, player: &str) -> Option<String> {
        let opponent = self.pairings.remove(player)?;
        self.pairings.remove(&opponent);
        self.moves.remove(player);
        self.moves.remove(&opponent);
        tracing::debug!(%player, %opponent, "rps match abandoned");
        Some(opponent)
    }
}

fn beats(a: Hand, b: Hand) -> bool {
    matches!(
        (a, b),
        (Hand::Rock, Hand::Scissors) | (Hand::Paper, Hand::Rock) | (Hand::Scissors, Hand::Paper)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_match(a: &str, b: &str) -> RpsEngine {
        let mut engine = RpsEngine::new();
        engine.start_match(a, b);
        engine
    }

    fn resolved(engine: &mut RpsEngine, player: &str, hand: Hand) -> Option<String> {
        match engine.play(player, hand).unwrap() {
            RpsOutcome::Resolved { winner, .. } => winner,
            RpsOutcome::Waiting => panic!("expected the match to resolve"),
        }
    }

    // ==== pairing ====

    #[test]
    fn test_start_match_pairs_both_ways() {
        let engine = engine_with_match("alice", "bob");
        assert_eq!(engine.opponent_of("alice"), Some("bob"));
        assert_eq!(engine.opponent_of("bob"), Some("alice"));
        assert!(!engine.is_playing("carol"));
    }

    // ==== play ====

    #[test]
    fn test_play_without_match_is_rejected() {
        let mut engine = RpsEngine::new();
        assert_eq!(
            engine.play("alice", Hand::Rock),
            Err(GameError::NotInMatch("alice".into()))
        );
    }

    #[test]
    fn test_first_hand_waits() {
        let mut engine = engine_with_match("alice", "bob");
        assert_eq!(engine.play("alice", Hand::Rock), Ok(RpsOutcome::Waiting));
        // Still paired: the match only resolves on the second hand.
        assert!(engine.is_playing("alice"));
    }

    #[test]
    fn test_resubmit_overwrites_own_hand() {
        let mut engine = engine_with_match("alice", "bob");
        assert_eq!(engine.play("alice", Hand::Rock), Ok(RpsOutcome::Waiting));
        assert_eq!(engine.play("alice", Hand::Paper), Ok(RpsOutcome::Waiting));
        // Bob's scissors now beat the *overwritten* paper.
        assert_eq!(resolved(&mut engine, "bob", Hand::Scissors), Some("bob".into()));
    }

    #[test]
    fn test_second_hand_resolves_and_destroys() {
        let mut engine = engine_with_match("alice", "bob");
        engine.play("alice", Hand::Rock).unwrap();
        let outcome = engine.play("bob", Hand::Scissors).unwrap();
        assert_eq!(
            outcome,
            RpsOutcome::Resolved {
                opponent: "alice".into(),
                winner: Some("alice".into()),
            }
        );
        assert!(!engine.is_playing("alice"));
        assert!(!engine.is_playing("bob"));
    }

    #[test]
    fn test_same_hand_is_a_tie() {
        let mut engine = engine_with_match("alice", "bob");
        engine.play("alice", Hand::Paper).unwrap();
        assert_eq!(resolved(&mut engine, "bob", Hand::Paper), None);
    }

    #[test]
    fn test_every_winning_hand() {
        for (winning, losing) in [
            (Hand::Rock, Hand::Scissors),
            (Hand::Paper, Hand::Rock),
            (Hand::Scissors, Hand::Paper),
        ] {
            let mut engine = engine_with_match("alice", "bob");
            engine.play("alice", winning).unwrap();
            assert_eq!(resolved(&mut engine, "bob", losing), Some("alice".into()));
        }
    }

    #[test]
    fn test_players_are_free_after_resolution() {
        let mut engine = engine_with_match("alice", "bob");
        engine.play("alice", Hand::Rock).unwrap();
        engine.play("bob", Hand::Rock).unwrap();
        // No residue: the same pair can start over.
        engine.start_match("alice", "bob");
        assert!(engine.is_playing("alice"));
    }

    // ==== remove_player ====

    #[test]
    fn test_remove_player_frees_the_opponent() {
        let mut engine = engine_with_match("alice", "bob");
        engine.play("bob", Hand::Rock).unwrap();
        assert_eq!(engine.remove_player("alice"), Some("bob".into()));
        assert!(!engine.is_playing("bob"));
        // Bob's stored hand must not leak into his next match.
        engine.start_match("bob", "carol");
        assert_eq!(engine.play("carol", Hand::Scissors), Ok(RpsOutcome::Waiting));
    }

    #[test]
    fn test_remove_player_without_match_is_noop() {
        let mut engine = RpsEngine::new();
        assert_eq!(engine.remove_player("ghost"), None);
    }
}
