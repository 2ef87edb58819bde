//! The session registry: who is logged in and how to reach them.

use std::collections::HashMap;

use banter_protocol::ServerCommand;
use tokio::sync::mpsc;

use crate::error::SessionError;

/// Outbound queue handle for one connection. The connection's writer task
/// drains the other end, so everything pushed here reaches that client in
/// FIFO order no matter which task pushed it.
pub type ClientSender = mpsc::UnboundedSender<ServerCommand>;

/// Username length bounds, inclusive.
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 14;

/// 3–14 characters, ASCII alphanumerics and underscore only.
pub fn valid_username(username: &str) -> bool {
    (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username.len())
        && username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// One authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    username: String,
    sender: ClientSender,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Every authenticated session, keyed by username.
///
/// The registry itself is not synchronized; the server holds it behind a
/// single async mutex, so each join / route / broadcast sequence runs under
/// one lock hold and the name check can never race its insert.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<String, Session>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-and-insert login: the username becomes routable iff it was valid
    /// and free.
    pub fn join(&mut self, username: &str, sender: ClientSender) -> Result<(), SessionError> {
        if !valid_username(username) {
            return Err(SessionError::InvalidUsername(username.to_string()));
        }
        if self.sessions.contains_key(username) {
            return Err(SessionError::NameTaken(username.to_string()));
        }
        self.sessions.insert(
            username.to_string(),
            Session {
                username: username.to_string(),
                sender,
            },
        );
        tracing::info!(%username, online = self.sessions.len(), "session registered");
        Ok(())
    }

    /// Drop a session's route. Idempotent, so disconnect paths can all call
    /// it without coordinating.
    pub fn remove(&mut self, username: &str) -> Option<Session> {
        let removed = self.sessions.remove(username);
        if removed.is_some() {
            tracing::info!(%username, online = self.sessions.len(), "session removed");
        }
        removed
    }

    pub fn contains(&self, username: &str) -> bool {
        self.sessions.contains_key(username)
    }

    /// Route one command to one user. A session whose queue has closed is
    /// mid-teardown and counts as gone.
    pub fn send_to(&self, username: &str, command: ServerCommand) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(username)
            .ok_or_else(|| SessionError::NotFound(username.to_string()))?;
        session
            .sender
            .send(command)
            .map_err(|_| SessionError::NotFound(username.to_string()))
    }

    /// Deliver to every session except the named one. Dead queues are
    /// skipped; those connections are already on their way out.
    pub fn broadcast_except(&self, except: &str, command: &ServerCommand) {
        for session in self.sessions.values() {
            if session.username != except {
                let _ = session.sender.send(command.clone());
            }
        }
    }

    /// Sorted usernames of everyone logged in.
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn registry_with(names: &[&str]) -> (Registry, Vec<UnboundedReceiver<ServerCommand>>) {
        let mut registry = Registry::new();
        let mut receivers = Vec::new();
        for name in names {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.join(name, tx).unwrap();
            receivers.push(rx);
        }
        (registry, receivers)
    }

    fn joined(username: &str) -> ServerCommand {
        ServerCommand::Joined {
            username: username.to_string(),
        }
    }

    // ==== valid_username ====

    #[test]
    fn test_valid_username_accepts_word_characters() {
        assert!(valid_username("bob"));
        assert!(valid_username("alice_99"));
        assert!(valid_username("abcdefghijklmn")); // 14 chars
    }

    #[test]
    fn test_valid_username_rejects_bad_lengths() {
        assert!(!valid_username(""));
        assert!(!valid_username("ab"));
        assert!(!valid_username("abcdefghijklmno")); // 15 chars
    }

    #[test]
    fn test_valid_username_rejects_symbols_and_spaces() {
        assert!(!valid_username("bad name"));
        assert!(!valid_username("p@trick"));
        assert!(!valid_username("dash-ed"));
    }

    // ==== join ====

    #[test]
    fn test_join_duplicate_name_fails() {
        let (mut registry, _rx) = registry_with(&["alice"]);
        let (tx, _rx2) = mpsc::unbounded_channel();
        assert_eq!(
            registry.join("alice", tx),
            Err(SessionError::NameTaken("alice".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_join_invalid_name_fails() {
        let mut registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(
            registry.join("ab", tx),
            Err(SessionError::InvalidUsername("ab".into()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_join_names_are_case_sensitive() {
        let (mut registry, _rx) = registry_with(&["Bob"]);
        let (tx, _rx2) = mpsc::unbounded_channel();
        assert!(registry.join("bob", tx).is_ok());
        assert_eq!(registry.len(), 2);
    }

    // ==== routing ====

    #[test]
    fn test_send_to_delivers() {
        let (registry, mut receivers) = registry_with(&["alice"]);
        registry.send_to("alice", joined("bob")).unwrap();
        assert_eq!(receivers[0].try_recv().unwrap(), joined("bob"));
    }

    #[test]
    fn test_send_to_unknown_user_errors() {
        let (registry, _rx) = registry_with(&["alice"]);
        assert_eq!(
            registry.send_to("ghost", joined("x")),
            Err(SessionError::NotFound("ghost".into()))
        );
    }

    #[test]
    fn test_send_to_closed_queue_counts_as_gone() {
        let (registry, receivers) = registry_with(&["alice"]);
        drop(receivers);
        assert_eq!(
            registry.send_to("alice", joined("x")),
            Err(SessionError::NotFound("alice".into()))
        );
    }

    #[test]
    fn test_broadcast_except_skips_named_user() {
        let (registry, mut receivers) = registry_with(&["alice", "bob", "carol"]);
        registry.broadcast_except("bob", &joined("dave"));
        assert_eq!(receivers[0].try_recv().unwrap(), joined("dave"));
        assert!(receivers[1].try_recv().is_err());
        assert_eq!(receivers[2].try_recv().unwrap(), joined("dave"));
    }

    // ==== bookkeeping ====

    #[test]
    fn test_usernames_are_sorted() {
        let (registry, _rx) = registry_with(&["carol", "alice", "bob"]);
        assert_eq!(registry.usernames(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut registry, _rx) = registry_with(&["alice"]);
        assert!(registry.remove("alice").is_some());
        assert!(registry.remove("alice").is_none());
        assert!(registry.is_empty());
    }
}
