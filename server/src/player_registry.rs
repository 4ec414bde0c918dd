//! Registry of logged-in players.
//!
//! Sessions register after passing login checks and unregister when they
//! close. The registry enforces the player cap and name uniqueness, and
//! fans broadcasts out to every session's outbound queue.

use crate::session::handle::{chat_packets, SessionHandle, SYSTEM_COLOUR};
use log::info;
use shared::Packet;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Server is full!")]
    Full,
    #[error("Already logged in.")]
    DuplicateName,
}

/// Lookup and fan-out over the sessions currently logged in.
pub trait SessionDirectory: Send + Sync {
    /// Adds a session whose name is already set.
    fn register(&self, session: Arc<SessionHandle>) -> Result<(), RegistrationError>;

    /// Removes a session. Does nothing if it is not registered.
    fn unregister(&self, session: &SessionHandle);

    /// Queues `packet` to every registered session except `exclude`.
    fn broadcast(&self, exclude: Option<&SessionHandle>, packet: &Packet);

    fn find(&self, name: &str) -> Option<Arc<SessionHandle>>;

    fn online(&self) -> Vec<Arc<SessionHandle>>;

    /// Broadcasts `text` as chat, wrapped to fit, with no colour added.
    fn message(&self, exclude: Option<&SessionHandle>, text: &str) {
        for packet in chat_packets(text) {
            self.broadcast(exclude, &packet);
        }
    }
}

pub struct PlayerRegistry {
    sessions: RwLock<Vec<Arc<SessionHandle>>>,
    max_players: usize,
}

impl PlayerRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
            max_players,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }
}

impl SessionDirectory for PlayerRegistry {
    fn register(&self, session: Arc<SessionHandle>) -> Result<(), RegistrationError> {
        let name = session.display_name();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        if sessions
            .iter()
            .any(|other| other.name().is_some_and(|n| n.eq_ignore_ascii_case(&name)))
        {
            return Err(RegistrationError::DuplicateName);
        }
        if sessions.len() >= self.max_players {
            return Err(RegistrationError::Full);
        }

        session.set_registered(true);
        sessions.push(session);
        info!(
            "Registered {} ({}/{} players)",
            name,
            sessions.len(),
            self.max_players
        );
        Ok(())
    }

    fn unregister(&self, session: &SessionHandle) {
        let removed = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let before = sessions.len();
            sessions.retain(|other| other.id() != session.id());
            sessions.len() != before
        };
        session.set_registered(false);

        if removed {
            info!("Unregistered {}", session.display_name());
        }
        // Players dropped during the map transfer were never announced.
        if removed && session.has_joined() {
            self.message(
                None,
                &format!("{}Player {} left.", SYSTEM_COLOUR, session.display_name()),
            );
        }
    }

    fn broadcast(&self, exclude: Option<&SessionHandle>, packet: &Packet) {
        let targets = self.online();
        for target in targets {
            if exclude.is_some_and(|skip| skip.id() == target.id()) {
                continue;
            }
            target.send(packet.clone());
        }
    }

    fn find(&self, name: &str) -> Option<Arc<SessionHandle>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|session| session.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .cloned()
    }

    fn online(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
