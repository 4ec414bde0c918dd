use shared::ProtocolError;
use std::io;
use thiserror::Error;

/// Kick reason for every cheat or abuse detection except chat spam.
pub const HACKING_DETECTED: &str = "Hacking detected.";
pub const CHAT_SPAM: &str = "Kicked for chat spam!";

/// Why a session ended early.
///
/// Every variant is fatal to the session that raised it and to nothing else.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad data or a dead stream. Closed without a kick packet.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    /// Malformed login preamble. Logged and closed without a kick packet.
    #[error("bad handshake: {0}")]
    Handshake(String),
    #[error("unknown packet opcode {0}")]
    UnknownOpCode(u8),
    /// Invalid name or failed token check.
    #[error("authentication failed: {0}")]
    Authentication(&'static str),
    /// Ban hit, server full or name already taken.
    #[error("rejected: {0}")]
    Policy(String),
    #[error("abuse detected: {0}")]
    Abuse(&'static str),
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Text for the kick packet written before closing, when the peer should get one.
    pub fn kick_reason(&self) -> Option<String> {
        match self {
            SessionError::UnknownOpCode(code) => Some(format!("Unknown packet opcode {}", code)),
            SessionError::Authentication(reason) | SessionError::Abuse(reason) => {
                Some((*reason).to_string())
            }
            SessionError::Policy(reason) => Some(reason.clone()),
            SessionError::Protocol(_)
            | SessionError::Handshake(_)
            | SessionError::Transport(_)
            | SessionError::Internal(_) => None,
        }
    }

    /// True when the peer simply went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            SessionError::Protocol(err) => err.is_disconnect(),
            SessionError::Transport(_) => true,
            _ => false,
        }
    }
}
