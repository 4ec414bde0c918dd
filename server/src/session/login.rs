use super::handle::SYSTEM_COLOUR;
use super::{Session, SessionState};
use crate::error::SessionError;
use log::{info, warn};
use shared::validation::{is_valid_name, is_verified};
use shared::{OpCode, PROTOCOL_VERSION};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

pub const INVALID_NAME: &str = "Unacceptible player name.";
pub const UNVERIFIED_NAME: &str = "Could not verify player name.";
pub const BANNED_NAME: &str = "You are banned!";
pub const BANNED_ADDRESS: &str = "Your IP address is banned!";

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Reads the client handshake, checks it against bans and the player
    /// registry, then sends the map.
    ///
    /// Nothing is registered until every check has passed, so a failed login
    /// leaves no trace. Failures after registration are undone by the
    /// session's disconnect.
    pub(super) async fn login(&mut self) -> Result<(), SessionError> {
        let addr = self.handle.addr();

        let opcode = self.reader.read_u8().await?;
        if opcode != u8::from(OpCode::Handshake) {
            return Err(SessionError::Handshake(format!(
                "{} sent opcode {} instead of a handshake",
                addr, opcode
            )));
        }

        let version = self.reader.read_u8().await?;
        if version != PROTOCOL_VERSION {
            return Err(SessionError::Handshake(format!(
                "{} uses protocol version {}, expected {}",
                addr, version, PROTOCOL_VERSION
            )));
        }

        let name = self.reader.read_string().await?;
        if !is_valid_name(&name) {
            warn!("{} tried to log in with an invalid name {:?}", addr, name);
            return Err(SessionError::Authentication(INVALID_NAME));
        }

        let token = self.reader.read_string().await?;
        if !is_verified(&self.ctx.salt, &name, &token) {
            warn!("{} failed name verification for {}", addr, name);
            return Err(SessionError::Authentication(UNVERIFIED_NAME));
        }

        // unused
        self.reader.read_u8().await?;

        if self.ctx.bans.contains_name(&name) {
            info!("Banned player {} tried to log in from {}", name, addr);
            return Err(SessionError::Policy(BANNED_NAME.to_string()));
        }
        if self.ctx.bans.contains_address(addr.ip()) {
            info!("{} tried to log in from banned address {}", name, addr);
            return Err(SessionError::Policy(BANNED_ADDRESS.to_string()));
        }

        self.handle.set_name(name.clone());
        self.handle.init_op(self.ctx.operators.contains(&name));

        self.ctx
            .directory
            .register(Arc::clone(&self.handle))
            .map_err(|e| SessionError::Policy(e.to_string()))?;

        self.send_map().await?;

        self.handle.set_online(true);
        self.state = SessionState::LoggedIn;
        info!("Player {} connected from {}", name, addr);
        self.ctx.directory.message(
            Some(self.handle.as_ref()),
            &format!("{}Player {} connected.", SYSTEM_COLOUR, name),
        );
        Ok(())
    }
}
