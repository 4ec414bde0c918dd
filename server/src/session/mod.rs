//! Per-connection session engine.
//!
//! A [`Session`] owns one connection for its whole life. It runs the login
//! exchange, streams the map, then loops: write whatever other tasks queued
//! for it, read and handle whatever the client sent. Everything a session
//! does to shared state goes through [`ServerContext`].

mod blocks;
mod chat;
pub mod handle;
mod login;
mod movement;
mod snapshot;

pub use blocks::{substitute, PlacementToggles, MAX_PLACEMENT_RANGE};
pub use chat::{interpret, ChatAction};
pub use handle::SessionHandle;
pub use snapshot::{compress_blocks, map_chunks, MapChunks};

use crate::antispam::{NoticeLimiter, SpamWindow, SpeedHackGuard};
use crate::context::ServerContext;
use crate::error::SessionError;
use log::{debug, info, warn};
use shared::{OpCode, Packet, PacketReader, PacketWriter, Position};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    LoggingIn,
    LoggedIn,
    Disconnecting,
    Closed,
}

pub struct Session<S> {
    ctx: Arc<ServerContext>,
    handle: Arc<SessionHandle>,
    outbound: mpsc::UnboundedReceiver<Packet>,
    reader: PacketReader<ReadHalf<S>>,
    writer: PacketWriter<WriteHalf<S>>,
    state: SessionState,
    position: Position,
    /// Where rejected movement snaps the player back to.
    last_valid_position: Position,
    movement_spam: SpamWindow,
    block_spam: SpamWindow,
    chat_spam: SpamWindow,
    speed_guard: SpeedHackGuard,
    speed_notice: NoticeLimiter,
    partial_message: Option<String>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S, addr: SocketAddr, ctx: Arc<ServerContext>) -> Self {
        let (handle, outbound) = SessionHandle::new(addr);
        let (read_half, write_half) = tokio::io::split(stream);
        Session {
            ctx,
            handle: Arc::new(handle),
            outbound,
            reader: PacketReader::new(read_half),
            writer: PacketWriter::new(write_half),
            state: SessionState::Connecting,
            position: Position::ZERO,
            last_valid_position: Position::ZERO,
            movement_spam: SpamWindow::movement(),
            block_spam: SpamWindow::blocks(),
            chat_spam: SpamWindow::chat(),
            speed_guard: SpeedHackGuard::new(),
            speed_notice: NoticeLimiter::default(),
            partial_message: None,
        }
    }

    pub fn handle(&self) -> Arc<SessionHandle> {
        Arc::clone(&self.handle)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drives the session to completion. Every exit path ends in a single
    /// disconnect.
    pub async fn run(mut self) {
        self.state = SessionState::LoggingIn;
        if let Err(err) = self.serve().await {
            self.fail(&err).await;
        }
        self.disconnect().await;
    }

    async fn serve(&mut self) -> Result<(), SessionError> {
        self.login().await?;
        self.steady_loop().await
    }

    async fn steady_loop(&mut self) -> Result<(), SessionError> {
        loop {
            let can_receive = self.handle.outbound().can_receive();
            tokio::select! {
                biased;
                packet = self.outbound.recv() => {
                    let Some(packet) = packet else {
                        return Ok(());
                    };
                    self.writer.write_packet(&packet).await?;
                    if packet.is_kick() {
                        self.writer.flush().await?;
                        return Ok(());
                    }
                }
                byte = self.reader.next_opcode_byte(), if can_receive => {
                    self.dispatch(byte?).await?;
                }
            }
        }
    }

    async fn dispatch(&mut self, byte: u8) -> Result<(), SessionError> {
        let opcode = OpCode::try_from(byte).map_err(|_| SessionError::UnknownOpCode(byte))?;
        match opcode {
            OpCode::Message => self.handle_message().await,
            OpCode::Teleport => self.handle_movement().await,
            OpCode::SetBlockClient => self.handle_set_block().await,
            OpCode::Ping => Ok(()),
            _ => Err(SessionError::UnknownOpCode(byte)),
        }
    }

    async fn fail(&mut self, err: &SessionError) {
        let name = self.handle.display_name();
        match err.kick_reason() {
            Some(reason) => {
                warn!("Kicking {}: {}", name, err);
                self.kick_now(&reason).await;
            }
            None if err.is_disconnect() => debug!("{} closed the connection", name),
            None => warn!("Session {} ended: {}", name, err),
        }
    }

    /// Writes a kick straight to the socket, bypassing anything queued.
    async fn kick_now(&mut self, reason: &str) {
        self.handle.outbound().close();
        let result = async {
            let packet = Packet::kick(reason)?;
            self.writer.write_packet(&packet).await?;
            self.writer.flush().await
        }
        .await;
        if let Err(e) = result {
            debug!("Could not deliver kick to {}: {}", self.handle.display_name(), e);
        }
    }

    async fn disconnect(&mut self) {
        if matches!(self.state, SessionState::Disconnecting | SessionState::Closed) {
            return;
        }
        self.state = SessionState::Disconnecting;

        let kicker_unregisters = self.handle.finish();
        if !kicker_unregisters && self.handle.is_registered() {
            self.ctx.directory.unregister(&self.handle);
        }
        if let Err(e) = self.writer.shutdown().await {
            debug!("Shutdown of {} failed: {}", self.handle.display_name(), e);
        }

        self.state = SessionState::Closed;
        info!("{} disconnected", self.handle.display_name());
    }
}
