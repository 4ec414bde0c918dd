//! Server network layer: accepts TCP connections and spawns a session task
//! for each one.

use crate::context::ServerContext;
use crate::session::{Session, SessionHandle};
use log::{debug, error, info};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SHUTDOWN_REASON: &str = "Server shutting down.";

/// Pause after a failed accept, so a persistent error does not spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Starts a session on an already-connected stream.
///
/// Returns the session's handle and the task driving it. The task ends when
/// the session closes.
pub fn spawn_session<S>(
    stream: S,
    addr: SocketAddr,
    ctx: Arc<ServerContext>,
) -> (Arc<SessionHandle>, JoinHandle<()>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let session = Session::new(stream, addr, ctx);
    let handle = session.handle();
    let task = tokio::spawn(session.run());
    (handle, task)
}

/// Listening server.
pub struct Server {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl Server {
    pub async fn bind(ctx: Arc<ServerContext>) -> io::Result<Self> {
        let listener = TcpListener::bind(ctx.config.bind_address()).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Server { listener, ctx })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Accepts connections until the task is cancelled.
    pub async fn run(&self) -> io::Result<()> {
        info!(
            "Server started: {} ({} players max)",
            self.ctx.config.server_name, self.ctx.config.max_players
        );
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("Accepted connection from {}", addr);
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
                    }
                    spawn_session(stream, addr, Arc::clone(&self.ctx));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }

    /// Kicks every online player and waits until each one is gone.
    pub async fn shutdown(&self) {
        kick_all(&self.ctx, SHUTDOWN_REASON).await;
    }
}

/// Synchronously kicks every registered session.
pub async fn kick_all(ctx: &ServerContext, reason: &str) {
    let sessions = ctx.directory.online();
    info!("Kicking {} player(s): {}", sessions.len(), reason);
    for session in sessions {
        session
            .kick_synchronously(reason, ctx.directory.as_ref())
            .await;
    }
}
