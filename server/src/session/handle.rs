//! The shared face of a session.
//!
//! A [`SessionHandle`] is what other tasks hold: the player registry,
//! command handlers and broadcasts. It can queue packets and kick, but the
//! connection itself stays owned by the session task.

use crate::outbound::OutboundQueue;
use crate::player_registry::SessionDirectory;
use log::{error, info};
use shared::line_wrapper;
use shared::validation::is_valid_name;
use shared::Packet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Colour code prefixed to server-generated messages.
pub const SYSTEM_COLOUR: &str = "&E";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Wraps `text` into chat lines and encodes each one.
pub fn chat_packets(text: &str) -> Vec<Packet> {
    line_wrapper::wrap(text)
        .iter()
        .filter_map(|line| match Packet::message(0, line) {
            Ok(packet) => Some(packet),
            Err(e) => {
                error!("Failed to encode chat line {:?}: {}", line, e);
                None
            }
        })
        .collect()
}

#[derive(Default)]
struct KickState {
    /// Set by a synchronous kick; fired once the session has flushed its
    /// final packet.
    waiter: Option<oneshot::Sender<()>>,
    closed: bool,
}

pub struct SessionHandle {
    id: u64,
    addr: SocketAddr,
    name: OnceLock<String>,
    is_op: AtomicBool,
    online: AtomicBool,
    /// Set the first time the session goes online. Never cleared.
    joined: AtomicBool,
    registered: AtomicBool,
    /// Blue blocks are placed as water.
    pub place_water: AtomicBool,
    /// Red blocks are placed as lava.
    pub place_lava: AtomicBool,
    /// Stone is placed as admincrete.
    pub place_solid: AtomicBool,
    last_active: Mutex<Instant>,
    outbound: OutboundQueue,
    kick_state: Mutex<KickState>,
}

impl SessionHandle {
    /// Creates a handle and the receiver its session loop drains.
    pub fn new(addr: SocketAddr) -> (Self, mpsc::UnboundedReceiver<Packet>) {
        let (outbound, receiver) = OutboundQueue::new();
        let handle = SessionHandle {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            addr,
            name: OnceLock::new(),
            is_op: AtomicBool::new(false),
            online: AtomicBool::new(false),
            joined: AtomicBool::new(false),
            registered: AtomicBool::new(false),
            place_water: AtomicBool::new(false),
            place_lava: AtomicBool::new(false),
            place_solid: AtomicBool::new(false),
            last_active: Mutex::new(Instant::now()),
            outbound,
            kick_state: Mutex::new(KickState::default()),
        };
        (handle, receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The verified player name, once login has checked it.
    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Player name, or the address before login.
    pub fn display_name(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => self.addr.to_string(),
        }
    }

    pub(crate) fn set_name(&self, name: String) {
        if self.name.set(name).is_err() {
            error!("Session {} tried to change its name", self.id);
        }
    }

    pub fn is_op(&self) -> bool {
        self.is_op.load(Ordering::Acquire)
    }

    pub(crate) fn init_op(&self, is_op: bool) {
        self.is_op.store(is_op, Ordering::Release);
    }

    /// Changes operator status and tells the client.
    pub fn set_op(&self, is_op: bool) {
        self.init_op(is_op);
        match Packet::set_permission(is_op) {
            Ok(packet) => self.send(packet),
            Err(e) => error!("Failed to encode permission update: {}", e),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub(crate) fn set_online(&self, online: bool) {
        if online {
            self.joined.store(true, Ordering::Release);
        }
        self.online.store(online, Ordering::Release);
    }

    /// True once the player finished logging in, even after going offline.
    pub fn has_joined(&self) -> bool {
        self.joined.load(Ordering::Acquire)
    }

    /// True while the player registry holds this session.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub(crate) fn set_registered(&self, registered: bool) {
        self.registered.store(registered, Ordering::Release);
    }

    pub fn reset_idle_timer(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Last time the player chatted, turned or clicked a block.
    pub fn last_active(&self) -> Instant {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a packet. Dropped silently once the session is closing.
    pub fn send(&self, packet: Packet) {
        self.outbound.push(packet);
    }

    /// Sends a system message, wrapped to fit the chat box.
    pub fn message(&self, text: &str) {
        for packet in chat_packets(&format!("{}{}", SYSTEM_COLOUR, text)) {
            self.send(packet);
        }
    }

    pub(crate) fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    /// Queues a kick and stops reading input. Returns immediately; the
    /// session closes once the kick has been written.
    pub fn kick(&self, reason: &str) {
        match Packet::kick(reason) {
            Ok(packet) => {
                if self.outbound.push_final(packet) {
                    info!("Kicking {}: {}", self.display_name(), reason);
                }
            }
            Err(e) => {
                error!("Failed to encode kick for {}: {}", self.display_name(), e);
                self.outbound.close();
            }
        }
    }

    /// Kicks and waits until the session has flushed the kick, then removes
    /// it from `directory`. Once this returns the name is free again.
    pub async fn kick_synchronously(&self, reason: &str, directory: &dyn SessionDirectory) {
        let waiter = {
            let mut state = self.kick_state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiter = Some(tx);
                Some(rx)
            }
        };
        self.kick(reason);
        if let Some(rx) = waiter {
            // An error means the session ended without firing; it is gone either way.
            let _ = rx.await;
        }
        directory.unregister(self);
    }

    /// Marks the session closed. Returns true when a synchronous kick was
    /// waiting, in which case the kicker unregisters the session.
    pub(crate) fn finish(&self) -> bool {
        self.set_online(false);
        self.outbound.close();
        let waiter = {
            let mut state = self.kick_state.lock().unwrap_or_else(PoisonError::into_inner);
            state.closed = true;
            state.waiter.take()
        };
        match waiter {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// For command handlers. Messages the player and returns false when
    /// they are not an operator.
    pub fn check_if_op(&self) -> bool {
        if self.is_op() {
            true
        } else {
            self.message("You must be op to do this.");
            false
        }
    }

    /// For command handlers. Messages the player and returns false when
    /// `given` is missing or not a valid player name.
    pub fn check_player_name(&self, given: Option<&str>) -> bool {
        match given {
            None => {
                self.message("This command requires a player name.");
                false
            }
            Some(name) if !is_valid_name(name) => {
                self.message(&format!("\"{}\" is not a valid player name.", name));
                false
            }
            Some(_) => true,
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("name", &self.name())
            .field("is_op", &self.is_op())
            .field("online", &self.is_online())
            .finish()
    }
}
