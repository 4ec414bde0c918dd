//! Per-session outbound packet queue.
//!
//! Any task may push packets; only the owning session's loop drains them.
//! Delivery order is the push order. A kick packet closes the queue behind
//! itself, so it is always the last packet the session writes.

use log::debug;
use shared::Packet;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

struct Gate {
    sender: mpsc::UnboundedSender<Packet>,
    can_queue: bool,
    can_receive: bool,
}

pub struct OutboundQueue {
    gate: Mutex<Gate>,
}

impl OutboundQueue {
    /// Creates the queue and the receiver the session loop drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Packet>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = OutboundQueue {
            gate: Mutex::new(Gate {
                sender,
                can_queue: true,
                can_receive: true,
            }),
        };
        (queue, receiver)
    }

    /// Queues a packet. Returns false once the queue has been closed.
    pub fn push(&self, packet: Packet) -> bool {
        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if !gate.can_queue {
            debug!("Dropping {} for a closed session", packet.opcode());
            return false;
        }
        gate.sender.send(packet).is_ok()
    }

    /// Queues a final packet, then refuses further packets and input.
    pub fn push_final(&self, packet: Packet) -> bool {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if !gate.can_queue {
            return false;
        }
        gate.can_queue = false;
        gate.can_receive = false;
        gate.sender.send(packet).is_ok()
    }

    /// Refuses further packets and input without queueing anything.
    pub fn close(&self) {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        gate.can_queue = false;
        gate.can_receive = false;
    }

    pub fn can_queue(&self) -> bool {
        self.gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .can_queue
    }

    /// False once a kick is pending; the session stops reading input.
    pub fn can_receive(&self) -> bool {
        self.gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .can_receive
    }
}
