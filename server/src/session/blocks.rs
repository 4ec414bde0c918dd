use super::{Session, SessionHandle};
use crate::error::{SessionError, HACKING_DETECTED};
use crate::world::Replacement;
use log::warn;
use shared::packets::SetBlockClient;
use shared::{Block, OpCode, Packet, Position, UNITS_PER_BLOCK};
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};

/// How far from the player, in position units along any axis, a block may
/// be changed.
pub const MAX_PLACEMENT_RANGE: i32 = 7 * UNITS_PER_BLOCK;

/// Per-player block substitutions, toggled by commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementToggles {
    pub water: bool,
    pub lava: bool,
    pub solid: bool,
}

impl PlacementToggles {
    pub fn of(handle: &SessionHandle) -> Self {
        PlacementToggles {
            water: handle.place_water.load(Ordering::Relaxed),
            lava: handle.place_lava.load(Ordering::Relaxed),
            solid: handle.place_solid.load(Ordering::Relaxed),
        }
    }
}

/// Blue becomes water, red becomes lava, stone becomes admincrete, each
/// only when its toggle is on.
pub fn substitute(block: Block, toggles: PlacementToggles) -> Block {
    match block {
        Block::Blue if toggles.water => Block::Water,
        Block::Red if toggles.lava => Block::Lava,
        Block::Stone if toggles.solid => Block::Admincrete,
        other => other,
    }
}

fn within_reach(position: Position, x: i16, y: i16, z: i16) -> bool {
    let offset = |block: i16, unit: i16| (i32::from(block) * UNITS_PER_BLOCK - i32::from(unit)).abs();
    offset(x, position.x) <= MAX_PLACEMENT_RANGE
        && offset(y, position.y) <= MAX_PLACEMENT_RANGE
        && offset(z, position.z) <= MAX_PLACEMENT_RANGE
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub(super) async fn handle_set_block(&mut self) -> Result<(), SessionError> {
        self.handle.reset_idle_timer();
        let request: SetBlockClient = self.reader.read_body(OpCode::SetBlockClient).await?;
        let SetBlockClient { x, y, z, .. } = request;
        let name = self.handle.display_name();

        let Some(declared) = Block::from_id(request.block) else {
            warn!("{} tried to place an invalid block type {}", name, request.block);
            return Err(SessionError::Abuse(HACKING_DETECTED));
        };
        let block = if request.is_deleting() {
            Block::Air
        } else {
            declared
        };

        // Out-of-bounds clicks happen with legitimate clients.
        let world = &self.ctx.world;
        if !world.in_bounds(x, y, z) {
            return Ok(());
        }

        if !within_reach(self.position, x, y, z) {
            warn!("{} tried to place a block too far away", name);
            return Err(SessionError::Abuse(HACKING_DETECTED));
        }

        if self.ctx.config.limit_click_rate && self.block_spam.is_spam(Instant::now()) {
            warn!("{} tried to place blocks too quickly", name);
            return Err(SessionError::Abuse(HACKING_DETECTED));
        }

        let block = substitute(block, PlacementToggles::of(&self.handle));
        let is_op = self.handle.is_op();
        if block.is_restricted() && !is_op {
            warn!("{} tried to place restricted block {:?}", name, block);
            return Err(SessionError::Abuse(HACKING_DETECTED));
        }
        let can_replace = |current: Block| is_op || current != Block::Admincrete;
        match world.replace_block(x, y, z, block, &can_replace) {
            Some(Replacement::Replaced(_)) => {}
            Some(Replacement::Refused(_)) => {
                warn!("{} tried to replace admincrete", name);
                return Err(SessionError::Abuse(HACKING_DETECTED));
            }
            None => return Ok(()),
        }
        let packet = Packet::set_block(x, y, z, block)?;
        if block.id() != request.block {
            // The sender's client shows the wrong block; correct it too.
            self.ctx.directory.broadcast(None, &packet);
        } else {
            self.ctx.directory.broadcast(Some(self.handle.as_ref()), &packet);
        }
        Ok(())
    }
}
