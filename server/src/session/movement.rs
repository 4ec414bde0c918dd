use super::Session;
use crate::antispam::SpeedCheck;
use crate::error::SessionError;
use log::{debug, warn};
use shared::packets::Teleport;
use shared::{OpCode, Packet, SELF_ID};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};

pub const SPEED_HACK_WARNING: &str = "&WYou are not allowed to speedhack.";

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub(super) async fn handle_movement(&mut self) -> Result<(), SessionError> {
        let update: Teleport = self.reader.read_body(OpCode::Teleport).await?;
        let new_position = update.position;

        let delta = new_position.delta_from(&self.position);
        if delta.is_zero() {
            return Ok(());
        }
        // Being pushed around does not count as activity; turning does.
        if delta.rotation_changed() {
            self.handle.reset_idle_timer();
        }

        if !self.ctx.config.allow_speed_hack {
            let now = Instant::now();
            if self.movement_spam.is_spam(now) {
                debug!("{} is flooding movement packets", self.handle.display_name());
                return self.deny_movement(now).await;
            }
            match self.speed_guard.check(&delta) {
                SpeedCheck::Normal => self.last_valid_position = new_position,
                SpeedCheck::Tolerated => self.last_valid_position = self.position,
                SpeedCheck::Rollback => {
                    warn!(
                        "{} moved too fast, rolling back",
                        self.handle.display_name()
                    );
                    return self.deny_movement(now).await;
                }
            }
        }

        self.position = new_position;
        Ok(())
    }

    /// Snaps the player back to the last valid position.
    ///
    /// The teleport skips the outbound queue and may overtake queued packets.
    async fn deny_movement(&mut self, now: Instant) -> Result<(), SessionError> {
        self.position = self.last_valid_position;
        self.writer
            .write_packet(&Packet::teleport(SELF_ID, self.last_valid_position)?)
            .await?;
        self.writer.flush().await?;
        if self.speed_notice.allow(now) {
            self.handle.message(SPEED_HACK_WARNING);
        }
        Ok(())
    }
}
