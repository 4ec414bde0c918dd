//! Map transfer on login.
//!
//! The block array is prefixed with its length (4 bytes, big-endian),
//! gzipped, and sent in 1024-byte chunks. The last chunk is zero-padded to
//! full size since some clients reject a short one.

use super::Session;
use crate::error::SessionError;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use shared::packets::MapChunk;
use shared::{FixedBytes, Packet, CHUNK_SIZE, SELF_ID};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Gzips `[volume as i32 BE] ++ blocks`.
pub fn compress_blocks(volume: usize, blocks: &[u8]) -> io::Result<Vec<u8>> {
    let volume = i32::try_from(volume).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("map volume {} does not fit the wire format", volume),
        )
    })?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(blocks.len() / 8), Compression::default());
    encoder.write_all(&volume.to_be_bytes())?;
    encoder.write_all(blocks)?;
    encoder.finish()
}

/// Splits compressed map data into chunk packet bodies.
pub struct MapChunks<'a> {
    data: &'a [u8],
    sent: usize,
}

pub fn map_chunks(data: &[u8]) -> MapChunks<'_> {
    MapChunks { data, sent: 0 }
}

impl Iterator for MapChunks<'_> {
    type Item = MapChunk;

    fn next(&mut self) -> Option<MapChunk> {
        if self.sent >= self.data.len() {
            return None;
        }
        let end = (self.sent + CHUNK_SIZE).min(self.data.len());
        let payload = &self.data[self.sent..end];

        let mut buffer = [0u8; CHUNK_SIZE];
        buffer[..payload.len()].copy_from_slice(payload);
        // Percentage sent before this chunk.
        let progress = (self.sent * 100 / self.data.len()) as u8;

        self.sent = end;
        Some(MapChunk {
            length: payload.len() as i16,
            data: FixedBytes(buffer),
            progress,
        })
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Sends the server handshake, the whole map, and the player's own
    /// entity at spawn, then makes spawn the movement baseline.
    pub(super) async fn send_map(&mut self) -> Result<(), SessionError> {
        let config = &self.ctx.config;
        let handshake = Packet::handshake(&config.server_name, &config.motd, self.handle.is_op())?;
        self.writer.write_packet(&handshake).await?;
        self.writer.write_packet(&Packet::map_begin()?).await?;

        let world = Arc::clone(&self.ctx.world);
        let compressed = tokio::task::spawn_blocking(move || {
            let blocks = world.blocks();
            compress_blocks(blocks.len(), &blocks)
        })
        .await
        .map_err(|e| SessionError::Internal(format!("map compression task failed: {}", e)))?
        .map_err(|e| SessionError::Internal(format!("map compression failed: {}", e)))?;

        debug!(
            "Sending {} bytes of map data to {}",
            compressed.len(),
            self.handle.display_name()
        );
        for chunk in map_chunks(&compressed) {
            self.writer.write_packet(&Packet::map_chunk(&chunk)?).await?;
        }

        let world = &self.ctx.world;
        let spawn = world.spawn();
        let name = self.handle.display_name();
        self.writer
            .write_packet(&Packet::map_end(world.width(), world.height(), world.length())?)
            .await?;
        self.writer
            .write_packet(&Packet::add_entity(SELF_ID, &name, spawn)?)
            .await?;
        self.writer
            .write_packet(&Packet::teleport(SELF_ID, spawn)?)
            .await?;
        self.writer.flush().await?;

        self.position = spawn;
        self.last_valid_position = spawn;
        Ok(())
    }
}
