//! The shared block grid.
//!
//! Sessions only use the [`World`] trait. Every call may race with edits
//! from other sessions; [`Map`] serializes them behind a read-write lock.

use shared::{Block, Position};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

pub trait World: Send + Sync {
    fn width(&self) -> i16;
    fn height(&self) -> i16;
    fn length(&self) -> i16;

    /// Number of blocks in the grid.
    fn volume(&self) -> usize;

    fn spawn(&self) -> Position;

    fn in_bounds(&self, x: i16, y: i16, z: i16) -> bool {
        (0..self.width()).contains(&x)
            && (0..self.height()).contains(&y)
            && (0..self.length()).contains(&z)
    }

    /// `None` outside the grid.
    fn get_block(&self, x: i16, y: i16, z: i16) -> Option<Block>;

    /// Returns false, changing nothing, outside the grid.
    fn set_block(&self, x: i16, y: i16, z: i16, block: Block) -> bool;

    /// Stores `block` only if `can_replace` accepts the block already there.
    /// The check and the store happen as one step. `None` outside the grid.
    fn replace_block(
        &self,
        x: i16,
        y: i16,
        z: i16,
        block: Block,
        can_replace: &dyn Fn(Block) -> bool,
    ) -> Option<Replacement>;

    /// Copy of the raw block ids in x-fastest, then z, then y order.
    fn blocks(&self) -> Vec<u8>;
}

/// Outcome of [`World::replace_block`], carrying the block that was there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    Replaced(Block),
    Refused(Block),
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("invalid map dimensions {0}x{1}x{2}")]
    InvalidDimensions(i16, i16, i16),
}

/// In-memory block grid.
#[derive(Debug)]
pub struct Map {
    width: i16,
    height: i16,
    length: i16,
    spawn: Position,
    blocks: RwLock<Vec<u8>>,
}

impl Map {
    /// An empty map with spawn in the centre.
    pub fn new(width: i16, height: i16, length: i16) -> Result<Self, MapError> {
        if width <= 0 || height <= 0 || length <= 0 {
            return Err(MapError::InvalidDimensions(width, height, length));
        }
        let volume = width as usize * height as usize * length as usize;
        Ok(Self {
            width,
            height,
            length,
            spawn: Position::from_block(width / 2, height / 2, length / 2),
            blocks: RwLock::new(vec![Block::Air.id(); volume]),
        })
    }

    /// Dirt up to half the height, topped with grass. Spawn sits just above
    /// the surface in the centre.
    pub fn flat(width: i16, height: i16, length: i16) -> Result<Self, MapError> {
        let mut map = Self::new(width, height, length)?;
        let surface = height / 2;
        {
            let blocks = map.blocks.get_mut().unwrap_or_else(PoisonError::into_inner);
            let layer = width as usize * length as usize;
            for y in 0..surface as usize {
                let block = if y + 1 == surface as usize {
                    Block::Grass
                } else {
                    Block::Dirt
                };
                blocks[y * layer..(y + 1) * layer].fill(block.id());
            }
        }
        map.spawn = Position::from_block(width / 2, surface + 1, length / 2);
        Ok(map)
    }

    pub fn set_spawn(&mut self, spawn: Position) {
        self.spawn = spawn;
    }

    fn index(&self, x: i16, y: i16, z: i16) -> Option<usize> {
        if !self.in_bounds(x, y, z) {
            return None;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        Some((y * self.length as usize + z) * self.width as usize + x)
    }
}

impl World for Map {
    fn width(&self) -> i16 {
        self.width
    }

    fn height(&self) -> i16 {
        self.height
    }

    fn length(&self) -> i16 {
        self.length
    }

    fn volume(&self) -> usize {
        self.width as usize * self.height as usize * self.length as usize
    }

    fn spawn(&self) -> Position {
        self.spawn
    }

    fn get_block(&self, x: i16, y: i16, z: i16) -> Option<Block> {
        let index = self.index(x, y, z)?;
        let blocks = self.blocks.read().unwrap_or_else(PoisonError::into_inner);
        blocks.get(index).copied().and_then(Block::from_id)
    }

    fn set_block(&self, x: i16, y: i16, z: i16, block: Block) -> bool {
        let Some(index) = self.index(x, y, z) else {
            return false;
        };
        let mut blocks = self.blocks.write().unwrap_or_else(PoisonError::into_inner);
        match blocks.get_mut(index) {
            Some(slot) => {
                *slot = block.id();
                true
            }
            None => false,
        }
    }

    fn replace_block(
        &self,
        x: i16,
        y: i16,
        z: i16,
        block: Block,
        can_replace: &dyn Fn(Block) -> bool,
    ) -> Option<Replacement> {
        let index = self.index(x, y, z)?;
        let mut blocks = self.blocks.write().unwrap_or_else(PoisonError::into_inner);
        let slot = blocks.get_mut(index)?;
        let current = Block::from_id(*slot).unwrap_or(Block::Air);
        if !can_replace(current) {
            return Some(Replacement::Refused(current));
        }
        *slot = block.id();
        Some(Replacement::Replaced(current))
    }

    fn blocks(&self) -> Vec<u8> {
        self.blocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
