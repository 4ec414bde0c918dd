use serde::{Deserialize, Serialize};

/// Sub-block units per block along each axis.
pub const UNITS_PER_BLOCK: i32 = 32;

/// Player location in 1/32 block units plus orientation bytes.
///
/// `y` is the vertical axis. Field order matches the wire layout of every
/// packet that carries a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub yaw: u8,
    pub pitch: u8,
}

impl Position {
    pub const ZERO: Position = Position {
        x: 0,
        y: 0,
        z: 0,
        yaw: 0,
        pitch: 0,
    };

    pub fn new(x: i16, y: i16, z: i16, yaw: u8, pitch: u8) -> Self {
        Self {
            x,
            y,
            z,
            yaw,
            pitch,
        }
    }

    /// Centre of the given block, in position units.
    pub fn from_block(x: i16, y: i16, z: i16) -> Self {
        let centre = |c: i16| (i32::from(c) * UNITS_PER_BLOCK + UNITS_PER_BLOCK / 2) as i16;
        Self::new(centre(x), centre(y), centre(z), 0, 0)
    }

    /// Movement from `previous` to `self`.
    pub fn delta_from(&self, previous: &Position) -> PositionDelta {
        PositionDelta {
            dx: i32::from(self.x) - i32::from(previous.x),
            dy: i32::from(self.y) - i32::from(previous.y),
            dz: i32::from(self.z) - i32::from(previous.z),
            yaw_changed: self.yaw != previous.yaw,
            pitch_changed: self.pitch != previous.pitch,
        }
    }
}

/// Component-wise difference between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionDelta {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
    pub yaw_changed: bool,
    pub pitch_changed: bool,
}

impl PositionDelta {
    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0 && self.dz == 0 && !self.rotation_changed()
    }

    pub fn rotation_changed(&self) -> bool {
        self.yaw_changed || self.pitch_changed
    }

    pub fn horizontal_distance_squared(&self) -> i64 {
        let (dx, dz) = (i64::from(self.dx), i64::from(self.dz));
        dx * dx + dz * dz
    }

    pub fn distance_squared(&self) -> i64 {
        let dy = i64::from(self.dy);
        self.horizontal_distance_squared() + dy * dy
    }
}
