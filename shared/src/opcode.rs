//! One-byte packet tags and the fixed body length that follows each of them.

use crate::codec::ProtocolError;
use std::fmt;

/// Every packet on the wire starts with one of these tags. The body that
/// follows has a fixed size determined by the tag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Handshake = 0x00,
    Ping = 0x01,
    MapBegin = 0x02,
    MapChunk = 0x03,
    MapEnd = 0x04,
    SetBlockClient = 0x05,
    SetBlockServer = 0x06,
    AddEntity = 0x07,
    Teleport = 0x08,
    MoveRotate = 0x09,
    Move = 0x0A,
    Rotate = 0x0B,
    RemoveEntity = 0x0C,
    Message = 0x0D,
    Kick = 0x0E,
    SetPermission = 0x0F,
}

impl OpCode {
    /// Number of body bytes following the opcode byte.
    pub fn payload_len(self) -> usize {
        match self {
            OpCode::Handshake => 130,
            OpCode::Ping | OpCode::MapBegin => 0,
            OpCode::MapChunk => 1027,
            OpCode::MapEnd => 6,
            OpCode::SetBlockClient => 8,
            OpCode::SetBlockServer => 7,
            OpCode::AddEntity => 73,
            OpCode::Teleport => 9,
            OpCode::MoveRotate => 6,
            OpCode::Move => 4,
            OpCode::Rotate => 3,
            OpCode::RemoveEntity => 1,
            OpCode::Message => 65,
            OpCode::Kick => 64,
            OpCode::SetPermission => 1,
        }
    }

    /// Total packet size including the opcode byte.
    pub fn packet_len(self) -> usize {
        self.payload_len() + 1
    }
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let opcode = match value {
            0x00 => OpCode::Handshake,
            0x01 => OpCode::Ping,
            0x02 => OpCode::MapBegin,
            0x03 => OpCode::MapChunk,
            0x04 => OpCode::MapEnd,
            0x05 => OpCode::SetBlockClient,
            0x06 => OpCode::SetBlockServer,
            0x07 => OpCode::AddEntity,
            0x08 => OpCode::Teleport,
            0x09 => OpCode::MoveRotate,
            0x0A => OpCode::Move,
            0x0B => OpCode::Rotate,
            0x0C => OpCode::RemoveEntity,
            0x0D => OpCode::Message,
            0x0E => OpCode::Kick,
            0x0F => OpCode::SetPermission,
            other => return Err(ProtocolError::UnknownOpCode(other)),
        };
        Ok(opcode)
    }
}

impl From<OpCode> for u8 {
    fn from(opcode: OpCode) -> Self {
        opcode as u8
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, *self as u8)
    }
}
