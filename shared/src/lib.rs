//! Wire protocol shared by the server and its test client.
//!
//! Every packet is a one-byte [`OpCode`] followed by a fixed-size body.
//! Multi-byte integers are big-endian and text fields are 64 bytes of
//! space-padded ASCII.

pub mod block;
pub mod codec;
pub mod line_wrapper;
pub mod opcode;
pub mod packets;
pub mod position;
pub mod validation;

pub use block::{Block, MAX_LEGAL_BLOCK_TYPE};
pub use codec::{FixedBytes, PacketReader, PacketWriter, PaddedString, ProtocolError};
pub use opcode::OpCode;
pub use packets::{Packet, CHUNK_SIZE, SELF_ID};
pub use position::{Position, PositionDelta, UNITS_PER_BLOCK};

/// Protocol version spoken by this server.
pub const PROTOCOL_VERSION: u8 = 7;

/// User type byte for operators.
pub const USER_TYPE_OP: u8 = 0x64;

/// User type byte for everyone else.
pub const USER_TYPE_NORMAL: u8 = 0x00;
