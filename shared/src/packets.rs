//! Packet bodies and the opaque outbound [`Packet`].

use crate::block::Block;
use crate::codec::{self, FixedBytes, PaddedString, ProtocolError};
use crate::opcode::OpCode;
use crate::position::Position;
use crate::{PROTOCOL_VERSION, USER_TYPE_NORMAL, USER_TYPE_OP};
use serde::{Deserialize, Serialize};

/// Bytes carried by a single map chunk packet.
pub const CHUNK_SIZE: usize = 1024;

/// Entity id a client uses to refer to itself.
pub const SELF_ID: i8 = -1;

/// Login fields following the protocol version byte of a client handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub name: PaddedString,
    pub verification_key: PaddedString,
    pub unused: u8,
}

impl Credentials {
    pub const LEN: usize = 64 + 64 + 1;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientHandshake {
    pub protocol_version: u8,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerHandshake {
    pub protocol_version: u8,
    pub server_name: PaddedString,
    pub motd: PaddedString,
    pub user_type: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapChunk {
    /// Meaningful bytes in `data`; the rest is zero padding.
    pub length: i16,
    pub data: FixedBytes<CHUNK_SIZE>,
    /// Percentage of the map sent before this chunk.
    pub progress: u8,
}

impl MapChunk {
    pub fn payload(&self) -> &[u8] {
        let len = usize::try_from(self.length).unwrap_or(0).min(CHUNK_SIZE);
        &self.data.0[..len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEnd {
    pub width: i16,
    pub height: i16,
    pub length: i16,
}

/// Build or delete request from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBlockClient {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// 0 deletes, anything else builds.
    pub mode: u8,
    pub block: u8,
}

impl SetBlockClient {
    pub fn is_deleting(&self) -> bool {
        self.mode == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBlockServer {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub block: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddEntity {
    pub player_id: i8,
    pub name: PaddedString,
    pub position: Position,
}

/// Absolute position update. Sent both ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teleport {
    pub player_id: i8,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub player_id: i8,
    pub message: PaddedString,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kick {
    pub reason: PaddedString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPermission {
    pub user_type: u8,
}

fn user_type(is_op: bool) -> u8 {
    if is_op {
        USER_TYPE_OP
    } else {
        USER_TYPE_NORMAL
    }
}

/// An encoded packet ready to be written: the opcode byte followed by its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    opcode: OpCode,
    bytes: Vec<u8>,
}

impl Packet {
    pub fn new<T: Serialize>(opcode: OpCode, body: &T) -> Result<Self, ProtocolError> {
        let mut bytes = Vec::with_capacity(opcode.packet_len());
        bytes.push(opcode.into());
        codec::encode_into(&mut bytes, body)?;
        Ok(Self { opcode, bytes })
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Body without the leading opcode byte.
    pub fn body(&self) -> &[u8] {
        &self.bytes[1..]
    }

    pub fn is_kick(&self) -> bool {
        self.opcode == OpCode::Kick
    }

    pub fn handshake(server_name: &str, motd: &str, is_op: bool) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::Handshake,
            &ServerHandshake {
                protocol_version: PROTOCOL_VERSION,
                server_name: server_name.into(),
                motd: motd.into(),
                user_type: user_type(is_op),
            },
        )
    }

    pub fn ping() -> Result<Self, ProtocolError> {
        Self::new(OpCode::Ping, &())
    }

    pub fn map_begin() -> Result<Self, ProtocolError> {
        Self::new(OpCode::MapBegin, &())
    }

    pub fn map_chunk(chunk: &MapChunk) -> Result<Self, ProtocolError> {
        Self::new(OpCode::MapChunk, chunk)
    }

    pub fn map_end(width: i16, height: i16, length: i16) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::MapEnd,
            &MapEnd {
                width,
                height,
                length,
            },
        )
    }

    pub fn set_block(x: i16, y: i16, z: i16, block: Block) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::SetBlockServer,
            &SetBlockServer {
                x,
                y,
                z,
                block: block.id(),
            },
        )
    }

    pub fn add_entity(player_id: i8, name: &str, position: Position) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::AddEntity,
            &AddEntity {
                player_id,
                name: name.into(),
                position,
            },
        )
    }

    pub fn teleport(player_id: i8, position: Position) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::Teleport,
            &Teleport {
                player_id,
                position,
            },
        )
    }

    pub fn message(player_id: i8, text: &str) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::Message,
            &ChatMessage {
                player_id,
                message: text.into(),
            },
        )
    }

    pub fn kick(reason: &str) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::Kick,
            &Kick {
                reason: reason.into(),
            },
        )
    }

    pub fn set_permission(is_op: bool) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::SetPermission,
            &SetPermission {
                user_type: user_type(is_op),
            },
        )
    }

    /// Login request as a client sends it.
    pub fn client_handshake(name: &str, verification_key: &str) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::Handshake,
            &ClientHandshake {
                protocol_version: PROTOCOL_VERSION,
                credentials: Credentials {
                    name: name.into(),
                    verification_key: verification_key.into(),
                    unused: 0,
                },
            },
        )
    }

    /// Build (`building == true`) or delete request as a client sends it.
    pub fn client_set_block(
        x: i16,
        y: i16,
        z: i16,
        building: bool,
        block: u8,
    ) -> Result<Self, ProtocolError> {
        Self::new(
            OpCode::SetBlockClient,
            &SetBlockClient {
                x,
                y,
                z,
                mode: u8::from(building),
                block,
            },
        )
    }
}
