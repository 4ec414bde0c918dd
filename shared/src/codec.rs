//! Fixed-layout binary codec.
//!
//! Packet bodies are plain serde structs. They are encoded with bincode set
//! to fixed-width, big-endian integers, so a struct's field order is exactly
//! its wire layout. Fixed-length byte runs (padded strings, map chunks) use
//! [`FixedBytes`], which serializes as a tuple and therefore carries no
//! length prefix.
//!
//! [`PacketReader`] and [`PacketWriter`] wrap the two halves of a connection
//! and bound every blocking read or write with a timeout.

use crate::opcode::OpCode;
use crate::packets::Packet;
use bincode::Options;
use serde::de::{self, DeserializeOwned, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::future::Future;
use std::io;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Length of every text field on the wire.
pub const STRING_LENGTH: usize = 64;

/// Default bound on a single blocking read or write.
pub const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures while reading or writing packets.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpCode(u8),
    #[error("malformed packet body: {0}")]
    Malformed(#[from] bincode::Error),
}

impl ProtocolError {
    /// True when the remote end went away rather than sending bad data.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
}

/// Encodes a packet body in wire layout.
pub fn encode<T: Serialize>(body: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(wire_options().serialize(body)?)
}

/// Appends a packet body in wire layout to `buffer`.
pub fn encode_into<T: Serialize>(buffer: &mut Vec<u8>, body: &T) -> Result<(), ProtocolError> {
    Ok(wire_options().serialize_into(buffer, body)?)
}

/// Decodes a packet body. The slice must hold exactly one body.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(wire_options().deserialize(bytes)?)
}

/// A fixed-size byte run with no length prefix on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedBytes<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for FixedBytes<N> {
    fn default() -> Self {
        FixedBytes([0; N])
    }
}

impl<const N: usize> fmt::Debug for FixedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedBytes<{}>", N)
    }
}

impl<const N: usize> Serialize for FixedBytes<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(N)?;
        for byte in &self.0 {
            tuple.serialize_element(byte)?;
        }
        tuple.end()
    }
}

struct FixedBytesVisitor<const N: usize>(PhantomData<[u8; N]>);

impl<'de, const N: usize> Visitor<'de> for FixedBytesVisitor<N> {
    type Value = FixedBytes<N>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} raw bytes", N)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = [0u8; N];
        for (index, slot) in bytes.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(index, &self))?;
        }
        Ok(FixedBytes(bytes))
    }
}

impl<'de, const N: usize> Deserialize<'de> for FixedBytes<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(N, FixedBytesVisitor::<N>(PhantomData))
    }
}

/// A text field: 64 ASCII bytes, space padded on write, trimmed on read.
///
/// Characters outside ASCII are sent as `?`; text longer than 64 characters
/// is truncated. Received bytes map one-to-one onto chars (Latin-1), so
/// bytes past `0x7E` stay visible to validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaddedString(String);

impl PaddedString {
    pub fn new(text: impl Into<String>) -> Self {
        PaddedString(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn to_fixed(&self) -> FixedBytes<STRING_LENGTH> {
        let mut bytes = [b' '; STRING_LENGTH];
        for (slot, ch) in bytes.iter_mut().zip(self.0.chars()) {
            *slot = if ch.is_ascii() { ch as u8 } else { b'?' };
        }
        FixedBytes(bytes)
    }

    fn from_fixed(bytes: FixedBytes<STRING_LENGTH>) -> Self {
        let text: String = bytes
            .0
            .iter()
            .map(|&b| char::from(b))
            .collect();
        PaddedString(text.trim_end_matches([' ', '\0']).to_string())
    }
}

impl From<&str> for PaddedString {
    fn from(text: &str) -> Self {
        PaddedString::new(text)
    }
}

impl From<String> for PaddedString {
    fn from(text: String) -> Self {
        PaddedString(text)
    }
}

impl fmt::Display for PaddedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PaddedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_fixed().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PaddedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        FixedBytes::<STRING_LENGTH>::deserialize(deserializer).map(PaddedString::from_fixed)
    }
}

async fn with_deadline<F, T>(timeout: Duration, op: F) -> Result<T, ProtocolError>
where
    F: Future<Output = io::Result<T>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ProtocolError::Timeout(timeout)),
    }
}

/// Reads opcodes and fixed-size bodies from the inbound half of a connection.
pub struct PacketReader<R> {
    inner: R,
    timeout: Duration,
}

impl<R: AsyncRead + Unpin> PacketReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_timeout(inner, IO_TIMEOUT)
    }

    pub fn with_timeout(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Waits for the next opcode byte with no deadline.
    ///
    /// Cancel-safe: if the future is dropped before completing, no byte
    /// has been consumed.
    pub async fn next_opcode_byte(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.inner.read_u8().await?)
    }

    /// Reads one opcode, failing on tags the protocol does not define.
    pub async fn read_opcode(&mut self) -> Result<OpCode, ProtocolError> {
        OpCode::try_from(self.read_u8().await?)
    }

    pub async fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        with_deadline(self.timeout, self.inner.read_u8()).await
    }

    pub async fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        with_deadline(self.timeout, self.inner.read_i16()).await
    }

    /// Reads a 64-byte text field and trims its padding.
    pub async fn read_string(&mut self) -> Result<String, ProtocolError> {
        let text: PaddedString = self.read_struct(STRING_LENGTH).await?;
        Ok(text.into_inner())
    }

    /// Reads exactly `len` bytes and decodes them as `T`.
    pub async fn read_struct<T: DeserializeOwned>(&mut self, len: usize) -> Result<T, ProtocolError> {
        let mut buffer = vec![0u8; len];
        with_deadline(self.timeout, self.inner.read_exact(&mut buffer)).await?;
        decode(&buffer)
    }

    /// Reads the body that follows `opcode`.
    pub async fn read_body<T: DeserializeOwned>(&mut self, opcode: OpCode) -> Result<T, ProtocolError> {
        self.read_struct(opcode.payload_len()).await
    }

    /// Reads and discards the body that follows `opcode`.
    pub async fn skip_body(&mut self, opcode: OpCode) -> Result<(), ProtocolError> {
        let mut buffer = vec![0u8; opcode.payload_len()];
        with_deadline(self.timeout, self.inner.read_exact(&mut buffer)).await?;
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes whole packets to the outbound half of a connection.
pub struct PacketWriter<W> {
    inner: W,
    timeout: Duration,
}

impl<W: AsyncWrite + Unpin> PacketWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_timeout(inner, IO_TIMEOUT)
    }

    pub fn with_timeout(inner: W, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub async fn write_packet(&mut self, packet: &Packet) -> Result<(), ProtocolError> {
        with_deadline(self.timeout, self.inner.write_all(packet.bytes())).await
    }

    pub async fn flush(&mut self) -> Result<(), ProtocolError> {
        with_deadline(self.timeout, self.inner.flush()).await
    }

    pub async fn shutdown(&mut self) -> Result<(), ProtocolError> {
        with_deadline(self.timeout, self.inner.shutdown()).await
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
