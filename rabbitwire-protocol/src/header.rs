//! Protocol header sent once at the start of a connection.
//!
//! ```text
//! +--------+------+-------+-------+----------+
//! | "AMQP" | 0x00 | major | minor | revision |   revision != 0
//! +--------+------+-------+-------+----------+
//! | "AMQP" | 0x01 | 0x01  | major | minor    |   revision == 0 (legacy)
//! +--------+------+-------+-------+----------+
//! ```

use crate::error::ProtocolError;
use std::fmt;

/// Literal protocol tag that opens every connection.
pub const PROTOCOL_TAG: [u8; 4] = *b"AMQP";

/// Protocol version triple announced by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
}

impl ProtocolVersion {
    /// AMQP 0-9-1, the version spoken by current brokers.
    pub const AMQP_0_9_1: ProtocolVersion = ProtocolVersion::new(0, 9, 1);

    /// AMQP 0-8, announced with the legacy header layout.
    pub const AMQP_0_8: ProtocolVersion = ProtocolVersion::new(8, 0, 0);

    pub const fn new(major: u8, minor: u8, revision: u8) -> Self {
        Self {
            major,
            minor,
            revision,
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::AMQP_0_9_1
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.major, self.minor, self.revision)
    }
}

/// The 8-byte connection preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolHeader {
    bytes: [u8; 8],
}

impl ProtocolHeader {
    /// Size of the header on the wire.
    pub const SIZE: usize = 8;

    /// Builds the header for a protocol version.
    pub fn new(version: ProtocolVersion) -> Self {
        let tail = if version.revision != 0 {
            [0, version.major, version.minor, version.revision]
        } else {
            [1, 1, version.major, version.minor]
        };

        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&PROTOCOL_TAG);
        bytes[4..].copy_from_slice(&tail);
        Self { bytes }
    }

    /// Parses a header received from a peer.
    ///
    /// Brokers answer an unsupported header with their own and close the
    /// socket, so this is how a version mismatch is reported.
    pub fn parse(bytes: [u8; 8]) -> Result<Self, ProtocolError> {
        if bytes[..4] != PROTOCOL_TAG || bytes[4] > 1 {
            return Err(ProtocolError::InvalidHeader(bytes));
        }
        Ok(Self { bytes })
    }

    /// Returns the announced version.
    pub fn version(&self) -> ProtocolVersion {
        match self.bytes[4] {
            0 => ProtocolVersion::new(self.bytes[5], self.bytes[6], self.bytes[7]),
            _ => ProtocolVersion::new(self.bytes[6], self.bytes[7], 0),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.bytes
    }
}
