//! # rabbitwire-protocol
//!
//! Wire-level framing for the AMQP 0-9-1 family of broker protocols.
//!
//! This crate provides:
//! - Big-endian integer and float codec over async byte streams
//! - Frame envelope encoding and decoding with end-marker validation
//! - The protocol header sent once at the start of a connection
//! - Protocol error types and wire constants

pub mod codec;
pub mod error;
pub mod frame;
pub mod header;

pub use codec::{NetworkRead, NetworkWrite};
pub use error::ProtocolError;
pub use frame::{Frame, FRAME_END, FRAME_HEADER_SIZE};
pub use header::{ProtocolHeader, ProtocolVersion, PROTOCOL_TAG};

/// Default port for plain connections.
pub const DEFAULT_PORT: u16 = 5672;

/// Default port for TLS connections.
pub const DEFAULT_TLS_PORT: u16 = 5671;

/// Default maximum frame payload size (128 KiB), the usual negotiated `frame_max`.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 128 * 1024;
