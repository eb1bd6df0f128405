//! Frame envelope.
//!
//! Frame layout (7 bytes header + payload + 1 byte end marker):
//!
//! ```text
//! +--------+---------+-------------+----------------+-----------+
//! | type   | channel | payload_len | payload        | frame_end |
//! | 1 byte | 2 bytes |   4 bytes   | payload_len    | 0xCE      |
//! +--------+---------+-------------+----------------+-----------+
//! ```

use crate::codec::{NetworkRead, NetworkWrite};
use crate::error::ProtocolError;
use crate::header::{ProtocolHeader, PROTOCOL_TAG};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Marker byte terminating every frame.
pub const FRAME_END: u8 = 0xCE;

/// Size of the fixed frame header in bytes (1+2+4 = 7).
pub const FRAME_HEADER_SIZE: usize = 7;

/// A single wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type tag.
    pub frame_type: u8,
    /// Channel number (0 is the connection itself).
    pub channel: u16,
    /// Frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Method frame type.
    pub const METHOD: u8 = 1;
    /// Content header frame type.
    pub const HEADER: u8 = 2;
    /// Content body frame type.
    pub const BODY: u8 = 3;
    /// Heartbeat frame type.
    pub const HEARTBEAT: u8 = 8;

    pub fn new(frame_type: u8, channel: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            channel,
            payload: payload.into(),
        }
    }

    /// Creates an empty heartbeat frame on channel 0.
    pub fn heartbeat() -> Self {
        Self::new(Self::HEARTBEAT, 0, Bytes::new())
    }

    pub fn is_heartbeat(&self) -> bool {
        self.frame_type == Self::HEARTBEAT
    }

    /// Total number of bytes this frame occupies on the wire.
    pub fn wire_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len() + 1
    }

    /// Returns the payload length if it fits within `max` (0 = unlimited).
    pub fn check_size(&self, max: u32) -> Result<u32, ProtocolError> {
        let size = u32::try_from(self.payload.len()).map_err(|_| ProtocolError::FrameTooLarge {
            size: u32::MAX,
            max,
        })?;
        if max != 0 && size > max {
            return Err(ProtocolError::FrameTooLarge { size, max });
        }
        Ok(size)
    }

    /// Encodes the frame into a contiguous buffer.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let payload_len = self.check_size(0)?;
        let mut buf = BytesMut::with_capacity(self.wire_len());

        buf.put_u8(self.frame_type);
        buf.put_u16(self.channel);
        buf.put_u32(payload_len);
        buf.put_slice(&self.payload);
        buf.put_u8(FRAME_END);

        Ok(buf)
    }

    /// Writes the frame to `writer` without flushing.
    ///
    /// A `max_size` of zero disables the payload size check.
    pub async fn write_to<W>(&self, writer: &mut W, max_size: u32) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let payload_len = self.check_size(max_size)?;

        writer.write_be_u8(self.frame_type).await?;
        writer.write_be_u16(self.channel).await?;
        writer.write_be_u32(payload_len).await?;
        writer.write_all(&self.payload).await?;
        writer.write_be_u8(FRAME_END).await?;
        Ok(())
    }

    /// Reads exactly one frame from `reader`.
    ///
    /// A `max_size` of zero disables the payload size check. If the peer
    /// answers with a protocol header instead of a frame, the offered version
    /// is reported as [`ProtocolError::VersionMismatch`].
    pub async fn read_from<R>(reader: &mut R, max_size: u32) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let frame_type = reader.read_be_u8().await?;

        if frame_type == PROTOCOL_TAG[0] {
            let rest: [u8; 7] = reader.read_array().await?;
            let mut bytes = [frame_type, 0, 0, 0, 0, 0, 0, 0];
            bytes[1..].copy_from_slice(&rest);
            let header = ProtocolHeader::parse(bytes)?;
            return Err(ProtocolError::VersionMismatch(header.version()));
        }

        let channel = reader.read_be_u16().await?;
        let payload_len = reader.read_be_u32().await?;

        if max_size != 0 && payload_len > max_size {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len,
                max: max_size,
            });
        }

        let payload = reader.read_bytes(payload_len as usize).await?;

        let end = reader.read_be_u8().await?;
        if end != FRAME_END {
            return Err(ProtocolError::InvalidFrameEnd {
                expected: FRAME_END,
                actual: end,
            });
        }

        Ok(Self {
            frame_type,
            channel,
            payload,
        })
    }
}
