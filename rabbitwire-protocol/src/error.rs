//! Protocol error types.

use crate::header::ProtocolVersion;
use thiserror::Error;

/// Errors raised while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid frame end marker: expected {expected:#04x}, got {actual:#04x}")]
    InvalidFrameEnd { expected: u8, actual: u8 },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("invalid protocol header: {0:02x?}")]
    InvalidHeader([u8; 8]),

    #[error("peer rejected the protocol header and offered version {0}")]
    VersionMismatch(ProtocolVersion),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns whether the underlying cause is an end-of-stream condition.
    pub fn is_eof(&self) -> bool {
        matches!(self, ProtocolError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidFrameEnd {
            expected: 0xCE,
            actual: 0x00,
        };
        let msg = err.to_string();
        assert!(msg.contains("0xce"));
        assert!(msg.contains("0x00"));

        let err = ProtocolError::FrameTooLarge { size: 100, max: 50 };
        assert!(err.to_string().contains("100"));

        let err = ProtocolError::InvalidHeader(*b"HTTP/1.1");
        assert!(err.to_string().contains("48"));

        let err = ProtocolError::VersionMismatch(ProtocolVersion::new(0, 9, 1));
        assert!(err.to_string().contains("0-9-1"));
    }

    #[test]
    fn test_is_eof() {
        let eof = ProtocolError::Io(std::io::ErrorKind::UnexpectedEof.into());
        assert!(eof.is_eof());

        let reset = ProtocolError::Io(std::io::ErrorKind::ConnectionReset.into());
        assert!(!reset.is_eof());
    }
}
