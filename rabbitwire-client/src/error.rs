//! Client error types.

use crate::config::ConfigError;
use crate::socket::AddressFamily;
use rabbitwire_protocol::ProtocolError;
use std::time::Duration;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    #[error("connection to {endpoint} over {family} failed: {source}")]
    ConnectFailure {
        endpoint: String,
        family: AddressFamily,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
}

impl ClientError {
    /// Returns whether a fresh connection attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) => true,
            ClientError::ConnectFailure { .. } => true,
            ClientError::ConnectTimeout { .. } => true,
            ClientError::ReadTimeout(_) | ClientError::WriteTimeout(_) => true,
            ClientError::ConnectionClosed => true,
            _ => false,
        }
    }

    /// Returns whether this is one of the timeout errors.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectTimeout { .. }
                | ClientError::ReadTimeout(_)
                | ClientError::WriteTimeout(_)
        )
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            e if e.is_eof() => ClientError::ConnectionClosed,
            ProtocolError::Io(e) => ClientError::Io(e),
            e => ClientError::Protocol(e),
        }
    }
}
