//! # rabbitwire-client
//!
//! Connection transport for AMQP 0-9-1 brokers.
//!
//! This crate provides:
//! - Dual-stack TCP connection establishment with IPv6 to IPv4 fallback
//! - Optional TLS upgrade through rustls
//! - A frame handler with independent read and write paths and bounded waits
//! - Layered configuration from YAML and environment variables

pub mod config;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod frame_handler;
pub mod socket;
pub mod stream;
pub mod timeout;
pub mod tls;

pub use config::{ClientConfig, ConfigError};
pub use connector::Connector;
pub use endpoint::{Endpoint, TlsClientConfig};
pub use error::ClientError;
pub use frame_handler::FrameHandler;
pub use socket::{AddressFamily, Socket, SocketFactory, TcpSocket};
pub use stream::ClientStream;
