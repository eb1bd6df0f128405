//! Broker endpoint descriptor.

use crate::error::ClientError;
use rabbitwire_protocol::{ProtocolVersion, DEFAULT_PORT, DEFAULT_TLS_PORT};
use std::fmt;
use std::path::PathBuf;

/// TLS options for a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsClientConfig {
    /// Enable TLS for the connection.
    pub enabled: bool,
    /// Path to PEM-encoded CA certificate(s) for broker verification.
    /// If None, webpki roots are used.
    pub ca_cert_path: Option<PathBuf>,
    /// Path to PEM-encoded client certificate (for mTLS).
    pub client_cert_path: Option<PathBuf>,
    /// Path to PEM-encoded client private key (for mTLS).
    pub client_key_path: Option<PathBuf>,
    /// Skip broker certificate verification (INSECURE - development only).
    pub insecure: bool,
    /// Server name for SNI (defaults to the endpoint host).
    pub server_name: Option<String>,
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// TLS with default verification against webpki roots.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self.enabled = true;
        self
    }

    pub fn with_client_cert(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.client_cert_path = Some(cert_path.into());
        self.client_key_path = Some(key_path.into());
        self.enabled = true;
        self
    }

    pub fn with_insecure(mut self) -> Self {
        self.insecure = true;
        self.enabled = true;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

/// Address of a broker plus the protocol and TLS options used to reach it.
///
/// Built once per connection attempt; accessors only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    protocol: ProtocolVersion,
    tls: TlsClientConfig,
}

impl Endpoint {
    /// Creates a plain endpoint speaking AMQP 0-9-1.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ClientError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ClientError::InvalidEndpoint("empty host".to_string()));
        }
        if port == 0 {
            return Err(ClientError::InvalidEndpoint(format!(
                "port must be in 1..=65535 for host {}",
                host
            )));
        }
        Ok(Self {
            host,
            port,
            protocol: ProtocolVersion::default(),
            tls: TlsClientConfig::default(),
        })
    }

    /// Parses `amqp://host[:port]` or `amqps://host[:port]`.
    ///
    /// `amqps` turns TLS on and defaults the port to 5671. Anything after the
    /// authority (vhost, query) is ignored here.
    pub fn parse(uri: &str) -> Result<Self, ClientError> {
        let (rest, tls) = if let Some(rest) = uri.strip_prefix("amqps://") {
            (rest, true)
        } else if let Some(rest) = uri.strip_prefix("amqp://") {
            (rest, false)
        } else {
            return Err(ClientError::InvalidEndpoint(format!(
                "unsupported scheme in {}",
                uri
            )));
        };

        let authority = rest.split(['/', '?']).next().unwrap_or_default();
        // Credentials belong to the layer above.
        let authority = authority.rsplit('@').next().unwrap_or_default();
        let default_port = if tls { DEFAULT_TLS_PORT } else { DEFAULT_PORT };

        let (host, port) = split_host_port(authority, default_port)
            .ok_or_else(|| ClientError::InvalidEndpoint(format!("malformed authority in {}", uri)))?;

        let endpoint = Self::new(host, port)?;
        Ok(if tls {
            endpoint.with_tls(TlsClientConfig::enabled())
        } else {
            endpoint
        })
    }

    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_tls(mut self, tls: TlsClientConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    pub fn tls(&self) -> &TlsClientConfig {
        &self.tls
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn split_host_port(authority: &str, default_port: u16) -> Option<(&str, u16)> {
    if let Some(rest) = authority.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        return match tail.strip_prefix(':') {
            Some(port) => Some((host, port.parse().ok()?)),
            None if tail.is_empty() => Some((host, default_port)),
            None => None,
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => Some((host, port.parse().ok()?)),
        None => Some((authority, default_port)),
    }
}
