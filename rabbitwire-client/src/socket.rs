//! Transport handle abstraction.
//!
//! A [`Socket`] is whatever hands the client a connected duplex byte stream.
//! The client only connects it, configures its receive timeout, takes its
//! stream and closes it; everything platform-specific stays behind the trait.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// IP address family a socket is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn matches(&self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// A connectable transport handle.
pub trait Socket: Send + 'static {
    /// Byte stream produced once connected.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connects to `host:port`.
    fn connect(&mut self, host: &str, port: u16) -> impl Future<Output = io::Result<()>> + Send;

    fn is_connected(&self) -> bool;

    fn receive_timeout(&self) -> Option<Duration>;

    /// Sets the receive timeout. Fails if the socket is not connected.
    fn set_receive_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Hands out the connected stream. Can only succeed once.
    fn take_stream(&mut self) -> io::Result<Self::Stream>;

    fn local_addr(&self) -> Option<SocketAddr>;

    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Marks the socket closed and releases the stream if it is still held.
    ///
    /// Once [`Socket::take_stream`] has handed the stream out, the holder of
    /// the stream ends the connection by shutting it down and dropping it.
    fn close(&mut self) -> io::Result<()>;
}

/// Creates sockets for a given address family.
pub trait SocketFactory: Send + Sync {
    type Socket: Socket;

    fn create(&self, family: AddressFamily) -> io::Result<Self::Socket>;
}

impl<F, S> SocketFactory for F
where
    F: Fn(AddressFamily) -> io::Result<S> + Send + Sync,
    S: Socket,
{
    type Socket = S;

    fn create(&self, family: AddressFamily) -> io::Result<S> {
        self(family)
    }
}

/// Returns whether the host can open IPv6 sockets.
pub fn ipv6_supported() -> bool {
    static SUPPORTED: OnceLock<bool> = OnceLock::new();
    *SUPPORTED.get_or_init(|| std::net::UdpSocket::bind("[::1]:0").is_ok())
}

/// Tokio TCP socket bound to one address family.
#[derive(Debug)]
pub struct TcpSocket {
    family: AddressFamily,
    nodelay: bool,
    stream: Option<TcpStream>,
    connected: bool,
    receive_timeout: Option<Duration>,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
}

impl TcpSocket {
    pub fn new(family: AddressFamily) -> Self {
        Self {
            family,
            nodelay: true,
            stream: None,
            connected: false,
            receive_timeout: None,
            local_addr: None,
            peer_addr: None,
        }
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }
}

impl Socket for TcpSocket {
    type Stream = TcpStream;

    fn connect(&mut self, host: &str, port: u16) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            let family = self.family;
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
                .await?
                .filter(|addr| family.matches(addr))
                .collect();

            if addrs.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no {} address for {}", family, host),
                ));
            }

            let mut last_err = None;
            for addr in addrs {
                tracing::debug!("Trying {}", addr);
                match TcpStream::connect(addr).await {
                    Ok(stream) => {
                        if self.nodelay {
                            stream.set_nodelay(true).ok();
                        }
                        self.local_addr = stream.local_addr().ok();
                        self.peer_addr = stream.peer_addr().ok();
                        self.stream = Some(stream);
                        self.connected = true;
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::debug!("Connect to {} failed: {}", addr, e);
                        last_err = Some(e);
                    }
                }
            }

            Err(last_err.unwrap_or_else(|| io::ErrorKind::NotConnected.into()))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout
    }

    fn set_receive_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        if !self.connected {
            return Err(io::ErrorKind::NotConnected.into());
        }
        // Tokio streams have no SO_RCVTIMEO; the frame handler enforces it.
        self.receive_timeout = Some(timeout);
        Ok(())
    }

    fn take_stream(&mut self) -> io::Result<TcpStream> {
        self.stream
            .take()
            .ok_or_else(|| io::ErrorKind::NotConnected.into())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    fn close(&mut self) -> io::Result<()> {
        self.connected = false;
        // A taken stream is shut down by the frame handler's release step.
        self.stream.take();
        Ok(())
    }
}
