//! Dual-stack connection establishment.

use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::socket::{ipv6_supported, AddressFamily, Socket, SocketFactory};
use crate::timeout::{bounded_wait, Bounded};
use std::time::Duration;

/// What to do when a connect step fails with a connection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Discard the attempt and move on to the next step.
    TryNext,
    /// Propagate the error.
    Fatal,
}

/// One entry of the connect strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectStep {
    pub family: AddressFamily,
    pub on_failure: OnFailure,
}

/// Obtains a connected socket for an endpoint.
#[derive(Debug, Clone)]
pub struct Connector {
    connect_timeout: Duration,
    read_timeout: Duration,
    use_ipv6: bool,
}

impl Connector {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            use_ipv6: config.prefer_ipv6 && ipv6_supported(),
        }
    }

    /// Overrides host IPv6 detection.
    pub fn with_ipv6(mut self, enabled: bool) -> Self {
        self.use_ipv6 = enabled;
        self
    }

    /// Ordered address families to try. Only the last step is fatal.
    pub fn strategy(&self) -> Vec<ConnectStep> {
        let mut steps = Vec::with_capacity(2);
        if self.use_ipv6 {
            steps.push(ConnectStep {
                family: AddressFamily::V6,
                on_failure: OnFailure::TryNext,
            });
        }
        steps.push(ConnectStep {
            family: AddressFamily::V4,
            on_failure: OnFailure::Fatal,
        });
        steps
    }

    /// Connects following [`Connector::strategy`].
    ///
    /// Connection failures on a `TryNext` step fall through to the next
    /// family. A timeout is never retried: the socket is closed and
    /// [`ClientError::ConnectTimeout`] returned at once.
    pub async fn connect<F>(&self, endpoint: &Endpoint, factory: &F) -> Result<F::Socket, ClientError>
    where
        F: SocketFactory,
    {
        let mut last_error = None;

        for step in self.strategy() {
            match self.attempt(endpoint, factory, step.family).await {
                Ok(socket) => return self.configure(socket),
                Err(e @ ClientError::ConnectFailure { .. })
                    if step.on_failure == OnFailure::TryNext =>
                {
                    tracing::debug!("{}, trying next address family", e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ClientError::InvalidEndpoint(format!("no address family to reach {}", endpoint))
        }))
    }

    async fn attempt<F>(
        &self,
        endpoint: &Endpoint,
        factory: &F,
        family: AddressFamily,
    ) -> Result<F::Socket, ClientError>
    where
        F: SocketFactory,
    {
        tracing::debug!("Connecting to {} over {}...", endpoint, family);

        let mut socket = factory
            .create(family)
            .map_err(|source| ClientError::ConnectFailure {
                endpoint: endpoint.to_string(),
                family,
                source,
            })?;

        let outcome = bounded_wait(
            socket.connect(endpoint.host(), endpoint.port()),
            self.connect_timeout,
            || tracing::debug!("Connection to {} timed out", endpoint),
        )
        .await;

        match outcome {
            Bounded::Completed(Ok(())) => Ok(socket),
            Bounded::Completed(Err(source)) => {
                close_quietly(&mut socket);
                Err(ClientError::ConnectFailure {
                    endpoint: endpoint.to_string(),
                    family,
                    source,
                })
            }
            Bounded::TimedOut => {
                close_quietly(&mut socket);
                Err(ClientError::ConnectTimeout {
                    endpoint: endpoint.to_string(),
                    timeout: self.connect_timeout,
                })
            }
        }
    }

    fn configure<S: Socket>(&self, mut socket: S) -> Result<S, ClientError> {
        if let Err(e) = socket.set_receive_timeout(self.read_timeout) {
            close_quietly(&mut socket);
            return Err(ClientError::Io(e));
        }
        tracing::debug!(
            "TCP connected (local={:?}, peer={:?})",
            socket.local_addr(),
            socket.peer_addr()
        );
        Ok(socket)
    }
}

/// Closes a socket that is being abandoned; errors are only logged.
pub(crate) fn close_quietly<S: Socket>(socket: &mut S) {
    if let Err(e) = socket.close() {
        tracing::debug!("Ignoring error while closing socket: {}", e);
    }
}
