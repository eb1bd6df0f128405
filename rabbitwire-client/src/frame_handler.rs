//! Frame-level transport to a broker.
//!
//! A [`FrameHandler`] owns one connected transport and exposes it as a
//! sequence of frames. Reads and writes take independent locks, so one task
//! can sit in [`FrameHandler::read_frame`] while others write. Any failed
//! read or write leaves the handler closed.

use crate::config::{duration_millis, ClientConfig, ConfigError, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
use crate::connector::{close_quietly, Connector};
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::socket::{AddressFamily, Socket, SocketFactory, TcpSocket};
use crate::stream::ClientStream;
use crate::timeout::timeout_after;
use crate::tls;
use rabbitwire_protocol::{Frame, ProtocolError, ProtocolHeader};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter, ReadHalf, WriteHalf};
use tokio::sync::{watch, Mutex};

/// Bound on shutting down the stream when closing.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type Reader<S> = BufReader<ReadHalf<ClientStream<S>>>;
type Writer<S> = BufWriter<WriteHalf<ClientStream<S>>>;

/// A connected, framed broker transport.
pub struct FrameHandler<S: Socket> {
    endpoint: Endpoint,
    socket: parking_lot::Mutex<S>,
    reader: Mutex<Option<Reader<S::Stream>>>,
    writer: Mutex<Option<Writer<S::Stream>>>,
    closed: parking_lot::Mutex<bool>,
    /// Flips to `true` once; wakes in-flight reads and writes.
    shutdown: watch::Sender<bool>,
    read_timeout_ms: AtomicU64,
    write_timeout_ms: AtomicU64,
    max_frame_size: u32,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
    is_tls: bool,
}

impl FrameHandler<TcpSocket> {
    /// Connects over TCP, trying IPv6 first when the host supports it.
    pub async fn connect(endpoint: Endpoint, config: &ClientConfig) -> Result<Self, ClientError> {
        let nodelay = config.nodelay;
        let factory = move |family: AddressFamily| -> io::Result<TcpSocket> {
            Ok(TcpSocket::new(family).with_nodelay(nodelay))
        };
        Self::open(endpoint, config, &factory).await
    }
}

impl<S: Socket> FrameHandler<S> {
    /// Connects a socket from `factory`, upgrades it to TLS if the endpoint
    /// asks for it, and wraps the stream in buffered halves.
    pub async fn open<F>(endpoint: Endpoint, config: &ClientConfig, factory: &F) -> Result<Self, ClientError>
    where
        F: SocketFactory<Socket = S>,
    {
        let mut socket = Connector::new(config).connect(&endpoint, factory).await?;
        let stream = tls::upgrade(&mut socket, &endpoint).await?;

        let is_tls = stream.is_tls();
        let local_addr = socket.local_addr();
        let peer_addr = socket.peer_addr();

        let (read_half, write_half) = tokio::io::split(stream);
        let reader = BufReader::with_capacity(
            config.read_buffer_size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE),
            read_half,
        );
        let writer = BufWriter::with_capacity(
            config.write_buffer_size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE),
            write_half,
        );
        let (shutdown, _) = watch::channel(false);

        tracing::debug!("Frame handler ready for {} (tls={})", endpoint, is_tls);

        Ok(Self {
            endpoint,
            socket: parking_lot::Mutex::new(socket),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            closed: parking_lot::Mutex::new(false),
            shutdown,
            read_timeout_ms: AtomicU64::new(config.read_timeout_ms),
            write_timeout_ms: AtomicU64::new(config.write_timeout_ms),
            max_frame_size: config.max_frame_size,
            local_addr,
            peer_addr,
            is_tls,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.load(Ordering::Relaxed))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms.load(Ordering::Relaxed))
    }

    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    pub fn is_tls(&self) -> bool {
        self.is_tls
    }

    /// Changes the per-frame read timeout.
    ///
    /// The socket's receive timeout follows along while it is connected.
    /// Timeouts under one millisecond are rejected.
    pub fn set_read_timeout(&self, timeout: Duration) -> Result<(), ClientError> {
        let millis = nonzero_millis("read_timeout", timeout)?;
        self.read_timeout_ms.store(millis, Ordering::Relaxed);

        let mut socket = self.socket.lock();
        if socket.is_connected() {
            if let Err(e) = socket.set_receive_timeout(timeout) {
                tracing::debug!("Ignoring receive timeout update failure: {}", e);
            }
        }
        Ok(())
    }

    /// Changes the bound on each write batch.
    pub fn set_write_timeout(&self, timeout: Duration) -> Result<(), ClientError> {
        let millis = nonzero_millis("write_timeout", timeout)?;
        self.write_timeout_ms.store(millis, Ordering::Relaxed);
        Ok(())
    }

    /// Writes the protocol header for the endpoint's version and flushes.
    pub async fn send_header(&self) -> Result<(), ClientError> {
        let header = ProtocolHeader::new(self.endpoint.protocol());
        let limit = self.write_timeout();

        self.guarded(async {
            let mut guard = self.writer.lock().await;
            let writer = guard.as_mut().ok_or(ClientError::ConnectionClosed)?;

            timeout_after(
                async {
                    writer.write_all(header.as_bytes()).await?;
                    writer.flush().await
                },
                limit,
                || ClientError::WriteTimeout(limit),
            )
            .await??;

            tracing::debug!("Sent protocol header {}", self.endpoint.protocol());
            Ok(())
        })
        .await
    }

    /// Reads the next frame, waiting at most the read timeout for it.
    pub async fn read_frame(&self) -> Result<Frame, ClientError> {
        let limit = self.read_timeout();
        let max_size = self.max_frame_size;

        self.guarded(async {
            let mut guard = self.reader.lock().await;
            let reader = guard.as_mut().ok_or(ClientError::ConnectionClosed)?;

            let frame = timeout_after(Frame::read_from(reader, max_size), limit, || {
                ClientError::ReadTimeout(limit)
            })
            .await??;
            Ok(frame)
        })
        .await
    }

    pub async fn write_frame(&self, frame: &Frame) -> Result<(), ClientError> {
        self.write_frames(std::slice::from_ref(frame)).await
    }

    /// Writes `frames` in order and flushes once at the end.
    ///
    /// The whole batch shares one write timeout. An oversized frame rejects
    /// the batch before anything is written and leaves the handler open.
    pub async fn write_frames(&self, frames: &[Frame]) -> Result<(), ClientError> {
        let max_size = self.max_frame_size;
        for frame in frames {
            frame.check_size(max_size).map_err(ClientError::Protocol)?;
        }

        let limit = self.write_timeout();

        self.guarded(async {
            let mut guard = self.writer.lock().await;
            let writer = guard.as_mut().ok_or(ClientError::ConnectionClosed)?;

            timeout_after(
                async {
                    for frame in frames {
                        frame.write_to(writer, max_size).await?;
                    }
                    writer.flush().await?;
                    Ok::<_, ProtocolError>(())
                },
                limit,
                || ClientError::WriteTimeout(limit),
            )
            .await??;
            Ok(())
        })
        .await
    }

    /// Flushes anything still buffered for writing.
    pub async fn flush(&self) -> Result<(), ClientError> {
        let limit = self.write_timeout();

        self.guarded(async {
            let mut guard = self.writer.lock().await;
            let writer = guard.as_mut().ok_or(ClientError::ConnectionClosed)?;

            timeout_after(writer.flush(), limit, || ClientError::WriteTimeout(limit)).await??;
            Ok(())
        })
        .await
    }

    /// Closes the transport.
    ///
    /// The first call closes the socket and marks the handler closed;
    /// in-flight reads and writes return [`ClientError::ConnectionClosed`].
    /// Every call then releases whatever stream halves are still held, so a
    /// close that was cancelled midway is finished by the next one. Errors
    /// while closing are logged and dropped.
    pub async fn close(&self) {
        let first = {
            let mut closed = self.closed.lock();
            if *closed {
                false
            } else {
                close_quietly(&mut *self.socket.lock());
                self.shutdown.send_replace(true);
                *closed = true;
                true
            }
        };

        if first {
            tracing::debug!("Closing connection to {}", self.endpoint);
        }
        self.release_stream().await;
    }

    /// Shuts down and drops the stream halves.
    ///
    /// Bytes still buffered for writing may be the tail of an aborted frame
    /// and are discarded, not flushed.
    async fn release_stream(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let result = timeout_after(writer.get_mut().shutdown(), CLOSE_TIMEOUT, || {
                io::Error::from(io::ErrorKind::TimedOut)
            })
            .await;
            if let Err(e) = result.and_then(|r| r) {
                tracing::debug!("Ignoring error while shutting down writer: {}", e);
            }
        }
        self.reader.lock().await.take();
    }

    /// Runs `op` unless the handler is closed, aborting it if a close
    /// arrives meanwhile. A failed `op` closes the handler.
    async fn guarded<T, F>(&self, op: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        if self.is_closed() {
            return Err(ClientError::ConnectionClosed);
        }

        let mut signal = self.shutdown.subscribe();
        let result = tokio::select! {
            biased;
            _ = closed_signal(&mut signal) => Err(ClientError::ConnectionClosed),
            result = op => result,
        };

        if let Err(ref e) = result {
            if !self.is_closed() {
                tracing::debug!("Transport to {} failed: {}", self.endpoint, e);
                self.close().await;
            }
        }
        result
    }
}

fn nonzero_millis(name: &str, timeout: Duration) -> Result<u64, ClientError> {
    match duration_millis(timeout) {
        0 => Err(ClientError::Config(ConfigError::ValidationError(format!(
            "{} must be at least 1ms",
            name
        )))),
        millis => Ok(millis),
    }
}

/// Resolves once the close signal has been raised.
async fn closed_signal(signal: &mut watch::Receiver<bool>) {
    while !*signal.borrow_and_update() {
        if signal.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::mock::{Behavior, MockNetwork, MockSocket};
    use bytes::{BufMut, BytesMut};
    use rabbitwire_protocol::{ProtocolVersion, FRAME_END};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, DuplexStream};

    async fn open_with(
        endpoint: Endpoint,
        config: ClientConfig,
    ) -> (FrameHandler<MockSocket>, Arc<MockNetwork>, DuplexStream) {
        let network = MockNetwork::new(Behavior::Succeed, Behavior::Succeed);
        let handler = FrameHandler::open(endpoint, &config, &network.factory())
            .await
            .unwrap();
        let peer = network.take_peer();
        (handler, network, peer)
    }

    async fn open_mock() -> (FrameHandler<MockSocket>, Arc<MockNetwork>, DuplexStream) {
        open_with(Endpoint::new("broker.test", 5672).unwrap(), ClientConfig::new()).await
    }

    fn raw_frame(frame_type: u8, channel: u16, payload: &[u8], end: u8) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(frame_type);
        buf.put_u16(channel);
        buf.put_u32(payload.len() as u32);
        buf.put_slice(payload);
        buf.put_u8(end);
        buf.to_vec()
    }

    #[tokio::test]
    async fn test_metadata() {
        let (handler, _network, _peer) = open_mock().await;
        assert_eq!(handler.endpoint().host(), "broker.test");
        assert_eq!(handler.read_timeout(), Duration::from_secs(30));
        assert_eq!(handler.write_timeout(), Duration::from_secs(30));
        assert!(!handler.is_tls());
        assert!(!handler.is_closed());
        assert!(handler.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_send_header_current_protocol() {
        let (handler, _network, mut peer) = open_mock().await;
        handler.send_header().await.unwrap();

        let mut buf = [0u8; 8];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"AMQP\x00\x00\x09\x01");
    }

    #[tokio::test]
    async fn test_send_header_legacy_protocol() {
        let endpoint = Endpoint::new("broker.test", 5672)
            .unwrap()
            .with_protocol(ProtocolVersion::AMQP_0_8);
        let (handler, _network, mut peer) = open_with(endpoint, ClientConfig::new()).await;
        handler.send_header().await.unwrap();

        let mut buf = [0u8; 8];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, &[b'A', b'M', b'Q', b'P', 1, 1, 8, 0]);
    }

    #[tokio::test]
    async fn test_write_and_read_frame() {
        let (handler, _network, mut peer) = open_mock().await;

        handler
            .write_frame(&Frame::new(Frame::METHOD, 0, &b"\x00\x0a\x00\x0b"[..]))
            .await
            .unwrap();
        let mut buf = [0u8; 12];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf.to_vec(), raw_frame(1, 0, b"\x00\x0a\x00\x0b", FRAME_END));

        peer.write_all(&raw_frame(3, 7, b"hello", FRAME_END))
            .await
            .unwrap();
        let frame = handler.read_frame().await.unwrap();
        assert_eq!(frame.frame_type, Frame::BODY);
        assert_eq!(frame.channel, 7);
        assert_eq!(&frame.payload[..], b"hello");
    }

    #[tokio::test]
    async fn test_heartbeat_frame() {
        let (handler, _network, mut peer) = open_mock().await;
        peer.write_all(&raw_frame(8, 0, b"", FRAME_END)).await.unwrap();

        let frame = handler.read_frame().await.unwrap();
        assert!(frame.is_heartbeat());
        assert!(frame.payload.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_end_marker_closes() {
        let (handler, network, mut peer) = open_mock().await;
        peer.write_all(&raw_frame(1, 0, b"abc", 0x00)).await.unwrap();

        match handler.read_frame().await {
            Err(ClientError::Protocol(ProtocolError::InvalidFrameEnd { expected, actual })) => {
                assert_eq!(expected, 0xCE);
                assert_eq!(actual, 0x00);
            }
            other => panic!("unexpected result: {:?}", other.map(|f| f.frame_type)),
        }
        assert!(handler.is_closed());
        assert_eq!(network.close_count(), 1);
    }

    #[tokio::test]
    async fn test_broker_rejects_version() {
        let (handler, _network, mut peer) = open_mock().await;
        peer.write_all(b"AMQP\x00\x00\x09\x01").await.unwrap();

        match handler.read_frame().await {
            Err(ClientError::Protocol(ProtocolError::VersionMismatch(version))) => {
                assert_eq!(version, ProtocolVersion::AMQP_0_9_1);
            }
            other => panic!("unexpected result: {:?}", other.map(|f| f.frame_type)),
        }
    }

    #[tokio::test]
    async fn test_oversized_read_rejected() {
        let config = ClientConfig::new().with_max_frame_size(4);
        let (handler, _network, mut peer) =
            open_with(Endpoint::new("broker.test", 5672).unwrap(), config).await;
        peer.write_all(&raw_frame(3, 1, b"too long", FRAME_END))
            .await
            .unwrap();

        let result = handler.read_frame().await;
        assert!(matches!(
            result,
            Err(ClientError::Protocol(ProtocolError::FrameTooLarge { size: 8, max: 4 }))
        ));
    }

    #[tokio::test]
    async fn test_oversized_write_rejected_before_sending() {
        let config = ClientConfig::new().with_max_frame_size(4);
        let (handler, network, _peer) =
            open_with(Endpoint::new("broker.test", 5672).unwrap(), config).await;

        let frames = [
            Frame::new(Frame::BODY, 1, &b"ok"[..]),
            Frame::new(Frame::BODY, 1, &b"too long"[..]),
        ];
        let result = handler.write_frames(&frames).await;
        assert!(matches!(
            result,
            Err(ClientError::Protocol(ProtocolError::FrameTooLarge { size: 8, max: 4 }))
        ));
        assert!(!handler.is_closed());
        assert_eq!(network.flush_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_flushes_once_in_order() {
        let (handler, network, mut peer) = open_mock().await;
        let frames: Vec<Frame> = (1..=3u16)
            .map(|ch| Frame::new(Frame::BODY, ch, vec![ch as u8; ch as usize]))
            .collect();

        let before = network.flush_count();
        handler.write_frames(&frames).await.unwrap();
        assert_eq!(network.flush_count() - before, 1);

        let mut expected = Vec::new();
        for frame in &frames {
            expected.extend_from_slice(&frame.encode().unwrap());
        }
        let mut buf = vec![0u8; expected.len()];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, expected);
    }

    #[tokio::test]
    async fn test_peer_eof_is_connection_closed() {
        let (handler, _network, peer) = open_mock().await;
        drop(peer);

        let result = handler.read_frame().await;
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
        assert!(handler.is_closed());
    }

    #[tokio::test]
    async fn test_read_timeout_closes_handler() {
        let config = ClientConfig::new().with_read_timeout(Duration::from_millis(50));
        let (handler, network, _peer) =
            open_with(Endpoint::new("broker.test", 5672).unwrap(), config).await;

        let result = handler.read_frame().await;
        match result {
            Err(ClientError::ReadTimeout(limit)) => assert_eq!(limit, Duration::from_millis(50)),
            other => panic!("unexpected result: {:?}", other.map(|f| f.frame_type)),
        }
        assert!(handler.is_closed());
        assert_eq!(network.close_count(), 1);

        let result = handler.read_frame().await;
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_close_interrupts_blocked_read() {
        let (handler, _network, _peer) = open_mock().await;
        let handler = Arc::new(handler);

        let reader = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.read_frame().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        handler.close().await;

        let result = reader.await.unwrap();
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_concurrent_close_closes_socket_once() {
        let (handler, network, _peer) = open_mock().await;
        let handler = Arc::new(handler);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let handler = handler.clone();
            tasks.push(tokio::spawn(async move { handler.close().await }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(handler.is_closed());
        assert_eq!(network.close_count(), 1);
    }

    #[tokio::test]
    async fn test_operations_after_close() {
        let (handler, network, mut peer) = open_mock().await;
        handler.close().await;
        handler.close().await;
        assert_eq!(network.close_count(), 1);

        assert!(matches!(
            handler.send_header().await,
            Err(ClientError::ConnectionClosed)
        ));
        assert!(matches!(
            handler.write_frame(&Frame::heartbeat()).await,
            Err(ClientError::ConnectionClosed)
        ));
        assert!(matches!(
            handler.flush().await,
            Err(ClientError::ConnectionClosed)
        ));
        assert!(matches!(
            handler.read_frame().await,
            Err(ClientError::ConnectionClosed)
        ));

        // The writer was shut down, so the broker sees EOF.
        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_timeouts() {
        let (handler, _network, _peer) = open_mock().await;

        handler.set_read_timeout(Duration::from_millis(750)).unwrap();
        assert_eq!(handler.read_timeout(), Duration::from_millis(750));
        assert_eq!(
            handler.socket.lock().receive_timeout(),
            Some(Duration::from_millis(750))
        );

        handler.set_write_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(handler.write_timeout(), Duration::from_secs(2));

        handler.close().await;
        handler.set_read_timeout(Duration::from_millis(5)).unwrap();
        assert_eq!(handler.read_timeout(), Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_zero_timeouts_rejected() {
        let (handler, _network, _peer) = open_mock().await;

        let result = handler.set_read_timeout(Duration::ZERO);
        assert!(matches!(result, Err(ClientError::Config(_))));
        let result = handler.set_write_timeout(Duration::from_micros(500));
        assert!(matches!(result, Err(ClientError::Config(_))));

        assert_eq!(handler.read_timeout(), Duration::from_secs(30));
        assert_eq!(handler.write_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_huge_timeout_saturates() {
        let (handler, _network, _peer) = open_mock().await;
        handler.set_write_timeout(Duration::MAX).unwrap();
        assert_eq!(handler.write_timeout(), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn test_stalled_peer_write_timeout() {
        let config = ClientConfig::new().with_write_timeout(Duration::from_millis(300));
        let (handler, network, _peer) =
            open_with(Endpoint::new("broker.test", 5672).unwrap(), config).await;

        // Far more than the 64 KiB the broker side buffers without reading.
        let frames: Vec<Frame> = (0..10)
            .map(|_| Frame::new(Frame::BODY, 1, vec![0u8; 16 * 1024]))
            .collect();

        let start = std::time::Instant::now();
        let result = handler.write_frames(&frames).await;
        let elapsed = start.elapsed();

        match result {
            Err(ClientError::WriteTimeout(limit)) => assert_eq!(limit, Duration::from_millis(300)),
            other => panic!("unexpected result: {:?}", other),
        }
        // Closing discards the stalled buffer instead of waiting on it again.
        assert!(elapsed < Duration::from_millis(550), "took {:?}", elapsed);
        assert!(handler.is_closed());
        assert_eq!(network.close_count(), 1);
    }

    #[tokio::test]
    async fn test_write_not_blocked_by_pending_read() {
        let (handler, _network, mut peer) = open_mock().await;
        let handler = Arc::new(handler);

        let reader = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.read_frame().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let write = tokio::time::timeout(
            Duration::from_secs(1),
            handler.write_frame(&Frame::heartbeat()),
        )
        .await;
        assert!(matches!(write, Ok(Ok(()))));

        let mut buf = [0u8; 8];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [8, 0, 0, 0, 0, 0, 0, 0xCE]);

        // Answer the pending read so it completes normally.
        peer.write_all(&buf).await.unwrap();
        let frame = reader.await.unwrap().unwrap();
        assert!(frame.is_heartbeat());
    }

    #[tokio::test]
    async fn test_interrupted_close_finished_by_next_close() {
        let (handler, network, mut peer) = open_mock().await;

        // Hold the writer so the first close stalls after marking the handler closed.
        let held = handler.writer.lock().await;
        let first = tokio::time::timeout(Duration::from_millis(20), handler.close()).await;
        assert!(first.is_err());
        assert!(handler.is_closed());
        assert_eq!(network.close_count(), 1);
        drop(held);

        handler.close().await;
        assert_eq!(network.close_count(), 1);
        assert!(handler.writer.lock().await.is_none());
        assert!(handler.reader.lock().await.is_none());

        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
    }
}
