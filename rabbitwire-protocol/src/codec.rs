//! Big-endian (network order) codec over async byte streams.
//!
//! Every multi-byte value on the wire is most-significant byte first, whatever
//! the host's native order. Reads fill the whole width or fail with
//! [`std::io::ErrorKind::UnexpectedEof`]; a short read from the transport is
//! retried until the value is complete.

use bytes::{Bytes, BytesMut};
use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest step by which [`NetworkRead::read_bytes`] grows its buffer.
pub const READ_CHUNK: usize = 64 * 1024;

/// Reads network-order values from an async stream.
pub trait NetworkRead: AsyncRead + Unpin + Send {
    /// Reads exactly `N` bytes.
    fn read_array<const N: usize>(&mut self) -> impl Future<Output = io::Result<[u8; N]>> + Send {
        async move {
            let mut buf = [0u8; N];
            self.read_exact(&mut buf).await?;
            Ok(buf)
        }
    }

    /// Reads exactly `len` bytes into a fresh buffer.
    ///
    /// The buffer grows by at most [`READ_CHUNK`] ahead of the bytes received,
    /// so a large declared length costs nothing until the data arrives.
    fn read_bytes(&mut self, len: usize) -> impl Future<Output = io::Result<Bytes>> + Send {
        async move {
            let mut buf = BytesMut::with_capacity(len.min(READ_CHUNK));
            while buf.len() < len {
                let filled = buf.len();
                buf.resize(filled + (len - filled).min(READ_CHUNK), 0);
                self.read_exact(&mut buf[filled..]).await?;
            }
            Ok(buf.freeze())
        }
    }

    fn read_be_u8(&mut self) -> impl Future<Output = io::Result<u8>> + Send {
        async move { Ok(u8::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_i8(&mut self) -> impl Future<Output = io::Result<i8>> + Send {
        async move { Ok(i8::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_u16(&mut self) -> impl Future<Output = io::Result<u16>> + Send {
        async move { Ok(u16::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_i16(&mut self) -> impl Future<Output = io::Result<i16>> + Send {
        async move { Ok(i16::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_u32(&mut self) -> impl Future<Output = io::Result<u32>> + Send {
        async move { Ok(u32::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_i32(&mut self) -> impl Future<Output = io::Result<i32>> + Send {
        async move { Ok(i32::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_u64(&mut self) -> impl Future<Output = io::Result<u64>> + Send {
        async move { Ok(u64::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_i64(&mut self) -> impl Future<Output = io::Result<i64>> + Send {
        async move { Ok(i64::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_f32(&mut self) -> impl Future<Output = io::Result<f32>> + Send {
        async move { Ok(f32::from_be_bytes(self.read_array().await?)) }
    }

    fn read_be_f64(&mut self) -> impl Future<Output = io::Result<f64>> + Send {
        async move { Ok(f64::from_be_bytes(self.read_array().await?)) }
    }
}

impl<R: AsyncRead + Unpin + Send + ?Sized> NetworkRead for R {}

/// Writes network-order values to an async stream.
pub trait NetworkWrite: AsyncWrite + Unpin + Send {
    fn write_be_u8(&mut self, v: u8) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_i8(&mut self, v: i8) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_u16(&mut self, v: u16) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_i16(&mut self, v: i16) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_u32(&mut self, v: u32) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_i32(&mut self, v: i32) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_u64(&mut self, v: u64) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_i64(&mut self, v: i64) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_f32(&mut self, v: f32) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }

    fn write_be_f64(&mut self, v: f64) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.write_all(&v.to_be_bytes()).await }
    }
}

impl<W: AsyncWrite + Unpin + Send + ?Sized> NetworkWrite for W {}
