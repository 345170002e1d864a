//! A small framed, length-prefixed wire protocol over TCP.
//!
//! Unlike a request/response RPC, a [`FramedStream`] stays open across many
//! messages in either direction -- this is what the controller/agent work
//! protocol needs: one handshake frame, then an unbounded number of
//! `ScrapeInstruction`/`Data`/`ConfigUpdate`/`Shutdown` frames interleaved
//! over the lifetime of the connection.

pub mod retry_strategy;

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, ToSocketAddrs},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024 * 1024; // 1GB, generous upper bound for a page body

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize/deserialize frame")]
    Serialization(#[from] bincode::Error),

    #[error("frame body of {0} bytes exceeds the maximum of {MAX_BODY_SIZE_BYTES}")]
    BodyTooLarge(usize),

    #[error("connection timed out")]
    ConnectionTimeout,

    #[error("recv timed out")]
    RecvTimeout,

    #[error("peer closed the stream")]
    Closed,
}

#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Header {
    body_size: u64,
}

/// A persistent, duplex, length-prefixed frame stream.
///
/// `send`/`recv` may be interleaved in any order by the caller; the stream
/// itself does not enforce alternation, that's a property of the protocol
/// built on top (see `agent`'s work protocol state machine).
pub struct FramedStream {
    stream: TcpStream,
}

impl FramedStream {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::connect_with_timeout(addr, Duration::from_secs(30)).await
    }

    pub async fn connect_with_timeout(
        addr: impl ToSocketAddrs,
        timeout: Duration,
    ) -> Result<Self> {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(stream) => Ok(Self { stream: stream? }),
            Err(_) => Err(Error::ConnectionTimeout),
        }
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let bytes = bincode::serialize(msg)?;
        if bytes.len() > MAX_BODY_SIZE_BYTES {
            return Err(Error::BodyTooLarge(bytes.len()));
        }

        let header = Header {
            body_size: bytes.len() as u64,
        };

        self.stream.write_all(bytemuck::bytes_of(&header)).await?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;

        Ok(())
    }

    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        let mut header_buf = [0u8; std::mem::size_of::<Header>()];
        self.read_exact_or_closed(&mut header_buf).await?;
        let header: Header = *bytemuck::from_bytes(&header_buf);

        let body_size = header.body_size as usize;
        if body_size > MAX_BODY_SIZE_BYTES {
            return Err(Error::BodyTooLarge(body_size));
        }

        let mut buf = vec![0u8; body_size];
        self.read_exact_or_closed(&mut buf).await?;

        Ok(bincode::deserialize(&buf)?)
    }

    pub async fn recv_with_timeout<T: DeserializeOwned>(
        &mut self,
        timeout: Duration,
    ) -> Result<T> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(res) => res,
            Err(_) => Err(Error::RecvTimeout),
        }
    }

    async fn read_exact_or_closed(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        match self.stream.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::Closed),
            Err(e) => Err(e.into()),
        }
    }

    pub fn peer_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

pub struct FramedListener {
    listener: TcpListener,
}

impl FramedListener {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
        })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn accept(&self) -> Result<FramedStream> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::debug!(%peer, "accepted connection");
        Ok(FramedStream { stream })
    }
}
