//! Networking primitives.
//!
//! Every contract in this system (replication, pickup, throw) requires
//! reliable, per-connection-ordered delivery, so all traffic rides a
//! single TCP channel with length-prefixed JSON frames. Serialization is
//! explicit and versionable.

use anyhow::Context;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    sync::atomic::{AtomicU32, Ordering},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::{
    math::{Transform, Vec3},
    object::ObjectId,
};

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: u32 = 1;

static NEXT_CLIENT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl ClientId {
    pub fn new_unique() -> Self {
        ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// High-level message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NetMsg {
    // ─── Connection handshake ───
    Hello {
        protocol: u32,
    },
    Welcome {
        client_id: ClientId,
    },

    // ─── Object replication (server -> all) ───
    /// Server introduces a pickupable object and its initial state.
    ObjectSpawn {
        id: ObjectId,
        transform: Transform,
        velocity: Vec3,
    },
    /// Periodic authoritative transform+velocity snapshot.
    ReplicateTransform {
        id: ObjectId,
        transform: Transform,
        velocity: Vec3,
    },
    /// Multicast: the object entered the held state, picked up by
    /// `client_id`.
    Pickup {
        id: ObjectId,
        client_id: ClientId,
    },
    /// Multicast: the object re-entered the world.
    Throw {
        id: ObjectId,
        position: Vec3,
        direction: Vec3,
        force: f32,
    },

    // ─── Interaction requests (client -> server) ───
    PickupRequest {
        client_id: ClientId,
        id: ObjectId,
    },
    ThrowRequest {
        client_id: ClientId,
        id: ObjectId,
        position: Vec3,
        direction: Vec3,
        force: f32,
    },

    // ─── Console/chat ───
    /// Server -> client: print message to console.
    ServerPrint {
        message: String,
    },
    /// Client -> server: console command (e.g., "say hello").
    ClientCommand {
        command: String,
    },

    // ─── Disconnect ───
    Disconnect {
        reason: String,
    },
}

/// Reliable connection over TCP with length-prefixed frames.
///
/// Incoming bytes accumulate in a persistent buffer and frames are
/// parsed out of it, so a receive future dropped mid-frame (timeout,
/// select) never loses stream bytes.
#[derive(Debug)]
pub struct ReliableConn {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl ReliableConn {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
        }
    }

    pub async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(msg).context("serialize msg")?;
        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(&payload);
        self.stream.write_all(&buf).await.context("tcp write")?;
        Ok(())
    }

    pub async fn recv(&mut self) -> anyhow::Result<NetMsg> {
        loop {
            if let Some(msg) = self.decode_frame()? {
                return Ok(msg);
            }
            let n = self
                .stream
                .read_buf(&mut self.read_buf)
                .await
                .context("tcp read")?;
            if n == 0 {
                anyhow::bail!("connection closed");
            }
        }
    }

    /// Parses one complete frame out of the read buffer, if present.
    fn decode_frame(&mut self) -> anyhow::Result<Option<NetMsg>> {
        if self.read_buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]) as usize;
        if self.read_buf.len() < 4 + len {
            return Ok(None);
        }
        self.read_buf.advance(4);
        let payload = self.read_buf.split_to(len);
        let msg = serde_json::from_slice(&payload).context("deserialize msg")?;
        Ok(Some(msg))
    }

    /// Receives a frame within the given timeout; `None` on timeout.
    /// Bytes already received stay buffered for the next call.
    pub async fn recv_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Option<NetMsg>> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Ok(msg)) => Ok(Some(msg)),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    pub fn peer_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

/// TCP server listener.
pub struct ReliableListener {
    listener: TcpListener,
}

impl ReliableListener {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> anyhow::Result<(ReliableConn, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await.context("tcp accept")?;
        Ok((ReliableConn::new(stream), addr))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Convenience codec helpers.
pub fn encode_to_bytes(msg: &NetMsg) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<NetMsg> {
    serde_json::from_slice(b).context("deserialize")
}
