//! Networking primitives.
//!
//! Goals:
//! - Provide an unordered, unreliable datagram channel between two peers.
//! - Provide the replication message type and decode it once at the boundary.
//! - Keep serialization explicit (JSON datagrams).
//!
//! There is no delivery, ordering or integrity guarantee. Callers treat every
//! datagram as optional.

use std::{
    fmt,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::{
    net::{lookup_host, UdpSocket},
    sync::mpsc,
};
use tracing::debug;

use crate::{
    link::LinkError,
    math::{Quat, Vec3},
};

/// Largest datagram we expect to receive.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Canonical machine identity: trimmed and uppercased so both peers compare
/// the same strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    pub fn new(raw: &str) -> Self {
        PeerIdentity(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if a raw wire `sender` names this identity.
    pub fn matches(&self, sender: &str) -> bool {
        sender.trim().to_uppercase() == self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transform replication payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerUpdate {
    pub sender: String,
    pub pos: Vec3,
    pub quat: Quat,
}

/// Message envelope, tagged by `action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action")]
pub enum PeerMsg {
    #[serde(rename = "updatePlayer")]
    UpdatePlayer(PlayerUpdate),
    /// Any action this build does not know. Carries no fields.
    #[serde(other)]
    Unrecognized,
}

pub fn encode_to_bytes(msg: &PeerMsg) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<PeerMsg> {
    serde_json::from_slice(b).context("deserialize")
}

/// A bidirectional unreliable datagram channel to exactly one peer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one datagram. No retry, no acknowledgement.
    async fn send(&self, payload: Bytes) -> anyhow::Result<()>;

    /// Returns the next received datagram without waiting.
    fn try_recv(&mut self) -> anyhow::Result<Option<Bytes>>;
}

/// Opens a channel to a named peer.
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    async fn open(&self, peer: &PeerIdentity) -> Result<Box<dyn Transport>, LinkError>;
}

/// Unreliable channel over UDP.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    buf: Vec<u8>,
}

impl UdpTransport {
    pub async fn connect(bind_addr: SocketAddr, peer: SocketAddr) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await.context("udp bind")?;
        socket.connect(peer).await.context("udp connect")?;
        Ok(Self {
            socket,
            peer,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, payload: Bytes) -> anyhow::Result<()> {
        self.socket.send(&payload).await.context("udp send")?;
        Ok(())
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<Bytes>> {
        match self.socket.try_recv(&mut self.buf) {
            Ok(n) => Ok(Some(Bytes::copy_from_slice(&self.buf[..n]))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            // The peer's socket is not up yet; its ICMP reply surfaces here.
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                debug!(peer = %self.peer, "udp peer unreachable");
                Ok(None)
            }
            Err(e) => Err(e).context("udp recv"),
        }
    }
}

/// Opens [`UdpTransport`]s, resolving the peer identity as a host name.
#[derive(Debug, Clone)]
pub struct UdpOpener {
    pub bind_addr: SocketAddr,
    /// Port used with the resolved host name.
    pub port: u16,
    /// Skips resolution when set.
    pub peer_addr: Option<SocketAddr>,
}

impl UdpOpener {
    async fn resolve(&self, peer: &PeerIdentity) -> Result<SocketAddr, LinkError> {
        if let Some(addr) = self.peer_addr {
            return Ok(addr);
        }
        let host = peer.as_str().to_ascii_lowercase();
        let mut addrs = lookup_host((host.as_str(), self.port))
            .await
            .map_err(|e| LinkError::ChannelUnavailable(format!("resolve {host}: {e}")))?;
        addrs
            .next()
            .ok_or_else(|| LinkError::ChannelUnavailable(format!("no address for {host}")))
    }
}

#[async_trait]
impl ChannelOpener for UdpOpener {
    async fn open(&self, peer: &PeerIdentity) -> Result<Box<dyn Transport>, LinkError> {
        let addr = self.resolve(peer).await?;
        let transport = UdpTransport::connect(self.bind_addr, addr)
            .await
            .map_err(|e| LinkError::Io(format!("{e:#}")))?;
        Ok(Box::new(transport))
    }
}

/// In-process channel. Datagrams are delivered in send order, which is one
/// legal ordering of an unordered channel.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<Bytes>,
    rx: mpsc::UnboundedReceiver<Bytes>,
}

/// Creates two connected in-memory endpoints.
pub fn memory_pair() -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        MemoryTransport { tx: a_tx, rx: a_rx },
        MemoryTransport { tx: b_tx, rx: b_rx },
    )
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, payload: Bytes) -> anyhow::Result<()> {
        self.tx
            .send(payload)
            .map_err(|_| anyhow::anyhow!("memory peer closed"))
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<Bytes>> {
        match self.rx.try_recv() {
            Ok(b) => Ok(Some(b)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Ok(None),
        }
    }
}

/// Hands out one pre-built in-memory endpoint after a number of refusals.
/// Useful for exercising connection retry without sockets.
#[derive(Debug)]
pub struct MemoryOpener {
    endpoint: Mutex<Option<MemoryTransport>>,
    refusals_left: AtomicU32,
}

impl MemoryOpener {
    pub fn new(endpoint: MemoryTransport, refusals: u32) -> Self {
        Self {
            endpoint: Mutex::new(Some(endpoint)),
            refusals_left: AtomicU32::new(refusals),
        }
    }
}

#[async_trait]
impl ChannelOpener for MemoryOpener {
    async fn open(&self, peer: &PeerIdentity) -> Result<Box<dyn Transport>, LinkError> {
        let refused = self
            .refusals_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(LinkError::ChannelUnavailable(format!("{peer} not answering")));
        }
        let endpoint = self
            .endpoint
            .lock()
            .map_err(|_| LinkError::Io("lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| LinkError::ChannelUnavailable("endpoint already taken".to_string()))?;
        Ok(Box::new(endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update() -> PlayerUpdate {
        PlayerUpdate {
            sender: "BETA".to_string(),
            pos: Vec3::new(-55.0, 4.32, 0.25),
            quat: Quat::new(0.0, 0.38268343, 0.0, 0.9238795),
        }
    }

    #[test]
    fn identity_is_canonical_uppercase() {
        let id = PeerIdentity::new("  beta-pc ");
        assert_eq!(id.as_str(), "BETA-PC");
        assert!(id.matches("Beta-PC"));
        assert!(!id.matches("ALPHA"));
    }

    #[test]
    fn update_uses_action_tag_on_the_wire() {
        let bytes = encode_to_bytes(&PeerMsg::UpdatePlayer(update())).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["action"], "updatePlayer");
        assert_eq!(json["sender"], "BETA");
    }

    #[test]
    fn orientation_survives_the_wire_bit_for_bit() {
        let msg = PeerMsg::UpdatePlayer(update());
        let back = decode_from_bytes(&encode_to_bytes(&msg).unwrap()).unwrap();
        let PeerMsg::UpdatePlayer(back) = back else {
            panic!("wrong variant");
        };
        let src = update().quat;
        assert_eq!(back.quat.x.to_bits(), src.x.to_bits());
        assert_eq!(back.quat.y.to_bits(), src.y.to_bits());
        assert_eq!(back.quat.z.to_bits(), src.z.to_bits());
        assert_eq!(back.quat.w.to_bits(), src.w.to_bits());
    }

    #[test]
    fn unknown_action_is_explicit() {
        let msg = decode_from_bytes(br#"{"action":"chat","text":"hi"}"#).unwrap();
        assert_eq!(msg, PeerMsg::Unrecognized);
    }

    #[test]
    fn missing_fields_fail_to_decode() {
        assert!(decode_from_bytes(br#"{"action":"updatePlayer","sender":"BETA"}"#).is_err());
        assert!(decode_from_bytes(b"not json").is_err());
    }

    #[tokio::test]
    async fn memory_pair_delivers_both_ways() -> anyhow::Result<()> {
        let (mut a, mut b) = memory_pair();
        a.send(Bytes::from_static(b"ping")).await?;
        b.send(Bytes::from_static(b"pong")).await?;
        assert_eq!(b.try_recv()?.as_deref(), Some(&b"ping"[..]));
        assert_eq!(a.try_recv()?.as_deref(), Some(&b"pong"[..]));
        assert_eq!(a.try_recv()?, None);
        Ok(())
    }

    #[tokio::test]
    async fn memory_opener_refuses_then_opens() {
        let (a, _b) = memory_pair();
        let opener = MemoryOpener::new(a, 2);
        let peer = PeerIdentity::new("beta");
        assert!(opener.open(&peer).await.is_err());
        assert!(opener.open(&peer).await.is_err());
        assert!(opener.open(&peer).await.is_ok());
        assert!(opener.open(&peer).await.is_err());
    }
}
