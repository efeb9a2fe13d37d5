//! Peer link: connection setup, spawn assignment and transform replication.
//!
//! # Connection
//! Each side keeps opening a channel to the peer's identity until one opens.
//! Attempts are spaced by a capped exponential backoff with jitter and may be
//! bounded by an overall timeout.
//!
//! # Spawn roll
//! Both sides compare the two canonical identities. The lexicographically
//! greater one takes spawn A, the other spawn B. The comparison is symmetric,
//! so the two machines agree without exchanging a message.
//!
//! # Replication
//! The local transform is sent every tick. Inbound updates from the expected
//! peer overwrite the remote shadow in arrival order; stale updates are not
//! detected.

use std::{fmt, time::Duration};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::{
    config::{LinkConfig, Role, SpawnConfig},
    math::{Quat, Vec3},
    net::{
        decode_from_bytes, encode_to_bytes, ChannelOpener, PeerIdentity, PeerMsg, PlayerUpdate,
        Transport,
    },
};

/// Link errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The peer could not be reached this attempt. Retried.
    ChannelUnavailable(String),
    /// Gave up after the configured connect timeout.
    ConnectTimeout(Duration),
    /// Both machines report the same identity, so no spawn roll is possible.
    IdentityCollision(PeerIdentity),
    /// Local failure that retrying will not fix.
    Io(String),
}

impl LinkError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LinkError::ChannelUnavailable(_))
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::ChannelUnavailable(reason) => write!(f, "peer channel unavailable: {reason}"),
            LinkError::ConnectTimeout(after) => {
                write!(f, "could not reach peer within {:.1}s", after.as_secs_f32())
            }
            LinkError::IdentityCollision(id) => {
                write!(f, "both peers are named {id}; pick distinct names or a role")
            }
            LinkError::Io(reason) => write!(f, "link io error: {reason}"),
        }
    }
}

impl std::error::Error for LinkError {}

/// Backoff schedule for connection attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
    /// `None` retries until the peer shows up.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LinkConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &LinkConfig) -> Self {
        Self {
            initial: Duration::from_millis(cfg.backoff_initial_ms),
            max: Duration::from_millis(cfg.backoff_max_ms),
            timeout: cfg.connect_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Base delay plus up to 25% random jitter, still capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = rand::thread_rng().gen_range(0.0..=0.25);
        base.mul_f64(1.0 + jitter).min(self.max)
    }
}

/// Opens a channel to `peer`, retrying until it succeeds or the policy's
/// timeout elapses.
pub async fn connect(
    opener: &dyn ChannelOpener,
    local: PeerIdentity,
    peer: PeerIdentity,
    policy: &RetryPolicy,
) -> Result<PeerLink, LinkError> {
    let attempts = async {
        let mut attempt = 0u32;
        loop {
            match opener.open(&peer).await {
                Ok(transport) => {
                    info!(%local, %peer, attempts = attempt + 1, "Peer channel open");
                    return Ok(transport);
                }
                Err(e) if e.is_retryable() => {
                    let delay = policy.delay(attempt);
                    warn!(%peer, attempt, error = %e, retry_in_ms = delay.as_millis() as u64, "Could not connect, retrying");
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        }
    };

    let transport = match policy.timeout {
        Some(limit) => tokio::time::timeout(limit, attempts)
            .await
            .map_err(|_| LinkError::ConnectTimeout(limit))??,
        None => attempts.await?,
    };

    Ok(PeerLink::new(local, peer, transport))
}

/// True if `local` wins the spawn roll against `peer`.
pub fn wins_spawn_roll(local: &PeerIdentity, peer: &PeerIdentity) -> bool {
    local.as_str() > peer.as_str()
}

/// Spawn points chosen for both players on this machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnAssignment {
    pub local_wins: bool,
    pub local: Vec3,
    pub remote: Vec3,
}

/// Assigns spawn A to the winner and spawn B to the other side.
///
/// A role override replaces the identity comparison. Equal identities without
/// a role are rejected because both sides would pick the same spawn.
pub fn assign_spawns(
    local: &PeerIdentity,
    peer: &PeerIdentity,
    role: Option<Role>,
    spawns: &SpawnConfig,
) -> Result<SpawnAssignment, LinkError> {
    let local_wins = match role {
        Some(Role::Host) => true,
        Some(Role::Guest) => false,
        None if local == peer => return Err(LinkError::IdentityCollision(local.clone())),
        None => wins_spawn_roll(local, peer),
    };
    let (local_spawn, remote_spawn) = if local_wins {
        (spawns.a, spawns.b)
    } else {
        (spawns.b, spawns.a)
    };
    Ok(SpawnAssignment {
        local_wins,
        local: local_spawn,
        remote: remote_spawn,
    })
}

/// Counters for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u64,
    pub send_failures: u64,
    pub accepted: u64,
    pub dropped: u64,
}

/// An open connection to the other peer.
pub struct PeerLink {
    local: PeerIdentity,
    peer: PeerIdentity,
    transport: Box<dyn Transport>,
    stats: LinkStats,
}

impl PeerLink {
    pub fn new(local: PeerIdentity, peer: PeerIdentity, transport: Box<dyn Transport>) -> Self {
        Self {
            local,
            peer,
            transport,
            stats: LinkStats::default(),
        }
    }

    pub fn local(&self) -> &PeerIdentity {
        &self.local
    }

    pub fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Derived role flag; never stored.
    pub fn wins_spawn_roll(&self) -> bool {
        wins_spawn_roll(&self.local, &self.peer)
    }

    pub fn assign_spawns(
        &self,
        role: Option<Role>,
        spawns: &SpawnConfig,
    ) -> Result<SpawnAssignment, LinkError> {
        assign_spawns(&self.local, &self.peer, role, spawns)
    }

    /// Sends the local transform once. Failures are counted and returned to
    /// the caller, which is expected to log and carry on.
    pub async fn broadcast(&mut self, pos: Vec3, quat: Quat) -> anyhow::Result<()> {
        let msg = PeerMsg::UpdatePlayer(PlayerUpdate {
            sender: self.local.as_str().to_string(),
            pos,
            quat,
        });
        let payload = encode_to_bytes(&msg)?;
        match self.transport.send(payload).await {
            Ok(()) => {
                self.stats.sent += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.send_failures += 1;
                Err(e)
            }
        }
    }

    /// Filters a decoded message: only updates from the expected peer pass.
    pub fn accept(&self, msg: PeerMsg) -> Option<PlayerUpdate> {
        match msg {
            PeerMsg::UpdatePlayer(update) if self.peer.matches(&update.sender) => Some(update),
            PeerMsg::UpdatePlayer(update) => {
                debug!(sender = %update.sender, expected = %self.peer, "Dropping update from unexpected sender");
                None
            }
            PeerMsg::Unrecognized => {
                debug!("Dropping message with unrecognized action");
                None
            }
        }
    }

    /// Drains every datagram received since the last call, in arrival order.
    pub fn drain_inbound(&mut self) -> Vec<PlayerUpdate> {
        let mut accepted = Vec::new();
        loop {
            let datagram = match self.transport.try_recv() {
                Ok(Some(d)) => d,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Receive failed");
                    break;
                }
            };
            let update = match decode_from_bytes(&datagram) {
                Ok(msg) => self.accept(msg),
                Err(e) => {
                    debug!(error = %e, len = datagram.len(), "Dropping malformed datagram");
                    None
                }
            };
            match update {
                Some(u) => {
                    self.stats.accepted += 1;
                    accepted.push(u);
                }
                None => self.stats.dropped += 1,
            }
        }
        accepted
    }
}

impl fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerLink")
            .field("local", &self.local)
            .field("peer", &self.peer)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
