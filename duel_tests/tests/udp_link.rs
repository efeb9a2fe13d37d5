//! Peer links over real loopback sockets.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use duel_peer::input::InputFrame;
use duel_peer::session::DuelSession;
use duel_shared::config::GameConfig;
use duel_shared::link::{connect, LinkError, RetryPolicy};
use duel_shared::math::{Quat, Vec3};
use duel_shared::net::{PeerIdentity, UdpOpener};
use duel_tests::{headless_deps, init_tracing};

/// Grabs a free loopback port. The socket is closed again before use.
fn free_port() -> anyhow::Result<SocketAddr> {
    let socket = UdpSocket::bind("127.0.0.1:0")?;
    Ok(socket.local_addr()?)
}

fn opener(bind: SocketAddr, peer: SocketAddr) -> UdpOpener {
    UdpOpener {
        bind_addr: bind,
        port: peer.port(),
        peer_addr: Some(peer),
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        initial: Duration::from_millis(5),
        max: Duration::from_millis(20),
        timeout: Some(Duration::from_secs(2)),
    }
}

#[tokio::test]
async fn updates_cross_loopback() -> anyhow::Result<()> {
    init_tracing();
    let (a_addr, b_addr) = (free_port()?, free_port()?);

    let mut alpha = connect(
        &opener(a_addr, b_addr),
        PeerIdentity::new("alpha"),
        PeerIdentity::new("beta"),
        &fast_policy(),
    )
    .await?;
    let mut beta = connect(
        &opener(b_addr, a_addr),
        PeerIdentity::new("beta"),
        PeerIdentity::new("alpha"),
        &fast_policy(),
    )
    .await?;

    let quat = Quat::from_yaw(1.25);
    alpha.broadcast(Vec3::new(-40.0, 4.32, 3.5), quat).await?;

    let mut got = Vec::new();
    for _ in 0..100 {
        got.extend(beta.drain_inbound());
        if !got.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].pos, Vec3::new(-40.0, 4.32, 3.5));
    assert_eq!(got[0].quat, quat);
    assert_eq!(beta.stats().accepted, 1);
    Ok(())
}

#[tokio::test]
async fn sessions_replicate_over_udp() -> anyhow::Result<()> {
    init_tracing();
    let cfg = GameConfig::default();
    let (a_addr, b_addr) = (free_port()?, free_port()?);

    let link_a = connect(
        &opener(a_addr, b_addr),
        PeerIdentity::new("alpha"),
        PeerIdentity::new("beta"),
        &fast_policy(),
    )
    .await?;
    let link_b = connect(
        &opener(b_addr, a_addr),
        PeerIdentity::new("beta"),
        PeerIdentity::new("alpha"),
        &fast_policy(),
    )
    .await?;
    let mut alpha = DuelSession::new(cfg.clone(), link_a, headless_deps())?;
    let mut beta = DuelSession::new(cfg.clone(), link_b, headless_deps())?;

    let dt = cfg.tick_dt();
    let mut applied = 0;
    for i in 0..50 {
        let now = f64::from(i) * f64::from(dt);
        alpha.tick(now, dt, InputFrame::default()).await;
        applied += beta.tick(now, dt, InputFrame::default()).await.inbound_applied;
        if applied > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(applied > 0);
    assert_eq!(beta.remote().position(), alpha.local().position());
    Ok(())
}

#[tokio::test]
async fn unbindable_address_is_not_retried() -> anyhow::Result<()> {
    // Binding a non-local address fails immediately instead of looping.
    let bind: SocketAddr = "203.0.113.1:0".parse()?;
    let peer = free_port()?;
    let err = connect(
        &opener(bind, peer),
        PeerIdentity::new("alpha"),
        PeerIdentity::new("beta"),
        &fast_policy(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LinkError::Io(_)));
    Ok(())
}
