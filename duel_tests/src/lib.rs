//! Shared harness for the integration tests: paired sessions on a fixed
//! clock, headless collaborators and a few input helpers.

use duel_peer::input::{InputButtons, InputFrame, NavigatorPose};
use duel_peer::session::{DuelSession, SessionDeps};
use duel_shared::assets::{AssetCatalog, BuiltinShapeLoader, LoaderChain};
use duel_shared::collision::BoxWorld;
use duel_shared::config::GameConfig;
use duel_shared::link::PeerLink;
use duel_shared::math::{Quat, Vec3};
use duel_shared::net::{memory_pair, PeerIdentity};
use duel_shared::presentation::RecordingPresentation;

pub type TestSession = DuelSession<RecordingPresentation>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Warehouse collision, a recording presenter and builtin shapes only.
pub fn headless_deps() -> SessionDeps<RecordingPresentation> {
    let mut chain = LoaderChain::new().with(BuiltinShapeLoader);
    SessionDeps {
        oracle: Box::new(BoxWorld::warehouse()),
        presentation: RecordingPresentation::default(),
        assets: AssetCatalog::load(&mut chain),
    }
}

/// Two sessions named `local` and `peer`, wired back to back in memory.
pub fn session_pair(cfg: &GameConfig, local: &str, peer: &str) -> anyhow::Result<(TestSession, TestSession)> {
    let (a, b) = memory_pair();
    let (la, lb) = (PeerIdentity::new(local), PeerIdentity::new(peer));
    let first = DuelSession::new(
        cfg.clone(),
        PeerLink::new(la.clone(), lb.clone(), Box::new(a)),
        headless_deps(),
    )?;
    let second = DuelSession::new(cfg.clone(), PeerLink::new(lb, la, Box::new(b)), headless_deps())?;
    Ok((first, second))
}

/// Fixed-step simulation clock.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub now: f64,
    pub dt: f32,
}

impl Clock {
    pub fn new(tick_hz: u32) -> Self {
        Self {
            now: 0.0,
            dt: 1.0 / tick_hz as f32,
        }
    }

    pub fn advance(&mut self) -> f64 {
        self.now += f64::from(self.dt);
        self.now
    }

    pub fn advance_secs(&mut self, secs: f64) -> f64 {
        self.now += secs;
        self.now
    }
}

/// A view `standoff` units short of `target` on the line from `from`,
/// facing `target`.
pub fn facing(from: Vec3, target: Vec3, standoff: f32) -> Option<NavigatorPose> {
    let dir = (target - from).with_y(0.0).try_normalize()?;
    Some(NavigatorPose {
        position: target - dir * standoff,
        orientation: Quat::from_yaw(dir.x.atan2(dir.z)),
    })
}

/// Fire at the opponent's current position from `standoff` units away.
pub fn shoot_at(session: &TestSession, standoff: f32) -> InputFrame {
    InputFrame {
        buttons: InputButtons::FIRE,
        view: facing(session.local().position(), session.remote().position(), standoff),
    }
}

/// Ticks both sessions with idle input.
pub async fn idle(a: &mut TestSession, b: &mut TestSession, clock: &mut Clock, ticks: usize) {
    for _ in 0..ticks {
        let now = clock.advance();
        a.tick(now, clock.dt, InputFrame::default()).await;
        b.tick(now, clock.dt, InputFrame::default()).await;
    }
}
