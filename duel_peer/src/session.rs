//! Duel session: the per-tick orchestrator.
//!
//! A session owns both players, the peer link and the collaborators it talks
//! to. Each [`DuelSession::tick`] runs, in order:
//! 1. Apply the sampled input (navigator pose, self-destruct).
//! 2. Vertical kinematics for the local player, then respawn timers.
//! 3. Fire, if requested.
//! 4. Broadcast the local transform.
//! 5. Apply inbound updates to the remote shadow, in arrival order.
//!
//! Lifecycle events produced along the way are drained at the end of the tick
//! and forwarded to the scoreboard and the presentation collaborator.

use duel_shared::{
    assets::AssetCatalog,
    collision::CollisionOracle,
    config::GameConfig,
    event::{EventQueue, LifecycleEvent, Scoreboard},
    kinematics::{probe_ground, Contact},
    lifecycle::{FireOutcome, PlayerLifecycle, PlayerRole},
    link::{LinkError, PeerLink, SpawnAssignment},
    net::PeerIdentity,
    presentation::{Entity, Presentation, SoundCue},
};
use tracing::{debug, info, warn};

use crate::input::InputFrame;

/// Everything the session needs from the outside world.
pub struct SessionDeps<P: Presentation> {
    pub oracle: Box<dyn CollisionOracle + Send>,
    pub presentation: P,
    pub assets: AssetCatalog,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// `None` while the local player is dead.
    pub contact: Option<Contact>,
    pub fire: Option<FireOutcome>,
    pub broadcast_ok: bool,
    pub inbound_applied: usize,
    pub events: Vec<LifecycleEvent>,
}

/// Two-player duel driven from one machine's point of view.
pub struct DuelSession<P: Presentation> {
    cfg: GameConfig,
    link: PeerLink,
    spawns: SpawnAssignment,
    local: PlayerLifecycle,
    remote: PlayerLifecycle,
    oracle: Box<dyn CollisionOracle + Send>,
    presentation: P,
    assets: AssetCatalog,
    events: EventQueue,
    scoreboard: Scoreboard,
    tick: u64,
}

impl<P: Presentation> DuelSession<P> {
    /// Assigns spawns from the link identities and places both players.
    pub fn new(cfg: GameConfig, link: PeerLink, deps: SessionDeps<P>) -> Result<Self, LinkError> {
        let spawns = link.assign_spawns(cfg.link.role, &cfg.spawns)?;
        let local = PlayerLifecycle::new(
            link.local().clone(),
            PlayerRole::Local,
            spawns.local,
            cfg.combat,
        );
        let remote = PlayerLifecycle::new(
            link.peer().clone(),
            PlayerRole::Shadow,
            spawns.remote,
            cfg.combat,
        );
        info!(
            local = %link.local(),
            peer = %link.peer(),
            won_roll = spawns.local_wins,
            spawn = ?spawns.local,
            "Session ready"
        );

        let scoreboard = Scoreboard::new(link.local().clone());
        let mut session = Self {
            cfg,
            link,
            spawns,
            local,
            remote,
            oracle: deps.oracle,
            presentation: deps.presentation,
            assets: deps.assets,
            events: EventQueue::default(),
            scoreboard,
            tick: 0,
        };
        session.present_initial();
        Ok(session)
    }

    fn present_initial(&mut self) {
        let p = &mut self.presentation;
        p.show_scoreboard(&self.scoreboard.text());
        p.set_visible(Entity::Crosshair, true);
        p.set_visible(Entity::DeathOverlay, false);
        p.set_visible(Entity::LocalAvatar, false);
        if self.assets.warehouse.is_loaded() {
            p.set_visible(Entity::Warehouse, true);
        }
        if self.assets.gun.is_loaded() {
            p.set_visible(Entity::Gun, true);
        }
        if self.assets.avatar.is_loaded() {
            p.set_avatar_transform(self.remote.id(), self.remote.position(), self.remote.orientation());
            p.set_visible(Entity::RemoteAvatar, true);
        }
    }

    pub fn local(&self) -> &PlayerLifecycle {
        &self.local
    }

    pub fn remote(&self) -> &PlayerLifecycle {
        &self.remote
    }

    pub fn spawns(&self) -> &SpawnAssignment {
        &self.spawns
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn link(&self) -> &PeerLink {
        &self.link
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Runs one tick at time `now` (seconds, monotonic) with step `dt`.
    ///
    /// Never fails: send errors are logged and the tick carries on.
    pub async fn tick(&mut self, now: f64, dt: f32, input: InputFrame) -> TickReport {
        // 1. Input.
        if let Some(view) = input.view {
            self.local.set_view(view.position, view.orientation);
        }

        // 2. Kinematics, then timers.
        let ground = if self.local.is_alive() {
            probe_ground(&self.cfg.physics, &*self.oracle, self.local.position())
        } else {
            None
        };
        let contact = self
            .local
            .step_vertical(&self.cfg.physics, dt, input.jump(), ground);

        if input.self_destruct() {
            self.local.die(now, &mut self.events);
        }
        self.local.update_timers(now, &mut self.events);
        self.remote.update_timers(now, &mut self.events);

        // 3. Fire.
        let fire = if input.fire() {
            let outcome = self
                .local
                .fire(&mut self.remote, &*self.oracle, now, &mut self.events);
            self.present_shot(&outcome);
            Some(outcome)
        } else {
            None
        };

        // 4. Broadcast.
        let broadcast_ok = match self
            .link
            .broadcast(self.local.position(), self.local.orientation())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, tick = self.tick, "Broadcast failed");
                false
            }
        };

        // 5. Inbound.
        let updates = self.link.drain_inbound();
        let mut inbound_applied = 0;
        for u in &updates {
            if self.remote.apply_remote_transform(u.pos, u.quat) {
                inbound_applied += 1;
            }
        }
        if inbound_applied > 0 && self.assets.avatar.is_loaded() {
            self.presentation.set_avatar_transform(
                self.remote.id(),
                self.remote.position(),
                self.remote.orientation(),
            );
        }

        let events = self.events.drain();
        for e in &events {
            self.present_event(e);
        }

        self.tick += 1;
        TickReport {
            tick: self.tick,
            contact,
            fire,
            broadcast_ok,
            inbound_applied,
            events,
        }
    }

    fn present_shot(&mut self, outcome: &FireOutcome) {
        match outcome {
            FireOutcome::Fired(shot) => {
                if self.assets.shot_sound.is_loaded() {
                    self.presentation.play_sound(SoundCue::Shot);
                }
                self.presentation
                    .spawn_transient_effect(shot.impact, self.cfg.combat.impact_duration);
                debug!(target = ?shot.target, impact = ?shot.impact, "Shot fired");
            }
            FireOutcome::Rejected(reason) => debug!(?reason, "Trigger ignored"),
        }
    }

    fn present_event(&mut self, e: &LifecycleEvent) {
        if self.scoreboard.apply(e) {
            self.presentation.show_scoreboard(&self.scoreboard.text());
        }
        let local_id: &PeerIdentity = self.local.id();
        let p = &mut self.presentation;
        match e {
            LifecycleEvent::Death { player } if player == local_id => {
                p.set_visible(Entity::DeathOverlay, true);
                p.set_visible(Entity::LocalAvatar, true);
                if self.assets.gun.is_loaded() {
                    p.set_visible(Entity::Gun, false);
                }
            }
            LifecycleEvent::Respawn { player } if player == local_id => {
                p.set_visible(Entity::DeathOverlay, false);
                p.set_visible(Entity::LocalAvatar, false);
                if self.assets.gun.is_loaded() {
                    p.set_visible(Entity::Gun, true);
                }
            }
            LifecycleEvent::Death { .. } => {
                p.set_visible(Entity::RemoteAvatar, false);
            }
            LifecycleEvent::Respawn { .. } => {
                if self.assets.avatar.is_loaded() {
                    p.set_avatar_transform(self.remote.id(), self.remote.position(), self.remote.orientation());
                    p.set_visible(Entity::RemoteAvatar, true);
                }
            }
            LifecycleEvent::Kill { .. } => {}
        }
    }

    /// Human-readable status lines for the console.
    pub fn status_lines(&self) -> Vec<String> {
        let stats = self.link.stats();
        vec![
            format!("Tick: {}", self.tick),
            format!(
                "You ({}): {:?} health={} pos={:?}",
                self.local.id(),
                self.local.life_state(),
                self.local.health(),
                self.local.position()
            ),
            format!(
                "Peer ({}): {:?} health={} pos={:?}",
                self.remote.id(),
                self.remote.life_state(),
                self.remote.health(),
                self.remote.position()
            ),
            self.scoreboard.text(),
            format!(
                "Link: sent={} send_failures={} accepted={} dropped={}",
                stats.sent, stats.send_failures, stats.accepted, stats.dropped
            ),
        ]
    }
}
