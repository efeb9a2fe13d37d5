//! Player lifecycle: health, death, respawn and shooting.
//!
//! ```text
//!            take_damage (health hits 0) / die
//!   Alive  ─────────────────────────────────────▶  Dead
//!     ▲                                             │
//!     └──────── update_timers (respawn due) ◀───────┘
//! ```
//!
//! Both players on a machine are modelled by a [`PlayerLifecycle`]. The local
//! one is driven by input and kinematics; the remote one is a shadow whose
//! transform only changes through inbound network updates. Damage dealt by the
//! local shooter is applied to the shadow directly.
//!
//! Time is passed in as seconds on a monotonic clock owned by the caller, so
//! every transition here is deterministic.

use tracing::{debug, info};

use crate::{
    collision::{CollisionOracle, ObjectRef},
    config::{CombatConfig, PhysicsConfig},
    event::{EventQueue, LifecycleEvent},
    hit::{segment_entry, Aabb},
    kinematics::{self, Contact},
    math::{Quat, Vec3},
    net::PeerIdentity,
};

/// Which machine owns the player's transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerRole {
    Local,
    Shadow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Dead,
}

/// Per-player simulation state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Eye position for the local player, avatar origin for the shadow.
    pub position: Vec3,
    pub orientation: Quat,
    pub vertical_velocity: f32,
    pub health: u32,
    pub alive: bool,
    /// Time of the last accepted shot; `None` until the first one.
    pub last_shot: Option<f64>,
    pub spawn_point: Vec3,
}

/// Why a trigger pull did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRejection {
    Cooldown,
    ShooterDead,
    /// Only the local player fires; shadows are driven by the other machine.
    NotLocal,
    /// The orientation has no usable forward direction.
    InvalidAim,
}

/// What an accepted shot struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotTarget {
    Opponent { killed: bool },
    World(Option<ObjectRef>),
    /// Nothing within range; the impact sits at the end of the ray.
    MaxRange,
}

/// An accepted shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub start: Vec3,
    pub end: Vec3,
    /// Where to place the impact effect.
    pub impact: Vec3,
    pub target: ShotTarget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireOutcome {
    Rejected(FireRejection),
    Fired(Shot),
}

impl FireOutcome {
    pub fn shot(&self) -> Option<&Shot> {
        match self {
            FireOutcome::Fired(shot) => Some(shot),
            FireOutcome::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerLifecycle {
    id: PeerIdentity,
    role: PlayerRole,
    combat: CombatConfig,
    state: PlayerState,
    respawn_at: Option<f64>,
}

impl PlayerLifecycle {
    /// A living player at full health standing on `spawn_point`.
    pub fn new(id: PeerIdentity, role: PlayerRole, spawn_point: Vec3, combat: CombatConfig) -> Self {
        Self {
            id,
            role,
            combat,
            state: PlayerState {
                position: spawn_point,
                orientation: Quat::IDENTITY,
                vertical_velocity: 0.0,
                health: combat.max_health,
                alive: true,
                last_shot: None,
                spawn_point,
            },
            respawn_at: None,
        }
    }

    pub fn id(&self) -> &PeerIdentity {
        &self.id
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn life_state(&self) -> LifeState {
        if self.state.alive {
            LifeState::Alive
        } else {
            LifeState::Dead
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state.alive
    }

    pub fn health(&self) -> u32 {
        self.state.health
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn orientation(&self) -> Quat {
        self.state.orientation
    }

    /// Pending respawn time while dead.
    pub fn respawn_at(&self) -> Option<f64> {
        self.respawn_at
    }

    /// Hitbox centered on the current position.
    pub fn hitbox(&self) -> Aabb {
        Aabb::new(self.state.position, self.combat.half_extents)
    }

    /// Takes the horizontal position and view orientation from the navigator.
    /// Ignored while dead so the view stays where the player died.
    pub fn set_view(&mut self, horizontal: Vec3, orientation: Quat) {
        if self.role != PlayerRole::Local || !self.state.alive {
            return;
        }
        self.state.position.x = horizontal.x;
        self.state.position.z = horizontal.z;
        self.state.orientation = orientation;
    }

    /// Runs one tick of vertical motion. Returns `None` when frozen (dead or
    /// not locally owned).
    pub fn step_vertical(
        &mut self,
        physics: &PhysicsConfig,
        dt: f32,
        jump_requested: bool,
        ground_height: Option<f32>,
    ) -> Option<Contact> {
        if self.role != PlayerRole::Local || !self.state.alive {
            return None;
        }
        let r = kinematics::step(
            physics,
            self.state.position,
            self.state.vertical_velocity,
            dt,
            jump_requested,
            ground_height,
        );
        self.state.position = r.position;
        self.state.vertical_velocity = r.velocity;
        Some(r.contact)
    }

    /// Overwrites the shadow transform with an inbound update. Last write wins.
    pub fn apply_remote_transform(&mut self, position: Vec3, orientation: Quat) -> bool {
        if self.role != PlayerRole::Shadow {
            return false;
        }
        self.state.position = position;
        self.state.orientation = orientation;
        true
    }

    /// Subtracts health; dying arms the respawn timer. Dead players ignore
    /// damage. Returns true if this call killed the player.
    pub fn take_damage(&mut self, amount: u32, now: f64, events: &mut EventQueue) -> bool {
        if !self.state.alive {
            return false;
        }
        self.state.health = self.state.health.saturating_sub(amount);
        if self.state.health == 0 {
            self.die(now, events);
            return true;
        }
        false
    }

    /// Kills the player outright regardless of health.
    pub fn die(&mut self, now: f64, events: &mut EventQueue) {
        if !self.state.alive {
            return;
        }
        self.state.health = 0;
        self.state.alive = false;
        self.state.vertical_velocity = 0.0;
        let respawn_at = now + self.combat.respawn_delay;
        self.respawn_at = Some(respawn_at);
        info!(player = %self.id, respawn_at, "Player died");
        events.push(LifecycleEvent::Death {
            player: self.id.clone(),
        });
    }

    /// Respawns when the timer is due. Returns true on respawn.
    pub fn update_timers(&mut self, now: f64, events: &mut EventQueue) -> bool {
        match self.respawn_at {
            Some(at) if !self.state.alive && now >= at => {
                self.respawn(events);
                true
            }
            _ => false,
        }
    }

    fn respawn(&mut self, events: &mut EventQueue) {
        self.state.health = self.combat.max_health;
        self.state.alive = true;
        self.state.vertical_velocity = 0.0;
        self.state.position = self.state.spawn_point;
        self.respawn_at = None;
        info!(player = %self.id, spawn = ?self.state.spawn_point, "Player respawned");
        events.push(LifecycleEvent::Respawn {
            player: self.id.clone(),
        });
    }

    /// Pulls the trigger.
    ///
    /// The aim ray starts at the eye and runs `shot_range` along the view
    /// forward. A hit on a living opponent applies `damage_per_hit`; otherwise
    /// the world is asked where the impact lands.
    pub fn fire(
        &mut self,
        opponent: &mut PlayerLifecycle,
        oracle: &dyn CollisionOracle,
        now: f64,
        events: &mut EventQueue,
    ) -> FireOutcome {
        if self.role != PlayerRole::Local {
            return FireOutcome::Rejected(FireRejection::NotLocal);
        }
        if !self.state.alive {
            return FireOutcome::Rejected(FireRejection::ShooterDead);
        }
        if let Some(last) = self.state.last_shot {
            if now - last < self.combat.shoot_cooldown {
                debug!(player = %self.id, since_last = now - last, "Shot rejected by cooldown");
                return FireOutcome::Rejected(FireRejection::Cooldown);
            }
        }
        let aim = self
            .state
            .orientation
            .try_normalize()
            .and_then(|q| q.forward().try_normalize());
        let Some(direction) = aim else {
            return FireOutcome::Rejected(FireRejection::InvalidAim);
        };

        self.state.last_shot = Some(now);

        let start = self.state.position;
        let end = start + direction * self.combat.shot_range;

        let opponent_hit = if opponent.is_alive() {
            segment_entry(start, end, &opponent.hitbox())
        } else {
            None
        };

        let shot = if let Some(hit) = opponent_hit {
            let killed = opponent.take_damage(self.combat.damage_per_hit, now, events);
            if killed {
                info!(shooter = %self.id, victim = %opponent.id, "Kill");
                events.push(LifecycleEvent::Kill {
                    shooter: self.id.clone(),
                });
            }
            Shot {
                start,
                end,
                impact: hit.point,
                target: ShotTarget::Opponent { killed },
            }
        } else if let Some(hit) = oracle.cast(start, end) {
            Shot {
                start,
                end,
                impact: hit.point,
                target: ShotTarget::World(hit.object),
            }
        } else {
            Shot {
                start,
                end,
                impact: end,
                target: ShotTarget::MaxRange,
            }
        };

        FireOutcome::Fired(shot)
    }
}
