//! Configuration system.
//!
//! Loads duel configuration from JSON strings/files. Every field has a default
//! so a partial file (or none at all) yields a playable setup. Values are
//! immutable once constructed and handed to the subsystems that need them.

use std::{fmt, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Vertical motion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration, units/s².
    pub gravity: f32,
    /// Upward impulse applied by a jump from rest, units/s.
    pub jump_velocity: f32,
    /// Distance from the eye position down to the feet.
    pub player_height: f32,
    /// How far below the feet the ground probe searches.
    pub ground_check_dist: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            jump_velocity: 7.0,
            player_height: 1.82,
            ground_check_dist: 0.5,
        }
    }
}

/// Health, weapon and hitbox parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub max_health: u32,
    /// Damage dealt by one hit. Equal to `max_health` by default: any hit is lethal.
    pub damage_per_hit: u32,
    /// Minimum seconds between accepted shots.
    pub shoot_cooldown: f64,
    /// Seconds spent dead before respawning.
    pub respawn_delay: f64,
    /// Length of the aim ray.
    pub shot_range: f32,
    /// Lifetime of a bullet impact marker, seconds.
    pub impact_duration: f32,
    /// Player hitbox half-extents (width/2, height/2, depth/2).
    pub half_extents: Vec3,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            damage_per_hit: 100,
            shoot_cooldown: 0.5,
            respawn_delay: 3.0,
            shot_range: 50.0,
            impact_duration: 1.0,
            half_extents: Vec3::new(0.6, 0.91, 0.4),
        }
    }
}

/// The two symmetric spawn constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Spawn given to the side that wins the spawn roll.
    pub a: Vec3,
    /// Spawn given to the other side.
    pub b: Vec3,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            a: Vec3::new(55.0, 4.32, 0.0),
            b: Vec3::new(-55.0, 4.32, 0.0),
        }
    }
}

/// Explicit spawn role override. `Host` always wins the spawn roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

impl std::str::FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Role::Host),
            "guest" => Ok(Role::Guest),
            _ => Err(ConfigError::InvalidValue {
                field: "role",
                reason: format!("expected `host` or `guest`, got `{s}`"),
            }),
        }
    }
}

/// Peer connection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// This machine's identity. Empty means "derive from the environment".
    pub local_identity: String,
    /// The other machine's identity. Empty means "ask on stdin".
    pub peer_identity: String,
    /// Local UDP bind address.
    pub bind_addr: String,
    /// Port the peer listens on when resolved by identity.
    pub port: u16,
    /// Explicit peer address; bypasses identity resolution when set.
    pub peer_addr: Option<String>,
    pub role: Option<Role>,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    /// Give up connecting after this long. `None` retries forever.
    pub connect_timeout_ms: Option<u64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            local_identity: String::new(),
            peer_identity: String::new(),
            bind_addr: "0.0.0.0:41000".to_string(),
            port: 41000,
            peer_addr: None,
            role: None,
            backoff_initial_ms: 100,
            backoff_max_ms: 2_000,
            connect_timeout_ms: None,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Fixed simulation tick rate.
    pub tick_hz: u32,
    /// Directory searched for model/sound files.
    pub assets_dir: String,
    pub physics: PhysicsConfig,
    pub combat: CombatConfig,
    pub spawns: SpawnConfig,
    pub link: LinkConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            assets_dir: "objects".to_string(),
            physics: PhysicsConfig::default(),
            combat: CombatConfig::default(),
            spawns: SpawnConfig::default(),
            link: LinkConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and validates a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::from_json_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Seconds per simulation tick.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }

    /// Rejects values that would make the simulation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> Result<(), ConfigError> {
            Err(ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            })
        }

        if self.tick_hz == 0 {
            return invalid("tick_hz", "must be positive");
        }
        if !(self.physics.gravity > 0.0) {
            return invalid("physics.gravity", "must be positive");
        }
        if self.physics.jump_velocity < 0.0 {
            return invalid("physics.jump_velocity", "must not be negative");
        }
        if !(self.physics.player_height > 0.0) {
            return invalid("physics.player_height", "must be positive");
        }
        if !(self.physics.ground_check_dist > 0.0) {
            return invalid("physics.ground_check_dist", "must be positive");
        }
        if self.combat.max_health == 0 {
            return invalid("combat.max_health", "must be positive");
        }
        let timers = [self.combat.shoot_cooldown, self.combat.respawn_delay];
        if timers.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return invalid("combat", "timers must be finite and not negative");
        }
        if !(self.combat.shot_range > 0.0) {
            return invalid("combat.shot_range", "must be positive");
        }
        let h = self.combat.half_extents;
        if h.x < 0.0 || h.y < 0.0 || h.z < 0.0 {
            return invalid("combat.half_extents", "must not be negative");
        }
        if self.spawns.a == self.spawns.b {
            return invalid("spawns", "the two spawn points must differ");
        }
        if self.link.backoff_initial_ms == 0 || self.link.backoff_max_ms < self.link.backoff_initial_ms {
            return invalid("link.backoff", "need 0 < initial <= max");
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid config value `{field}`: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
