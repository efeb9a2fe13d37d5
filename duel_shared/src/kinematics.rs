//! Vertical motion with ground snapping.
//!
//! Horizontal movement belongs to the navigation collaborator; this module
//! only integrates the vertical axis. [`step`] is pure and deterministic.

use crate::{collision::CollisionOracle, config::PhysicsConfig, math::Vec3};

/// Result of one vertical integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub position: Vec3,
    pub velocity: f32,
    pub contact: Contact,
}

/// Exactly one of these holds after every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// Clamped onto the ground this tick; velocity is zero.
    Landed,
    /// Moved freely (rising, falling, or no ground under the feet).
    Airborne,
}

/// Integrates one tick of vertical motion.
///
/// A jump is only honoured from rest (`velocity == 0`). Gravity applies every
/// tick, including the tick of a jump and ticks spent standing; a standing
/// player is re-clamped onto the ground each time.
pub fn step(
    cfg: &PhysicsConfig,
    position: Vec3,
    velocity: f32,
    dt: f32,
    jump_requested: bool,
    ground_height: Option<f32>,
) -> StepResult {
    let mut velocity = velocity;
    if jump_requested && velocity == 0.0 {
        velocity = cfg.jump_velocity;
    }

    velocity -= cfg.gravity * dt;
    let candidate = position.y + velocity * dt;

    match ground_height {
        Some(ground) if candidate <= ground && velocity < 0.0 => StepResult {
            position: position.with_y(ground),
            velocity: 0.0,
            contact: Contact::Landed,
        },
        _ => StepResult {
            position: position.with_y(candidate),
            velocity,
            contact: Contact::Airborne,
        },
    }
}

/// Height the eye position should rest at, if ground is within reach.
///
/// Casts from just above the feet to `ground_check_dist` below them.
pub fn probe_ground(cfg: &PhysicsConfig, oracle: &dyn CollisionOracle, eye: Vec3) -> Option<f32> {
    let feet_y = eye.y - cfg.player_height;
    let from = eye.with_y(feet_y + 0.1);
    let to = eye.with_y(feet_y - cfg.ground_check_dist);
    oracle
        .cast(from, to)
        .map(|hit| hit.point.y + cfg.player_height)
}
