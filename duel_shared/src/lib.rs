//! `duel_shared`
//!
//! Simulation core shared by both peers of a warehouse duel.
//!
//! Design goals:
//! - Deterministic where practical: time and input are passed in.
//! - Clear separation of concerns (kinematics, hit detection, lifecycle, link).
//! - Traits at the engine seams (collision, transport, presentation, assets).
//! - No `unsafe`.

pub mod assets;
pub mod collision;
pub mod config;
pub mod event;
pub mod hit;
pub mod kinematics;
pub mod lifecycle;
pub mod link;
pub mod math;
pub mod net;
pub mod presentation;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::collision::*;
    pub use crate::config::*;
    pub use crate::event::*;
    pub use crate::lifecycle::*;
    pub use crate::link::*;
    pub use crate::math::*;
    pub use crate::net::*;
}
