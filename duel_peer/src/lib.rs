//! `duel_peer`
//!
//! One side of a two-player duel:
//! - Local name resolution
//! - Input sampling (scripted or console-driven)
//! - Per-tick orchestration of kinematics, lifecycle and replication
//! - A log-backed presenter for headless runs

pub mod identity;
pub mod input;
pub mod log_presenter;
pub mod session;

pub use session::{DuelSession, SessionDeps, TickReport};
