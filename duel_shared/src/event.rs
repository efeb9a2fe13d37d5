//! Lifecycle events and the scoreboard that consumes them.
//!
//! The lifecycle pushes events into an [`EventQueue`] while it runs; the
//! orchestrator drains the queue once per tick and hands the events to the
//! outward-facing collaborators.

use crate::net::PeerIdentity;

/// Something happened to a player that the UI may care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `shooter` landed a lethal hit.
    Kill { shooter: PeerIdentity },
    Death { player: PeerIdentity },
    Respawn { player: PeerIdentity },
}

/// FIFO of lifecycle events for one tick.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<LifecycleEvent>,
}

impl EventQueue {
    pub fn push(&mut self, e: LifecycleEvent) {
        self.events.push(e);
    }

    /// Drains all queued events in emission order.
    pub fn drain(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Kill/death tally for the local player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    local: PeerIdentity,
    pub kills: u32,
    pub deaths: u32,
}

impl Scoreboard {
    pub fn new(local: PeerIdentity) -> Self {
        Self {
            local,
            kills: 0,
            deaths: 0,
        }
    }

    /// Counts the event if it concerns the local player. Returns true when the
    /// tally changed.
    pub fn apply(&mut self, e: &LifecycleEvent) -> bool {
        match e {
            LifecycleEvent::Kill { shooter } if *shooter == self.local => {
                self.kills += 1;
                true
            }
            LifecycleEvent::Death { player } if *player == self.local => {
                self.deaths += 1;
                true
            }
            _ => false,
        }
    }

    pub fn text(&self) -> String {
        format!("Kills: {} | Deaths: {}", self.kills, self.deaths)
    }
}
