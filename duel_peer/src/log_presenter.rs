//! Headless presenter that writes presentation commands to the log.

use duel_shared::{
    math::{Quat, Vec3},
    net::PeerIdentity,
    presentation::{Entity, Presentation, SoundCue},
};
use tracing::{debug, info};

/// Logs what a renderer would have drawn. Transform updates are frequent, so
/// they go to `trace`.
#[derive(Debug, Default)]
pub struct TracingPresentation {
    last_scoreboard: String,
}

impl TracingPresentation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presentation for TracingPresentation {
    fn set_avatar_transform(&mut self, player: &PeerIdentity, pos: Vec3, quat: Quat) {
        tracing::trace!(%player, ?pos, ?quat, "Avatar moved");
    }

    fn spawn_transient_effect(&mut self, point: Vec3, duration: f32) {
        debug!(?point, duration, "Impact marker");
    }

    fn play_sound(&mut self, cue: SoundCue) {
        debug!(?cue, "Sound");
    }

    fn set_visible(&mut self, entity: Entity, visible: bool) {
        debug!(?entity, visible, "Visibility");
    }

    fn show_scoreboard(&mut self, text: &str) {
        if text != self.last_scoreboard {
            info!("{text}");
            self.last_scoreboard = text.to_string();
        }
    }
}
