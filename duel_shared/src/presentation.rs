//! Presentation abstraction.
//!
//! This crate intentionally does not depend on a graphics or audio backend.
//! The simulation issues fire-and-forget commands through [`Presentation`];
//! nothing it returns feeds back into gameplay.

use crate::{
    math::{Quat, Vec3},
    net::PeerIdentity,
};

/// Things the simulation can show or hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Level geometry.
    Warehouse,
    /// Third-person body of the local player; hidden while alive.
    LocalAvatar,
    RemoteAvatar,
    Gun,
    DeathOverlay,
    Crosshair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Shot,
}

/// Visual/audio collaborator.
pub trait Presentation: Send {
    fn set_avatar_transform(&mut self, player: &PeerIdentity, pos: Vec3, quat: Quat);
    fn spawn_transient_effect(&mut self, point: Vec3, duration: f32);
    fn play_sound(&mut self, cue: SoundCue);
    fn set_visible(&mut self, entity: Entity, visible: bool);
    fn show_scoreboard(&mut self, text: &str);
}

/// One recorded presentation command.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationCmd {
    AvatarTransform { player: PeerIdentity, pos: Vec3, quat: Quat },
    Effect { point: Vec3, duration: f32 },
    Sound(SoundCue),
    Visible { entity: Entity, visible: bool },
    Scoreboard(String),
}

/// Records every command; for tests and replays.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    pub commands: Vec<PresentationCmd>,
}

impl RecordingPresentation {
    /// Last visibility set for `entity`, if any.
    pub fn visibility(&self, entity: Entity) -> Option<bool> {
        self.commands.iter().rev().find_map(|c| match c {
            PresentationCmd::Visible { entity: e, visible } if *e == entity => Some(*visible),
            _ => None,
        })
    }

    pub fn effects(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.commands.iter().filter_map(|c| match c {
            PresentationCmd::Effect { point, .. } => Some(*point),
            _ => None,
        })
    }

    pub fn last_scoreboard(&self) -> Option<&str> {
        self.commands.iter().rev().find_map(|c| match c {
            PresentationCmd::Scoreboard(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Presentation for RecordingPresentation {
    fn set_avatar_transform(&mut self, player: &PeerIdentity, pos: Vec3, quat: Quat) {
        self.commands.push(PresentationCmd::AvatarTransform {
            player: player.clone(),
            pos,
            quat,
        });
    }

    fn spawn_transient_effect(&mut self, point: Vec3, duration: f32) {
        self.commands.push(PresentationCmd::Effect { point, duration });
    }

    fn play_sound(&mut self, cue: SoundCue) {
        self.commands.push(PresentationCmd::Sound(cue));
    }

    fn set_visible(&mut self, entity: Entity, visible: bool) {
        self.commands.push(PresentationCmd::Visible { entity, visible });
    }

    fn show_scoreboard(&mut self, text: &str) {
        self.commands.push(PresentationCmd::Scoreboard(text.to_string()));
    }
}
