//! Input handling.
//!
//! In a real deployment this would sit on top of the engine's keyboard, mouse
//! and walk-navigator. Here it produces one [`InputFrame`] per tick with
//! edge-triggered buttons, either from a script (tests) or from console lines
//! typed into the headless peer.

use std::collections::VecDeque;

use duel_shared::math::{Quat, Vec3};
use tokio::sync::mpsc;

bitflags::bitflags! {
    /// Buttons pressed since the previous tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputButtons: u8 {
        const JUMP = 1 << 0;
        const FIRE = 1 << 1;
        /// Kill the local player immediately.
        const SELF_DESTRUCT = 1 << 2;
    }
}

/// View pose reported by the navigation collaborator. Only the horizontal
/// components of `position` are used; vertical motion is simulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigatorPose {
    pub position: Vec3,
    pub orientation: Quat,
}

/// Input sampled for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputFrame {
    pub buttons: InputButtons,
    pub view: Option<NavigatorPose>,
}

impl InputFrame {
    pub fn pressed(buttons: InputButtons) -> Self {
        Self {
            buttons,
            view: None,
        }
    }

    pub fn jump(&self) -> bool {
        self.buttons.contains(InputButtons::JUMP)
    }

    pub fn fire(&self) -> bool {
        self.buttons.contains(InputButtons::FIRE)
    }

    pub fn self_destruct(&self) -> bool {
        self.buttons.contains(InputButtons::SELF_DESTRUCT)
    }
}

/// Polled once per tick.
pub trait InputSource {
    fn sample(&mut self) -> InputFrame;
}

/// Replays a fixed list of frames, then idles.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    frames: VecDeque<InputFrame>,
}

impl ScriptedInput {
    pub fn new<I: IntoIterator<Item = InputFrame>>(frames: I) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> InputFrame {
        self.frames.pop_front().unwrap_or_default()
    }
}

/// Minimal walk navigator: yaw plus a horizontal position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkNavigator {
    pub position: Vec3,
    pub yaw: f32,
}

impl WalkNavigator {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self { position, yaw }
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_yaw(self.yaw)
    }

    pub fn turn_degrees(&mut self, degrees: f32) {
        self.yaw = (self.yaw + degrees.to_radians()).rem_euclid(std::f32::consts::TAU);
    }

    /// Moves along the horizontal view forward.
    pub fn walk(&mut self, distance: f32) {
        let forward = self.orientation().forward().with_y(0.0);
        if let Some(dir) = forward.try_normalize() {
            self.position += dir * distance;
        }
    }

    pub fn pose(&self) -> NavigatorPose {
        NavigatorPose {
            position: self.position,
            orientation: self.orientation(),
        }
    }
}

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Jump,
    Fire,
    SelfDestruct,
    Turn(f32),
    Walk(f32),
    Status,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let number = |i: usize, usage: &str| -> Result<f32, String> {
        tokens
            .get(i)
            .and_then(|t| t.parse::<f32>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("Usage: {usage}"))
    };
    match tokens.first().copied() {
        Some("jump") | Some("j") => Ok(ConsoleCommand::Jump),
        Some("fire") | Some("shoot") => Ok(ConsoleCommand::Fire),
        Some("die") | Some("kill") => Ok(ConsoleCommand::SelfDestruct),
        Some("turn") => number(1, "turn <degrees>").map(ConsoleCommand::Turn),
        Some("walk") => number(1, "walk <units>").map(ConsoleCommand::Walk),
        Some("status") => Ok(ConsoleCommand::Status),
        Some("quit") | Some("exit") => Ok(ConsoleCommand::Quit),
        Some(other) => Err(format!("Unknown command: {other}")),
        None => Err("Empty command".to_string()),
    }
}

/// Turns console lines into input frames.
///
/// Buttons accumulate between ticks and are cleared by every [`sample`],
/// which makes them edge-triggered. `status` and `quit` are surfaced as flags
/// for the binary to act on.
///
/// [`sample`]: InputSource::sample
pub struct ConsoleInput {
    rx: mpsc::Receiver<String>,
    navigator: WalkNavigator,
    pending: InputButtons,
    pub status_requested: bool,
    pub quit_requested: bool,
}

impl ConsoleInput {
    pub fn new(rx: mpsc::Receiver<String>, navigator: WalkNavigator) -> Self {
        Self {
            rx,
            navigator,
            pending: InputButtons::empty(),
            status_requested: false,
            quit_requested: false,
        }
    }

    /// Resets the navigator, e.g. after respawning on a spawn point.
    pub fn place(&mut self, position: Vec3) {
        self.navigator.position = position;
    }

    fn apply(&mut self, cmd: ConsoleCommand) {
        match cmd {
            ConsoleCommand::Jump => self.pending |= InputButtons::JUMP,
            ConsoleCommand::Fire => self.pending |= InputButtons::FIRE,
            ConsoleCommand::SelfDestruct => self.pending |= InputButtons::SELF_DESTRUCT,
            ConsoleCommand::Turn(deg) => self.navigator.turn_degrees(deg),
            ConsoleCommand::Walk(units) => self.navigator.walk(units),
            ConsoleCommand::Status => self.status_requested = true,
            ConsoleCommand::Quit => self.quit_requested = true,
        }
    }
}

impl InputSource for ConsoleInput {
    fn sample(&mut self) -> InputFrame {
        while let Ok(line) = self.rx.try_recv() {
            match parse_command(&line) {
                Ok(cmd) => self.apply(cmd),
                Err(msg) => println!("{msg}"),
            }
        }
        InputFrame {
            buttons: std::mem::take(&mut self.pending),
            view: Some(self.navigator.pose()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_console_commands() {
        assert_eq!(parse_command("fire"), Ok(ConsoleCommand::Fire));
        assert_eq!(parse_command("  turn -90 "), Ok(ConsoleCommand::Turn(-90.0)));
        assert!(parse_command("walk").is_err());
        assert!(parse_command("walk far").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn navigator_walks_along_yaw() {
        let mut nav = WalkNavigator::new(Vec3::new(0.0, 4.32, 0.0), 0.0);
        nav.walk(2.0);
        assert!((nav.position.z - 2.0).abs() < 1e-5);
        nav.turn_degrees(90.0);
        nav.walk(1.0);
        assert!((nav.position.x - 1.0).abs() < 1e-5);
        assert_eq!(nav.position.y, 4.32);
    }

    #[test]
    fn buttons_are_edge_triggered() {
        let (tx, rx) = mpsc::channel(8);
        let mut input = ConsoleInput::new(rx, WalkNavigator::new(Vec3::ZERO, 0.0));
        tx.try_send("fire".to_string()).unwrap();
        tx.try_send("jump".to_string()).unwrap();

        let first = input.sample();
        assert!(first.fire() && first.jump());
        let second = input.sample();
        assert_eq!(second.buttons, InputButtons::empty());
        assert!(second.view.is_some());
    }

    #[test]
    fn script_runs_out_to_idle() {
        let mut input = ScriptedInput::new([InputFrame::pressed(InputButtons::FIRE)]);
        assert!(input.sample().fire());
        assert_eq!(input.sample(), InputFrame::default());
    }
}
