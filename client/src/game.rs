//! Local view of the authoritative match state.
//!
//! The client never simulates anything; it folds the server's broadcast
//! frames into a plain view that a renderer (or a test) can read.

use shared::{Packet, Position, WINDOW_HEIGHT, WINDOW_WIDTH};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientView {
    /// Slot number the server assigned us, once known.
    pub player: Option<i32>,
    pub pads: (f64, f64),
    pub ball: Position,
    pub scores: (i32, i32),
    /// True between `GameStart` and `GameEnd`.
    pub started: bool,
}

impl Default for ClientView {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientView {
    pub fn new() -> Self {
        Self {
            player: None,
            pads: (WINDOW_HEIGHT / 2.0, WINDOW_HEIGHT / 2.0),
            ball: Position {
                x: WINDOW_WIDTH / 2.0,
                y: WINDOW_HEIGHT / 2.0,
            },
            scores: (0, 0),
            started: false,
        }
    }

    /// Applies one server frame to the view. Frames the view does not
    /// care about (`Tick`, `MovePad`) leave it untouched.
    pub fn apply(&mut self, packet: &Packet) {
        match *packet {
            Packet::PlayerAssignment { player } => self.player = Some(player),
            Packet::BallUpdate { position } => self.ball = position,
            Packet::PadUpdate { player1, player2 } => self.pads = (player1, player2),
            Packet::ScoreUpdate { player1, player2 } => self.scores = (player1, player2),
            Packet::GameStart => self.started = true,
            Packet::GameEnd => self.started = false,
            Packet::Tick | Packet::MovePad { .. } => {}
        }
    }
}
