//! Authoritative match simulation.
//!
//! [`MatchState`] is the single source of truth for a running match. It is
//! pure state plus math: the network layer feeds it paddle intents, steps
//! the ball once per tick, and broadcasts whatever events come back out.
//! Keeping the simulation free of sockets makes every rule testable in
//! isolation.

use shared::{
    Position, BALL_BASE_SPEED, BALL_MAX_SPEED, BALL_SIZE, BALL_SPEEDUP, PAD_HEIGHT, PAD_OFFSET,
    PAD_SPEED, PAD_WIDTH, PLAYER_COUNT, TICK_RATE, WINDOW_HEIGHT, WINDOW_WIDTH,
};
use std::f64::consts::PI;

/// Events a simulation step produces that the players must hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// Somebody scored; broadcast the new totals.
    Scored,
}

/// Everything that defines a match in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    pub ball: Position,
    /// Ball travel angle in radians; 0 points right, angles grow
    /// counter-clockwise in screen space (y is negated when applied).
    pub ball_angle: f64,
    /// Pixels per second, kept within `[BALL_BASE_SPEED, BALL_MAX_SPEED]`.
    pub ball_speed: f64,
    /// Paddle vertical centers, player 1 then player 2.
    pub pads: [f64; PLAYER_COUNT],
    pub scores: [i32; PLAYER_COUNT],
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchState {
    /// Starting values for a fresh match: ball centered moving toward
    /// player 1, paddles centered, scores zeroed.
    pub fn new() -> Self {
        Self {
            ball: Position {
                x: WINDOW_WIDTH / 2.0,
                y: WINDOW_HEIGHT / 2.0,
            },
            ball_angle: PI,
            ball_speed: BALL_BASE_SPEED,
            pads: [WINDOW_HEIGHT / 2.0; PLAYER_COUNT],
            scores: [0; PLAYER_COUNT],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Applies one `MovePad` intent to the given slot's paddle and clamps
    /// it so the paddle stays fully on screen.
    pub fn move_pad(&mut self, slot: usize, direction: i32) {
        let step = f64::from(direction.clamp(-1, 1)) * PAD_SPEED / f64::from(TICK_RATE);
        let pad = &mut self.pads[slot];
        *pad += step;
        if *pad - PAD_HEIGHT / 2.0 < 0.0 {
            *pad = PAD_HEIGHT / 2.0;
        }
        if *pad + PAD_HEIGHT / 2.0 >= WINDOW_HEIGHT {
            *pad = WINDOW_HEIGHT - PAD_HEIGHT / 2.0;
        }
    }

    /// Advances the ball one tick and resolves collisions in fixed order:
    /// left crossing, right crossing, top clamp, bottom clamp, paddle 1,
    /// paddle 2. The checks are independent, never short-circuited, so a
    /// corner tick can trigger more than one resolution.
    pub fn advance_ball(&mut self) -> Vec<MatchEvent> {
        let dt = 1.0 / f64::from(TICK_RATE);
        self.ball.x += self.ball_angle.cos() * self.ball_speed * dt;
        self.ball.y += -self.ball_angle.sin() * self.ball_speed * dt;

        let mut events = Vec::new();

        // Ball fully past the left edge: player 2 scores.
        if self.ball.x + BALL_SIZE / 2.0 < 0.0 {
            self.scores[1] += 1;
            self.serve(0.0);
            events.push(MatchEvent::Scored);
        }
        // Ball fully past the right edge: player 1 scores.
        if self.ball.x - BALL_SIZE / 2.0 >= WINDOW_WIDTH {
            self.scores[0] += 1;
            self.serve(PI);
            events.push(MatchEvent::Scored);
        }

        if self.ball.y < 5.0 {
            self.ball.y = 5.0;
            self.bounce_off_wall();
        }
        if self.ball.y > WINDOW_HEIGHT - 5.0 {
            self.ball.y = WINDOW_HEIGHT - 5.0;
            self.bounce_off_wall();
        }

        // Player 1 paddle face.
        if self.ball_overlaps_pad(PAD_OFFSET, self.pads[0]) {
            self.ball.x = PAD_OFFSET + PAD_WIDTH / 2.0 + BALL_SIZE / 2.0;
            let strike = (self.pads[0] - self.ball.y) / PAD_HEIGHT * 2.0;
            self.ball_angle = strike * (PI / 4.0);
            self.speed_up();
        }
        // Player 2 paddle face.
        if self.ball_overlaps_pad(WINDOW_WIDTH - PAD_OFFSET, self.pads[1]) {
            self.ball.x = WINDOW_WIDTH - PAD_OFFSET - PAD_WIDTH / 2.0 - BALL_SIZE / 2.0;
            let strike = (self.ball.y - self.pads[1]) / PAD_HEIGHT * 2.0;
            self.ball_angle = strike * (PI / 4.0) + PI;
            self.speed_up();
        }

        events
    }

    /// Recenters the ball after a point, serving toward the given angle
    /// at base speed.
    fn serve(&mut self, angle: f64) {
        self.ball = Position {
            x: WINDOW_WIDTH / 2.0,
            y: WINDOW_HEIGHT / 2.0,
        };
        self.ball_angle = angle;
        self.ball_speed = BALL_BASE_SPEED;
    }

    fn bounce_off_wall(&mut self) {
        self.ball_angle = 2.0 * PI - self.ball_angle;
        self.speed_up();
    }

    fn speed_up(&mut self) {
        self.ball_speed = (self.ball_speed * BALL_SPEEDUP).min(BALL_MAX_SPEED);
    }

    fn ball_overlaps_pad(&self, pad_center_x: f64, pad_center_y: f64) -> bool {
        rects_intersect(
            self.ball.x - BALL_SIZE / 2.0,
            self.ball.y - BALL_SIZE / 2.0,
            BALL_SIZE,
            BALL_SIZE,
            pad_center_x - PAD_WIDTH / 2.0,
            pad_center_y - PAD_HEIGHT / 2.0,
            PAD_WIDTH,
            PAD_HEIGHT,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn rects_intersect(
    x1: f64,
    y1: f64,
    w1: f64,
    h1: f64,
    x2: f64,
    y2: f64,
    w2: f64,
    h2: f64,
) -> bool {
    x1 < x2 + w2 && x1 + w1 > x2 && y1 < y2 + h2 && y1 + h1 > y2
}
