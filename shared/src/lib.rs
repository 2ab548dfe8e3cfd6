//! Shared protocol and transport layer for the netpong server and client.
//!
//! Both binaries speak the same framed binary protocol over TCP: a 1-byte
//! message tag, a little-endian u32 payload length, then the payload. The
//! modules here own everything both sides need: the blocking socket
//! wrappers, the poll(2) readiness multiplexer, the frame codec, and the
//! gameplay constants that are part of the wire contract.

pub mod connection;
pub mod error;
pub mod poll;
pub mod protocol;

pub use connection::{Acceptor, Connection};
pub use error::NetError;
pub use poll::{PollEvents, PollList};
pub use protocol::{MessageType, Packet, Position};

/// TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 25565;

pub const WINDOW_WIDTH: f64 = 800.0;
pub const WINDOW_HEIGHT: f64 = 600.0;
pub const PAD_WIDTH: f64 = 10.0;
pub const PAD_HEIGHT: f64 = 80.0;
pub const BALL_SIZE: f64 = 10.0;
/// Distance from the screen edge to each paddle's center line.
pub const PAD_OFFSET: f64 = 20.0;
pub const BALL_BASE_SPEED: f64 = 400.0;
pub const BALL_MAX_SPEED: f64 = 600.0;
/// Multiplier applied to the ball speed on every bounce, capped at
/// [`BALL_MAX_SPEED`].
pub const BALL_SPEEDUP: f64 = 1.1;
pub const PAD_SPEED: f64 = 350.0;
/// Logical simulation rate in ticks per second.
pub const TICK_RATE: u32 = 144;
/// Number of player slots in a match.
pub const PLAYER_COUNT: usize = 2;
