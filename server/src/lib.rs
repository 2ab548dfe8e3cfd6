//! # netpong server
//!
//! The authoritative side of a two-player networked Pong match. Clients
//! connect over TCP, get assigned a player slot, and from then on only
//! send paddle intents; the server owns the whole simulation and
//! broadcasts every authoritative state change in the order it happened,
//! so both players observe the same match.
//!
//! ## Architecture
//!
//! A single-threaded tick loop at 144 Hz drives all I/O and simulation.
//! There are no locks and no other threads: the loop polls its sockets
//! with a zero timeout each tick, services whatever is ready, advances
//! the simulation, broadcasts, and sleeps out the rest of the tick
//! budget. Slow ticks degrade the observed rate (with a warning) rather
//! than triggering catch-up ticks.
//!
//! ## Modules
//!
//! - [`game`]: the match simulation with paddles, ball, collisions, score.
//! - [`lobby`]: the two fixed player slots.
//! - [`network`]: the [`network::Server`] tick loop with lobby passes,
//!   match phases, disconnect handling, pacing.

pub mod game;
pub mod lobby;
pub mod network;
