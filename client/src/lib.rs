//! # netpong client library
//!
//! Headless protocol client for the netpong server. It owns the
//! connection and a local view of the match; anything that wants to draw
//! the game or inject input builds on top of these two pieces. The
//! binary in this crate is a plain observer that logs what the server
//! broadcasts.

pub mod game;
pub mod network;

pub use game::ClientView;
pub use network::Client;
