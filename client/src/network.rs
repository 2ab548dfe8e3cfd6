//! Client-side connection to the game server.

use log::debug;
use shared::{protocol, Connection, NetError, Packet, PollEvents, PollList};
use std::time::Duration;

/// A connected player (or observer). Wraps the transport socket with
/// frame-level reads and the one message clients ever send: `MovePad`.
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Connects to the server and waits for nothing: the first frame the
    /// server sends is the `PlayerAssignment`.
    pub fn connect(host: &str, port: u16) -> Result<Self, NetError> {
        let conn = Connection::connect(host, port)?;
        debug!("Connected to {}:{}", host, port);
        Ok(Self { conn })
    }

    /// Blocks until the next complete frame arrives.
    pub fn next_packet(&mut self) -> Result<Packet, NetError> {
        protocol::read_frame(&mut self.conn)
    }

    /// Non-blocking check: decodes one frame if the socket has pending
    /// data, otherwise returns `None` immediately.
    pub fn try_packet(&mut self) -> Result<Option<Packet>, NetError> {
        let mut poll = PollList::new();
        poll.add(&self.conn, PollEvents::READABLE);
        if poll.poll(0)? == 0 || !poll.events(&self.conn).readable() {
            return Ok(None);
        }
        protocol::read_frame(&mut self.conn).map(Some)
    }

    /// Sends one paddle intent: -1 up, 0 hold, +1 down.
    pub fn send_move(&mut self, direction: i32) -> Result<(), NetError> {
        protocol::write_frame(&mut self.conn, &Packet::MovePad { direction })
    }

    /// Bounds blocking reads; used by tests to assert frame absence.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), NetError> {
        self.conn.set_read_timeout(timeout)
    }
}
