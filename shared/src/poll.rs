//! Readiness multiplexer over poll(2).
//!
//! The tick loop never blocks on a socket that has nothing pending: every
//! pass it polls the watched set with a zero timeout, services whatever is
//! ready, and moves on. [`PollList`] owns the `pollfd` array; sockets are
//! identified by raw fd, so the list never borrows the sockets themselves
//! and callers stay free to mutate them between polls.

use crate::error::NetError;
use std::io;
use std::ops::BitOr;
use std::os::unix::io::AsRawFd;

/// Readiness flags for one socket, both as registered interest and as
/// poll results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollEvents(libc::c_short);

impl PollEvents {
    pub const READABLE: PollEvents = PollEvents(libc::POLLIN);
    pub const WRITABLE: PollEvents = PollEvents(libc::POLLOUT);
    /// The peer closed its write half (`POLLRDHUP`). Must be part of the
    /// registered interest to be reported.
    pub const PEER_CLOSED: PollEvents = PollEvents(libc::POLLRDHUP);

    pub fn readable(self) -> bool {
        self.0 & libc::POLLIN != 0
    }

    pub fn writable(self) -> bool {
        self.0 & libc::POLLOUT != 0
    }

    pub fn peer_closed(self) -> bool {
        self.0 & libc::POLLRDHUP != 0
    }

    pub fn hung_up(self) -> bool {
        self.0 & libc::POLLHUP != 0
    }

    pub fn invalid(self) -> bool {
        self.0 & libc::POLLNVAL != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PollEvents {
    type Output = PollEvents;

    fn bitor(self, rhs: PollEvents) -> PollEvents {
        PollEvents(self.0 | rhs.0)
    }
}

/// A watched set of sockets.
#[derive(Debug, Default)]
pub struct PollList {
    fds: Vec<libc::pollfd>,
}

impl PollList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watches a socket for the given interest. Adding the same fd twice
    /// is the caller's bug; poll would report it twice.
    pub fn add(&mut self, socket: &impl AsRawFd, interest: PollEvents) {
        self.fds.push(libc::pollfd {
            fd: socket.as_raw_fd(),
            events: interest.0,
            revents: 0,
        });
    }

    pub fn remove(&mut self, socket: &impl AsRawFd) {
        let fd = socket.as_raw_fd();
        self.fds.retain(|p| p.fd != fd);
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }

    /// Polls the watched set, returning how many sockets reported at
    /// least one event. A timeout of 0 is a non-blocking check; a
    /// negative timeout blocks indefinitely.
    pub fn poll(&mut self, timeout_ms: i32) -> Result<usize, NetError> {
        for p in &mut self.fds {
            p.revents = 0;
        }
        let rc = unsafe {
            libc::poll(
                self.fds.as_mut_ptr(),
                self.fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };
        if rc < 0 {
            return Err(NetError::Poll(io::Error::last_os_error()));
        }
        Ok(rc as usize)
    }

    /// Events reported for a socket by the most recent poll. A socket
    /// that is not in the watched set reports no events, so callers can
    /// probe sockets accepted mid-pass without special-casing them.
    pub fn events(&self, socket: &impl AsRawFd) -> PollEvents {
        let fd = socket.as_raw_fd();
        self.fds
            .iter()
            .find(|p| p.fd == fd)
            .map(|p| PollEvents(p.revents))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Acceptor, Connection};
    use std::thread;

    fn loopback_pair() -> (Connection, Connection) {
        let acceptor = Acceptor::bind("127.0.0.1", 0, 1).unwrap();
        let port = acceptor.local_addr().port();
        let handle = thread::spawn(move || Connection::connect("127.0.0.1", port).unwrap());
        let (accepted, _) = acceptor.accept().unwrap();
        (accepted, handle.join().unwrap())
    }

    #[test]
    fn empty_list_reports_nothing() {
        let mut poll = PollList::new();
        assert!(poll.is_empty());
        assert_eq!(poll.poll(0).unwrap(), 0);
    }

    #[test]
    fn idle_socket_is_not_ready() {
        let (server, _client) = loopback_pair();
        let mut poll = PollList::new();
        poll.add(&server, PollEvents::READABLE);
        assert_eq!(poll.poll(0).unwrap(), 0);
        assert!(poll.events(&server).is_empty());
    }

    #[test]
    fn pending_data_reports_readable() {
        let (server, mut client) = loopback_pair();
        client.send_all(b"hi").unwrap();
        let mut poll = PollList::new();
        poll.add(&server, PollEvents::READABLE);
        // Give loopback delivery a moment via a short blocking poll.
        assert_eq!(poll.poll(1000).unwrap(), 1);
        assert!(poll.events(&server).readable());
    }

    #[test]
    fn peer_close_reports_hangup() {
        let (server, client) = loopback_pair();
        drop(client);
        let mut poll = PollList::new();
        poll.add(&server, PollEvents::READABLE | PollEvents::PEER_CLOSED);
        assert!(poll.poll(1000).unwrap() >= 1);
        let events = poll.events(&server);
        assert!(events.peer_closed() || events.hung_up());
    }

    #[test]
    fn removed_socket_is_not_polled() {
        let (server, mut client) = loopback_pair();
        client.send_all(b"hi").unwrap();
        let mut poll = PollList::new();
        poll.add(&server, PollEvents::READABLE);
        poll.remove(&server);
        assert!(poll.is_empty());
        assert_eq!(poll.poll(0).unwrap(), 0);
        assert!(poll.events(&server).is_empty());
    }

    #[test]
    fn unknown_socket_reports_empty_events() {
        let (server, client) = loopback_pair();
        let mut poll = PollList::new();
        poll.add(&server, PollEvents::READABLE);
        poll.poll(0).unwrap();
        assert!(poll.events(&client).is_empty());
        assert_eq!(poll.len(), 1);
    }

    #[test]
    fn interest_flags_combine() {
        let both = PollEvents::READABLE | PollEvents::WRITABLE;
        assert!(both.readable());
        assert!(both.writable());
        assert!(!both.hung_up());
        assert!(!both.invalid());
    }
}
