//! The server tick loop: lobby handling, match phases, and pacing.
//!
//! One single-threaded loop drives everything. Each tick it either runs a
//! lobby pass (accept players, drain stray frames, watch for early
//! disconnects) or a match tick (drain inputs, step the ball, broadcast
//! state), then sleeps whatever remains of the tick budget. All polls use
//! a zero timeout so the loop never stalls waiting for network input.
//!
//! Disconnections and I/O failures during a match never kill the process:
//! they end the match, notify the survivor, and drop back to the lobby.
//! Poll and setup failures are fatal and propagate out of [`Server::run`].

use crate::game::{MatchEvent, MatchState};
use crate::lobby::PlayerSlots;
use log::{debug, info, warn};
use shared::{
    protocol, Acceptor, Connection, NetError, Packet, PollEvents, PollList, TICK_RATE,
};
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

const LISTEN_BACKLOG: i32 = 8;

/// Which branch of the loop body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Lobby,
    Match,
}

/// Why a match tick stopped early.
enum TickError {
    /// The player in this slot is gone; end the match.
    Lost(usize),
    /// The multiplexer itself failed; fatal.
    Fatal(NetError),
}

/// The authoritative game server.
#[derive(Debug)]
pub struct Server {
    acceptor: Acceptor,
    slots: PlayerSlots,
    state: MatchState,
    mode: Mode,
    tick_budget: Duration,
}

impl Server {
    /// Binds the listening socket; fatal on failure.
    pub fn bind(host: &str, port: u16) -> Result<Self, NetError> {
        let acceptor = Acceptor::bind(host, port, LISTEN_BACKLOG)?;
        info!("Listening on {}", acceptor.local_addr());
        Ok(Self {
            acceptor,
            slots: PlayerSlots::new(),
            state: MatchState::new(),
            mode: Mode::Lobby,
            tick_budget: Duration::from_secs_f64(1.0 / f64::from(TICK_RATE)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }

    /// Runs the tick loop until a fatal error. There is no graceful
    /// shutdown; the process is expected to be killed externally.
    pub fn run(&mut self) -> Result<(), NetError> {
        info!("Server ready at {} ticks/s", TICK_RATE);
        loop {
            let tick_start = Instant::now();
            match self.mode {
                Mode::Lobby => self.lobby_tick()?,
                Mode::Match => self.match_tick()?,
            }
            pace_tick(tick_start, self.tick_budget);
        }
    }

    fn lobby_tick(&mut self) -> Result<(), NetError> {
        self.lobby_pass()?;
        if self.slots.both_occupied() {
            self.start_match();
        }
        Ok(())
    }

    /// One lobby readiness pass: accepts pending connections into empty
    /// slots, drains and discards frames from waiting players, and clears
    /// the slot of anyone who hung up. The watched set is a snapshot, so
    /// a connection accepted mid-pass is not polled until the next tick.
    fn lobby_pass(&mut self) -> Result<(), NetError> {
        let mut poll = PollList::new();
        poll.add(&self.acceptor, PollEvents::READABLE);
        for (_, conn) in self.slots.occupied() {
            poll.add(conn, PollEvents::READABLE | PollEvents::PEER_CLOSED);
        }

        'pass: while poll.poll(0)? != 0 {
            if poll.events(&self.acceptor).readable() {
                if let Err(e) = self.accept_pending() {
                    // A single failed accept is not fatal; retry next tick.
                    warn!("Accept failed: {}", e);
                    break 'pass;
                }
            }

            for slot in 0..shared::PLAYER_COUNT {
                let Some(conn) = self.slots.get_mut(slot) else {
                    continue;
                };
                let events = poll.events(&*conn);
                if events.hung_up() || events.peer_closed() || events.invalid() {
                    self.drop_pending_player(slot);
                    break 'pass;
                }
                if !events.readable() {
                    continue;
                }
                // Frames sent before the match starts are drained and
                // discarded so stale input cannot leak into the match.
                match protocol::read_frame(conn) {
                    Ok(packet) => {
                        debug!("Discarding pre-match frame from player {}: {:?}", slot + 1, packet)
                    }
                    Err(e) if e.is_connection_loss() => {
                        self.drop_pending_player(slot);
                        break 'pass;
                    }
                    Err(e) => warn!("Bad frame from player {}: {}", slot + 1, e),
                }
            }
        }
        Ok(())
    }

    /// Accepts one connection and assigns it to the first empty slot, or
    /// rejects it outright when both slots are taken.
    fn accept_pending(&mut self) -> Result<(), NetError> {
        let (mut conn, peer) = self.acceptor.accept()?;
        match self.slots.first_empty() {
            Some(slot) => {
                let player = slot as i32 + 1;
                if let Err(e) = protocol::write_frame(&mut conn, &Packet::PlayerAssignment { player })
                {
                    warn!("Player {} from {} left before assignment: {}", player, peer, e);
                    return Ok(());
                }
                info!("Player {} connected from {}", player, peer);
                self.slots.occupy(slot, conn);
            }
            None => {
                warn!("Rejecting connection from {}: both slots are taken", peer);
                conn.close();
            }
        }
        Ok(())
    }

    fn drop_pending_player(&mut self, slot: usize) {
        if let Some(mut conn) = self.slots.clear(slot) {
            conn.close();
        }
        info!("Player {} disconnected in lobby", slot + 1);
    }

    /// Lobby → match transition: announce the start, reinitialize the
    /// match state, and push the opening score and paddle positions.
    fn start_match(&mut self) {
        info!("Both players present, starting match");
        self.mode = Mode::Match;
        self.state.reset();

        let opening = [
            Packet::GameStart,
            Packet::ScoreUpdate {
                player1: self.state.scores[0],
                player2: self.state.scores[1],
            },
            Packet::PadUpdate {
                player1: self.state.pads[0],
                player2: self.state.pads[1],
            },
        ];
        for packet in &opening {
            if let Err(slot) = self.broadcast(packet) {
                self.end_match(slot);
                return;
            }
        }
    }

    fn match_tick(&mut self) -> Result<(), NetError> {
        match self.run_match_phases() {
            Ok(()) => Ok(()),
            Err(TickError::Lost(slot)) => {
                self.end_match(slot);
                Ok(())
            }
            Err(TickError::Fatal(e)) => Err(e),
        }
    }

    fn run_match_phases(&mut self) -> Result<(), TickError> {
        self.drain_inputs()?;
        self.step_simulation().map_err(TickError::Lost)?;
        self.broadcast_state().map_err(TickError::Lost)
    }

    /// Input phase: polls both players with zero timeout until no socket
    /// reports readiness, so every buffered message is consumed this tick.
    /// Each applied `MovePad` immediately broadcasts a `PadUpdate`.
    fn drain_inputs(&mut self) -> Result<(), TickError> {
        let mut poll = PollList::new();
        for (_, conn) in self.slots.occupied() {
            poll.add(conn, PollEvents::READABLE | PollEvents::PEER_CLOSED);
        }

        while poll.poll(0).map_err(TickError::Fatal)? != 0 {
            for slot in 0..shared::PLAYER_COUNT {
                let Some(conn) = self.slots.get_mut(slot) else {
                    continue;
                };
                let events = poll.events(&*conn);
                if events.hung_up() || events.peer_closed() || events.invalid() {
                    return Err(TickError::Lost(slot));
                }
                if !events.readable() {
                    continue;
                }
                let packet = match protocol::read_frame(conn) {
                    Ok(packet) => packet,
                    Err(e) if e.is_connection_loss() => return Err(TickError::Lost(slot)),
                    Err(e) => {
                        // Framing survives a malformed payload; skip it.
                        warn!("Bad frame from player {}: {}", slot + 1, e);
                        continue;
                    }
                };
                match packet {
                    Packet::MovePad { direction } => {
                        self.state.move_pad(slot, direction);
                        self.broadcast(&Packet::PadUpdate {
                            player1: self.state.pads[0],
                            player2: self.state.pads[1],
                        })
                        .map_err(TickError::Lost)?;
                    }
                    other => debug!("Ignoring {:?} from player {}", other, slot + 1),
                }
            }
        }
        Ok(())
    }

    /// Physics phase: one ball step, plus a `ScoreUpdate` broadcast for
    /// every score event the step produced.
    fn step_simulation(&mut self) -> Result<(), usize> {
        for event in self.state.advance_ball() {
            match event {
                MatchEvent::Scored => {
                    info!(
                        "Score is now {} - {}",
                        self.state.scores[0], self.state.scores[1]
                    );
                    self.broadcast(&Packet::ScoreUpdate {
                        player1: self.state.scores[0],
                        player2: self.state.scores[1],
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Broadcast phase: every tick sends a header-only `Tick` and the
    /// ball position, whether or not anything moved.
    fn broadcast_state(&mut self) -> Result<(), usize> {
        self.broadcast(&Packet::Tick)?;
        self.broadcast(&Packet::BallUpdate {
            position: self.state.ball,
        })
    }

    /// Sends a frame to both players, attempting each send independently.
    /// On failure returns the first slot that failed.
    fn broadcast(&mut self, packet: &Packet) -> Result<(), usize> {
        let (slots, connections): (Vec<usize>, Vec<&mut Connection>) =
            self.slots.occupied_mut().unzip();
        let failures = protocol::broadcast(connections, packet);
        for (index, e) in &failures {
            warn!("Send to player {} failed: {}", slots[*index] + 1, e);
        }
        match failures.first() {
            Some((index, _)) => Err(slots[*index]),
            None => Ok(()),
        }
    }

    /// Match → lobby transition after a disconnect: the lost socket is
    /// closed and its slot emptied, the survivor gets one `GameEnd` and
    /// keeps its slot, and the match state is abandoned.
    fn end_match(&mut self, lost: usize) {
        info!("Player {} disconnected, ending match", lost + 1);
        if let Some(mut conn) = self.slots.clear(lost) {
            conn.close();
        }

        let survivor = 1 - lost;
        if let Some(conn) = self.slots.get_mut(survivor) {
            if let Err(e) = protocol::write_frame(conn, &Packet::GameEnd) {
                warn!("Could not notify player {}: {}", survivor + 1, e);
                if let Some(mut conn) = self.slots.clear(survivor) {
                    conn.close();
                }
            }
        }
        self.mode = Mode::Lobby;
    }
}

/// Sleeps out the remainder of the tick budget. A tick that ran over
/// budget skips sleeping entirely and reports the degraded rate; the loop
/// never attempts catch-up ticks.
fn pace_tick(tick_start: Instant, budget: Duration) -> bool {
    let elapsed = tick_start.elapsed();
    match budget.checked_sub(elapsed) {
        Some(remaining) => {
            thread::sleep(remaining);
            true
        }
        None => {
            warn!(
                "Tick took {:.2}ms, over the {:.2}ms budget; running slow",
                elapsed.as_secs_f64() * 1000.0,
                budget.as_secs_f64() * 1000.0
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_tick_sleeps_out_the_budget() {
        let budget = Duration::from_millis(20);
        let start = Instant::now();
        assert!(pace_tick(start, budget));
        assert!(start.elapsed() >= budget);
    }

    #[test]
    fn slow_tick_skips_sleeping() {
        let budget = Duration::from_millis(5);
        let start = Instant::now();
        thread::sleep(Duration::from_millis(10));
        let before_pace = start.elapsed();
        assert!(!pace_tick(start, budget));
        // No catch-up sleep happened.
        assert!(start.elapsed() < before_pace + Duration::from_millis(5));
    }

    #[test]
    fn bind_starts_in_lobby_mode() {
        let server = Server::bind("127.0.0.1", 0).unwrap();
        assert_eq!(server.mode, Mode::Lobby);
        assert_eq!(server.state, MatchState::new());
        assert_ne!(server.local_addr().port(), 0);
    }

    #[test]
    fn third_accept_while_full_is_rejected_and_closed() {
        let mut server = Server::bind("127.0.0.1", 0).unwrap();
        let port = server.local_addr().port();

        // All three connects complete through the listen backlog before
        // any accept happens, so one lobby pass would see all of them.
        let mut clients: Vec<Connection> = (0..3)
            .map(|_| Connection::connect("127.0.0.1", port).unwrap())
            .collect();
        for _ in 0..3 {
            server.accept_pending().unwrap();
        }
        assert!(server.slots.both_occupied());

        assert_eq!(
            protocol::read_frame(&mut clients[0]).unwrap(),
            Packet::PlayerAssignment { player: 1 }
        );
        assert_eq!(
            protocol::read_frame(&mut clients[1]).unwrap(),
            Packet::PlayerAssignment { player: 2 }
        );

        // The rejected connection gets no assignment, just a close.
        clients[2]
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();
        match protocol::read_frame(&mut clients[2]) {
            Err(NetError::Disconnected) => {}
            other => panic!("expected an immediate close, got {other:?}"),
        }
    }

    #[test]
    fn bind_rejects_garbage_address() {
        match Server::bind("localhost", 25565) {
            Err(NetError::Bind(_)) => {}
            other => panic!("expected bind error, got {other:?}"),
        }
    }
}
