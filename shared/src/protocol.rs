//! The framed binary message codec.
//!
//! Every frame on the wire is a 1-byte [`MessageType`] tag, an unsigned
//! 32-bit little-endian payload length, then exactly that many payload
//! bytes. Payload bodies are fixed-width little-endian values encoded
//! with bincode; the header is written field by field so the wire format
//! never depends on in-memory struct layout.
//!
//! A receiver always consumes the full declared payload before
//! interpreting anything, so a frame with an unknown tag or an unexpected
//! payload size can be discarded without losing stream framing. The one
//! exception is a declared length above [`MAX_PAYLOAD_LEN`]: no valid
//! frame is that large, so the length is rejected before any buffer is
//! allocated and the connection must be dropped, because its remaining
//! bytes can no longer be framed.

use crate::connection::Connection;
use crate::error::NetError;
use serde::{Deserialize, Serialize};

/// Fixed frame header size: tag byte plus u32 length.
pub const HEADER_LEN: usize = 5;

/// Largest payload any message type carries. The length field is
/// peer-controlled, so it is checked against this bound before a payload
/// buffer is allocated.
pub const MAX_PAYLOAD_LEN: usize = 16;

/// A 2D point in window pixel space, origin top-left, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Wire tag values. The closed set of frame types, one byte each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    MovePad = 0,
    Tick = 1,
    BallUpdate = 2,
    PadUpdate = 3,
    ScoreUpdate = 4,
    PlayerAssignment = 5,
    GameStart = 6,
    GameEnd = 7,
}

impl TryFrom<u8> for MessageType {
    type Error = NetError;

    fn try_from(tag: u8) -> Result<Self, NetError> {
        match tag {
            0 => Ok(MessageType::MovePad),
            1 => Ok(MessageType::Tick),
            2 => Ok(MessageType::BallUpdate),
            3 => Ok(MessageType::PadUpdate),
            4 => Ok(MessageType::ScoreUpdate),
            5 => Ok(MessageType::PlayerAssignment),
            6 => Ok(MessageType::GameStart),
            7 => Ok(MessageType::GameEnd),
            other => Err(NetError::UnknownType(other)),
        }
    }
}

impl MessageType {
    /// Exact payload size each tag carries.
    pub fn payload_len(self) -> usize {
        match self {
            MessageType::MovePad | MessageType::PlayerAssignment => 4,
            MessageType::BallUpdate | MessageType::PadUpdate => 16,
            MessageType::ScoreUpdate => 8,
            MessageType::Tick | MessageType::GameStart | MessageType::GameEnd => 0,
        }
    }
}

/// One fully decoded protocol message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Packet {
    /// Client → server paddle intent: -1 up, 0 hold, +1 down.
    MovePad { direction: i32 },
    Tick,
    BallUpdate { position: Position },
    /// Both paddle vertical centers, player 1 then player 2.
    PadUpdate { player1: f64, player2: f64 },
    ScoreUpdate { player1: i32, player2: i32 },
    /// Slot number handed to a freshly accepted player: 1 or 2.
    PlayerAssignment { player: i32 },
    GameStart,
    GameEnd,
}

impl Packet {
    pub fn message_type(&self) -> MessageType {
        match self {
            Packet::MovePad { .. } => MessageType::MovePad,
            Packet::Tick => MessageType::Tick,
            Packet::BallUpdate { .. } => MessageType::BallUpdate,
            Packet::PadUpdate { .. } => MessageType::PadUpdate,
            Packet::ScoreUpdate { .. } => MessageType::ScoreUpdate,
            Packet::PlayerAssignment { .. } => MessageType::PlayerAssignment,
            Packet::GameStart => MessageType::GameStart,
            Packet::GameEnd => MessageType::GameEnd,
        }
    }

    /// Serializes the payload body (little-endian, fixed widths).
    pub fn payload(&self) -> Result<Vec<u8>, NetError> {
        let bytes = match self {
            Packet::MovePad { direction } => bincode::serialize(direction),
            Packet::BallUpdate { position } => bincode::serialize(position),
            Packet::PadUpdate { player1, player2 } => bincode::serialize(&(player1, player2)),
            Packet::ScoreUpdate { player1, player2 } => bincode::serialize(&(player1, player2)),
            Packet::PlayerAssignment { player } => bincode::serialize(player),
            Packet::Tick | Packet::GameStart | Packet::GameEnd => Ok(Vec::new()),
        };
        bytes.map_err(NetError::Codec)
    }

    /// Rebuilds a packet from a tag and its full payload.
    pub fn decode(tag: u8, payload: &[u8]) -> Result<Packet, NetError> {
        let message_type = MessageType::try_from(tag)?;
        let expected = message_type.payload_len();
        if payload.len() != expected {
            return Err(NetError::Payload {
                tag: message_type,
                expected,
                actual: payload.len(),
            });
        }
        let packet = match message_type {
            MessageType::MovePad => Packet::MovePad {
                direction: bincode::deserialize(payload).map_err(NetError::Codec)?,
            },
            MessageType::Tick => Packet::Tick,
            MessageType::BallUpdate => Packet::BallUpdate {
                position: bincode::deserialize(payload).map_err(NetError::Codec)?,
            },
            MessageType::PadUpdate => {
                let (player1, player2) =
                    bincode::deserialize(payload).map_err(NetError::Codec)?;
                Packet::PadUpdate { player1, player2 }
            }
            MessageType::ScoreUpdate => {
                let (player1, player2) =
                    bincode::deserialize(payload).map_err(NetError::Codec)?;
                Packet::ScoreUpdate { player1, player2 }
            }
            MessageType::PlayerAssignment => Packet::PlayerAssignment {
                player: bincode::deserialize(payload).map_err(NetError::Codec)?,
            },
            MessageType::GameStart => Packet::GameStart,
            MessageType::GameEnd => Packet::GameEnd,
        };
        Ok(packet)
    }
}

/// Writes one frame: tag, then length, then payload, each all-or-nothing.
pub fn write_frame(conn: &mut Connection, packet: &Packet) -> Result<(), NetError> {
    let payload = packet.payload()?;
    conn.send_all(&[packet.message_type() as u8])?;
    conn.send_all(&(payload.len() as u32).to_le_bytes())?;
    if !payload.is_empty() {
        conn.send_all(&payload)?;
    }
    Ok(())
}

/// Reads one complete frame, blocking until header and payload have both
/// arrived. Disconnection and read failures propagate unchanged from the
/// underlying socket.
pub fn read_frame(conn: &mut Connection) -> Result<Packet, NetError> {
    let mut header = [0u8; HEADER_LEN];
    conn.recv_exact(&mut header)?;
    let length = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if length > MAX_PAYLOAD_LEN {
        return Err(NetError::FrameTooLarge(length));
    }
    let mut payload = vec![0u8; length];
    if length > 0 {
        conn.recv_exact(&mut payload)?;
    }
    Packet::decode(header[0], &payload)
}

/// Encodes the same frame to every connection, attempting each send even
/// after one fails. Returns the failures paired with the index of the
/// connection they occurred on; the caller owns per-socket handling.
pub fn broadcast<'a, I>(connections: I, packet: &Packet) -> Vec<(usize, NetError)>
where
    I: IntoIterator<Item = &'a mut Connection>,
{
    let mut failures = Vec::new();
    for (index, conn) in connections.into_iter().enumerate() {
        if let Err(e) = write_frame(conn, packet) {
            failures.push((index, e));
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Acceptor;
    use std::f64::consts::PI;
    use std::thread;

    fn loopback_pair() -> (Connection, Connection) {
        let acceptor = Acceptor::bind("127.0.0.1", 0, 1).unwrap();
        let port = acceptor.local_addr().port();
        let handle = thread::spawn(move || Connection::connect("127.0.0.1", port).unwrap());
        let (accepted, _) = acceptor.accept().unwrap();
        (accepted, handle.join().unwrap())
    }

    #[test]
    fn payload_layout_is_little_endian() {
        let payload = Packet::MovePad { direction: -1 }.payload().unwrap();
        assert_eq!(payload, (-1i32).to_le_bytes());

        let payload = Packet::ScoreUpdate {
            player1: 3,
            player2: 7,
        }
        .payload()
        .unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&3i32.to_le_bytes());
        expected.extend_from_slice(&7i32.to_le_bytes());
        assert_eq!(payload, expected);

        let payload = Packet::PadUpdate {
            player1: 300.0,
            player2: 420.5,
        }
        .payload()
        .unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&300.0f64.to_le_bytes());
        expected.extend_from_slice(&420.5f64.to_le_bytes());
        assert_eq!(payload, expected);
    }

    #[test]
    fn header_only_frames_have_empty_payloads() {
        for packet in [Packet::Tick, Packet::GameStart, Packet::GameEnd] {
            assert!(packet.payload().unwrap().is_empty());
            assert_eq!(packet.message_type().payload_len(), 0);
        }
    }

    #[test]
    fn wire_bytes_match_the_frame_table() {
        let (mut receiver, mut sender) = loopback_pair();
        write_frame(
            &mut sender,
            &Packet::ScoreUpdate {
                player1: 1,
                player2: 2,
            },
        )
        .unwrap();

        let mut raw = [0u8; 13];
        receiver.recv_exact(&mut raw).unwrap();
        assert_eq!(raw[0], MessageType::ScoreUpdate as u8);
        assert_eq!(u32::from_le_bytes([raw[1], raw[2], raw[3], raw[4]]), 8);
        assert_eq!(raw[5..9], 1i32.to_le_bytes());
        assert_eq!(raw[9..13], 2i32.to_le_bytes());
    }

    #[test]
    fn every_packet_type_survives_a_frame_roundtrip() {
        let packets = [
            Packet::MovePad { direction: 1 },
            Packet::Tick,
            Packet::BallUpdate {
                position: Position { x: 400.0, y: 300.0 },
            },
            Packet::PadUpdate {
                player1: 40.0,
                player2: 560.0,
            },
            Packet::ScoreUpdate {
                player1: 0,
                player2: 0,
            },
            Packet::PlayerAssignment { player: 2 },
            Packet::GameStart,
            Packet::GameEnd,
        ];

        let (mut receiver, mut sender) = loopback_pair();
        for packet in &packets {
            write_frame(&mut sender, packet).unwrap();
        }
        for packet in &packets {
            assert_eq!(read_frame(&mut receiver).unwrap(), *packet);
        }
    }

    #[test]
    fn ball_update_carries_exact_floats() {
        let (mut receiver, mut sender) = loopback_pair();
        let sent = Packet::BallUpdate {
            position: Position { x: PI, y: -0.0 },
        };
        write_frame(&mut sender, &sent).unwrap();
        match read_frame(&mut receiver).unwrap() {
            Packet::BallUpdate { position } => {
                assert_eq!(position.x.to_bits(), PI.to_bits());
                assert_eq!(position.y.to_bits(), (-0.0f64).to_bits());
            }
            other => panic!("wrong packet type: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_rejected_without_breaking_framing() {
        let (mut receiver, mut sender) = loopback_pair();
        // Tag 42 with a 4-byte payload, followed by a valid Tick.
        sender.send_all(&[42]).unwrap();
        sender.send_all(&4u32.to_le_bytes()).unwrap();
        sender.send_all(&[0, 0, 0, 0]).unwrap();
        write_frame(&mut sender, &Packet::Tick).unwrap();

        match read_frame(&mut receiver) {
            Err(NetError::UnknownType(42)) => {}
            other => panic!("expected UnknownType, got {other:?}"),
        }
        assert_eq!(read_frame(&mut receiver).unwrap(), Packet::Tick);
    }

    #[test]
    fn hostile_declared_length_is_rejected_before_allocation() {
        let (mut receiver, mut sender) = loopback_pair();
        // A full header claiming a 4 GiB Tick payload, with the peer left
        // open: the reader must reject the length up front, not allocate
        // and wait for payload bytes that never come.
        sender.send_all(&[MessageType::Tick as u8]).unwrap();
        sender.send_all(&u32::MAX.to_le_bytes()).unwrap();

        match read_frame(&mut receiver) {
            Err(NetError::FrameTooLarge(declared)) => {
                assert_eq!(declared, u32::MAX as usize);
            }
            other => panic!("expected FrameTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn oversized_length_ends_the_connection() {
        assert!(NetError::FrameTooLarge(u32::MAX as usize).is_connection_loss());
        // The largest real payload still passes the bound.
        assert_eq!(MessageType::BallUpdate.payload_len(), MAX_PAYLOAD_LEN);
        assert_eq!(MessageType::PadUpdate.payload_len(), MAX_PAYLOAD_LEN);
    }

    #[test]
    fn wrong_payload_length_is_rejected() {
        match Packet::decode(MessageType::MovePad as u8, &[1, 2]) {
            Err(NetError::Payload {
                tag: MessageType::MovePad,
                expected: 4,
                actual: 2,
            }) => {}
            other => panic!("expected Payload error, got {other:?}"),
        }
    }

    #[test]
    fn disconnection_propagates_from_decode() {
        let (mut receiver, sender) = loopback_pair();
        drop(sender);
        match read_frame(&mut receiver) {
            Err(NetError::Disconnected) => {}
            other => panic!("expected Disconnected, got {other:?}"),
        }
    }

    #[test]
    fn broadcast_reaches_every_socket_despite_one_failure() {
        let (mut recv_a, send_a) = loopback_pair();
        let (mut recv_b, send_b) = loopback_pair();
        let mut dead = send_a;
        dead.close();
        let mut alive = send_b;

        let failures = broadcast([&mut dead, &mut alive], &Packet::GameEnd);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 0);

        assert_eq!(read_frame(&mut recv_b).unwrap(), Packet::GameEnd);
        drop(recv_a);
    }
}
