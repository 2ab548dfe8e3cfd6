use std::io;
use thiserror::Error;

/// Error taxonomy for the transport and protocol layers.
///
/// An orderly peer close is a dedicated [`NetError::Disconnected`] variant
/// rather than a generic I/O error: it is the designed way a match ends
/// early, and callers pattern-match on it instead of inspecting error
/// kinds. Setup and poll failures are fatal to the server; read/write
/// failures during a match are treated like a disconnection.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("bind failed: {0}")]
    Bind(#[source] io::Error),

    #[error("listen failed: {0}")]
    Listen(#[source] io::Error),

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// The peer closed its end of the connection in an orderly fashion.
    #[error("peer disconnected")]
    Disconnected,

    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),

    #[error("unknown message type tag {0}")]
    UnknownType(u8),

    /// The header declared a payload larger than any frame can carry.
    /// The payload is never read, so the stream is no longer framed and
    /// the connection must be dropped.
    #[error("declared payload length {0} exceeds the largest valid frame")]
    FrameTooLarge(usize),

    #[error("bad {expected}-byte payload for {tag:?}: got {actual} bytes")]
    Payload {
        tag: crate::protocol::MessageType,
        expected: usize,
        actual: usize,
    },

    #[error("payload codec failed: {0}")]
    Codec(#[source] bincode::Error),
}

impl NetError {
    /// True for errors that end a connection: the orderly-close path, any
    /// read/write failure, and a frame header whose declared length
    /// desyncs the stream.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            NetError::Disconnected
                | NetError::Read(_)
                | NetError::Write(_)
                | NetError::FrameTooLarge(_)
        )
    }
}
