//! Error types shared between the feed client and the simulator.
//!
//! The `FeedError` enum unifies transport failures, structural decode failures,
//! configuration problems and serialization errors, allowing crates to propagate a
//! single error type. Structural variants are fatal to the frame being decoded;
//! the connection loop answers every one of them by reconnecting.
use std::io;

use thiserror::Error;

/// Unified error type shared by client and simulator.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error originating from sockets or files, including read timeouts.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// The declared segment, or a single field, runs past the end of the buffer.
    #[error("insufficient data: need {need} bytes at offset {offset}, have {have}")]
    InsufficientData {
        /// Cursor position where the read was attempted.
        offset: usize,
        /// Number of bytes the read required.
        need: usize,
        /// Total buffer length.
        have: usize,
    },

    /// Field loop did not end exactly on the declared segment boundary.
    #[error("parity check failed: cursor at {cursor}, segment ends at {expected}")]
    ParityMismatch {
        /// Cursor after the field loop.
        cursor: usize,
        /// Declared end of the segment.
        expected: usize,
    },

    /// The two bytes after a segment are not the record terminator.
    #[error("bad terminator {found:#06x} at offset {offset}")]
    BadTerminator {
        /// Value read in place of the terminator.
        found: u16,
        /// Offset of the terminator field.
        offset: usize,
    },

    /// A field code outside the known table; aborting quote processing.
    #[error("unknown field code {code} at offset {offset}, aborting quote processing")]
    UnknownFieldCode {
        /// The offending code byte.
        code: u8,
        /// Offset of the code byte.
        offset: usize,
    },

    /// Marker constant mismatch under the strict marker policy.
    #[error("unexpected marker value {found}, expected 1")]
    BadMarker {
        /// Value read in place of the marker.
        found: u16,
    },

    /// Oversized symbol under the strict symbol policy.
    #[error("symbol of {len} bytes exceeds maximum of {max}")]
    SymbolTooLong {
        /// Declared symbol length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The server answered the handshake with nothing.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// The peer closed the stream while a read was pending.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// The reconnect cap configured in the retry policy was exceeded.
    #[error("giving up after {0} reconnects")]
    ReconnectLimit(u32),
}

impl FeedError {
    /// Returns `true` for errors raised by the record decoder on a corrupt frame.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            FeedError::InsufficientData { .. }
                | FeedError::ParityMismatch { .. }
                | FeedError::BadTerminator { .. }
                | FeedError::UnknownFieldCode { .. }
                | FeedError::BadMarker { .. }
                | FeedError::SymbolTooLong { .. }
        )
    }

    /// Returns `true` when the error is a socket read timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            FeedError::Io(e) => {
                e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut
            }
            _ => false,
        }
    }
}
