//! Reassembly of quote messages split across socket reads.
//!
//! The assembler knows nothing about record layout. A message is complete as soon
//! as the bytes received so far end with the record terminator. A terminator value
//! that happens to end a read in the middle of field data completes the message
//! early; the decoder then reports the damage and the session is restarted.
use std::io::{ErrorKind, Read};

use feed_common::net::ends_with_terminator;
use feed_common::{FeedError, Result};
use log::trace;

/// Collects reads until a message ends with the terminator.
pub struct FrameAssembler {
    chunk: Vec<u8>,
}

impl FrameAssembler {
    /// Creates an assembler reading at most `max_chunk` bytes per read.
    pub fn new(max_chunk: usize) -> Self {
        Self {
            chunk: vec![0u8; max_chunk.max(1)],
        }
    }

    /// Reads the rest of a message whose status byte was already consumed.
    ///
    /// The returned frame starts with `status`. Each read is bounded by the
    /// reader's own timeout; a timeout, an I/O error or a closed stream abandons
    /// the frame.
    pub fn assemble<R: Read>(&mut self, reader: &mut R, status: u8) -> Result<Vec<u8>> {
        let mut frame = vec![status];
        let mut reads = 0usize;

        loop {
            let n = read_some(reader, &mut self.chunk)?;
            if n == 0 {
                return Err(FeedError::ConnectionClosed);
            }
            reads += 1;
            frame.extend_from_slice(&self.chunk[..n]);

            if ends_with_terminator(&frame) {
                trace!("Frame of {} bytes assembled from {} reads", frame.len(), reads);
                return Ok(frame);
            }
            trace!("Frame incomplete after {} bytes, reading more", frame.len());
        }
    }
}

/// One read, retried when interrupted by a signal.
pub(crate) fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FeedError::Io(e)),
        }
    }
}
