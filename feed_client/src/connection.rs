//! Connection lifecycle: connect, handshake, stream, reconnect.
//!
//! ```text
//! Disconnected -> Connecting -> Handshaking -> Streaming
//!       ^                                          |
//!       +------ timeout / I/O error / bad frame ---+
//! ```
//!
//! Every session failure goes back to `Connecting`; by default there is no pause
//! and no attempt limit. The loop only stops when the shutdown flag is set (it is
//! checked between reads, so it is noticed at most one read timeout later) or when
//! the configured reconnect cap is exceeded.
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use feed_common::net::{STATUS_AUTH_FAILURE, STATUS_HEARTBEAT, STATUS_QUOTE};
use feed_common::{FeedError, RecordDecoder, Result};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::{DeliveryMode, FeedConfig};
use crate::frame::{read_some, FrameAssembler};
use crate::sink::QuoteSink;

/// Opens a fresh byte stream to the feed for every session.
pub trait Connector {
    /// Stream type; reads must already be bounded by the read timeout.
    type Stream: Read + Write;

    /// Establishes a new connection.
    fn connect(&mut self) -> std::io::Result<Self::Stream>;
}

/// Plain TCP connector with connect and read timeouts.
pub struct TcpConnector {
    address: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpConnector {
    /// Connector for the server named in `config`.
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            address: config.address(),
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&mut self) -> std::io::Result<TcpStream> {
        let mut last_error = None;
        for addr in self.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.read_timeout))?;
                    stream.set_write_timeout(Some(self.read_timeout))?;
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} did not resolve to any address", self.address),
            )
        }))
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    /// No session.
    Disconnected,
    /// Opening the TCP connection.
    Connecting,
    /// Sending the request and draining the reply.
    Handshaking,
    /// Reading status bytes and frames.
    Streaming,
}

/// Counters over the lifetime of a loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Successful TCP connects.
    pub connects: u64,
    /// Reconnect cycles started after the first attempt.
    pub reconnects: u32,
    /// Quote messages delivered to the sink, decoded or raw.
    pub batches: u64,
    /// Heartbeats seen.
    pub heartbeats: u64,
    /// Status bytes that were neither quote nor heartbeat.
    pub unknown_status: u64,
}

impl SessionStats {
    /// Counts one more reconnect cycle; stays at `u32::MAX` once reached.
    fn record_reconnect(&mut self) -> u32 {
        self.reconnects = self.reconnects.saturating_add(1);
        self.reconnects
    }
}

/// The feed receive loop.
pub struct ConnectionLoop<C, S> {
    config: FeedConfig,
    request: Vec<u8>,
    connector: C,
    sink: S,
    decoder: RecordDecoder,
    assembler: FrameAssembler,
    shutdown: Arc<AtomicBool>,
    state: ConnectionState,
    stats: SessionStats,
}

impl<S: QuoteSink> ConnectionLoop<TcpConnector, S> {
    /// Loop over plain TCP to the configured server.
    pub fn tcp(config: FeedConfig, sink: S) -> Result<Self> {
        let connector = TcpConnector::new(&config);
        Self::new(config, connector, sink)
    }
}

impl<C: Connector, S: QuoteSink> ConnectionLoop<C, S> {
    /// Validates `config` and prepares the handshake. Nothing is connected yet.
    pub fn new(config: FeedConfig, connector: C, sink: S) -> Result<Self> {
        let request = config.handshake_request()?;
        Ok(Self {
            decoder: RecordDecoder::new(config.decoder),
            assembler: FrameAssembler::new(config.max_chunk),
            config,
            request,
            connector,
            sink,
            shutdown: Arc::new(AtomicBool::new(false)),
            state: ConnectionState::Disconnected,
            stats: SessionStats::default(),
        })
    }

    /// Replaces the shutdown flag with a shared one.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Flag that stops the loop when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs sessions until shutdown. Returns the final counters, or
    /// `FeedError::ReconnectLimit` if the retry policy gives up.
    pub fn run(&mut self) -> Result<SessionStats> {
        let retry = self.config.retry;
        let mut first = true;

        while !self.stopped() {
            if !first {
                let attempt = self.stats.record_reconnect();
                if let Some(max) = retry.max_reconnects {
                    if attempt > max {
                        self.transition(ConnectionState::Disconnected);
                        return Err(FeedError::ReconnectLimit(max));
                    }
                }
                if !retry.delay().is_zero() {
                    thread::sleep(retry.delay());
                    if self.stopped() {
                        break;
                    }
                }
                info!("Reconnecting to {} (attempt {})", self.config.address(), self.stats.reconnects);
            }
            first = false;

            if let Err(e) = self.run_session() {
                self.report(&e);
            }
            self.transition(ConnectionState::Disconnected);
        }

        info!("Feed loop stopping...");
        self.transition(ConnectionState::Disconnected);
        Ok(self.stats.clone())
    }

    fn stopped(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!("Connection state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn report(&self, e: &FeedError) {
        if e.is_timeout() {
            warn!(
                "No data from {} within {}s, reconnecting",
                self.config.address(),
                self.config.read_timeout_secs
            );
        } else if e.is_structural() {
            error!("Corrupt quote frame: {}; reconnecting", e);
        } else {
            warn!("Session with {} ended: {}", self.config.address(), e);
        }
    }

    /// One connection from connect to failure. Returns `Ok` only on shutdown.
    fn run_session(&mut self) -> Result<()> {
        self.transition(ConnectionState::Connecting);
        info!("Connecting to {}", self.config.address());
        let mut stream = self.connector.connect()?;
        self.stats.connects += 1;

        self.transition(ConnectionState::Handshaking);
        self.handshake(&mut stream)?;

        self.transition(ConnectionState::Streaming);
        info!("Streaming {} symbols from {}", self.config.symbols.len(), self.config.address());
        let mut status = [0u8; 1];
        while !self.stopped() {
            if read_some(&mut stream, &mut status)? == 0 {
                return Err(FeedError::ConnectionClosed);
            }
            match status[0] {
                STATUS_QUOTE => self.handle_quote(&mut stream)?,
                STATUS_HEARTBEAT => {
                    self.stats.heartbeats += 1;
                    self.sink.on_heartbeat(Utc::now());
                }
                STATUS_AUTH_FAILURE => {
                    self.stats.unknown_status += 1;
                    info!("Status byte {} (reserved authentication code) received", STATUS_AUTH_FAILURE);
                }
                other => {
                    self.stats.unknown_status += 1;
                    info!("Unexpected status byte {} ({:?})", other, other as char);
                }
            }
        }
        Ok(())
    }

    fn handshake(&mut self, stream: &mut C::Stream) -> Result<()> {
        stream.write_all(&self.request)?;
        stream.flush()?;

        let mut reply = vec![0u8; self.config.handshake_chunk];
        let n = read_some(stream, &mut reply)?;
        if n == 0 {
            return Err(FeedError::HandshakeRejected("empty reply".to_string()));
        }
        debug!("Handshake reply: {}", String::from_utf8_lossy(&reply[..n]).trim_end());
        Ok(())
    }

    fn handle_quote(&mut self, stream: &mut C::Stream) -> Result<()> {
        let frame = self.assembler.assemble(stream, STATUS_QUOTE)?;
        match self.config.delivery {
            DeliveryMode::Raw => self.sink.on_raw_frame(&frame),
            DeliveryMode::Decoded => {
                let batch = self.decoder.decode(&frame)?;
                self.sink.on_batch(&batch);
            }
        }
        self.stats.batches += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_counter_saturates() {
        let mut stats = SessionStats::default();
        assert_eq!(stats.record_reconnect(), 1);

        stats.reconnects = u32::MAX;
        assert_eq!(stats.record_reconnect(), u32::MAX);
        assert_eq!(stats.reconnects, u32::MAX);
    }
}
