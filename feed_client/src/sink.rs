//! Consumers of decoded quote messages.
//!
//! The connection loop calls the sink synchronously on the reading thread, so a
//! slow sink delays the next read and can make the session time out.
use chrono::{DateTime, Utc};
use feed_common::{AccumulatedState, QuoteBatch};
use log::{debug, error, info, warn};

/// Receives everything the feed delivers.
pub trait QuoteSink {
    /// Called once per decoded quote message.
    fn on_batch(&mut self, batch: &QuoteBatch);

    /// Called once per quote message when raw delivery is configured.
    ///
    /// Sinks that only understand decoded batches drop the frame with a warning.
    fn on_raw_frame(&mut self, frame: &[u8]) {
        warn!("Sink has no raw frame handler, dropping {} bytes", frame.len());
    }

    /// Called for every heartbeat.
    fn on_heartbeat(&mut self, _at: DateTime<Utc>) {}
}

impl<S: QuoteSink + ?Sized> QuoteSink for Box<S> {
    fn on_batch(&mut self, batch: &QuoteBatch) {
        (**self).on_batch(batch)
    }

    fn on_raw_frame(&mut self, frame: &[u8]) {
        (**self).on_raw_frame(frame)
    }

    fn on_heartbeat(&mut self, at: DateTime<Utc>) {
        (**self).on_heartbeat(at)
    }
}

/// Adapts closures to [`QuoteSink`].
pub struct FnSink<F, H = fn(DateTime<Utc>), R = fn(&[u8])> {
    batch: F,
    heartbeat: Option<H>,
    raw: Option<R>,
}

impl<F: FnMut(&QuoteBatch)> FnSink<F> {
    /// Sink calling `batch` for every quote message and ignoring heartbeats.
    pub fn new(batch: F) -> Self {
        Self {
            batch,
            heartbeat: None,
            raw: None,
        }
    }
}

impl<F, H, R> FnSink<F, H, R> {
    /// Adds a heartbeat callback.
    pub fn with_heartbeat<H2: FnMut(DateTime<Utc>)>(self, heartbeat: H2) -> FnSink<F, H2, R> {
        FnSink {
            batch: self.batch,
            heartbeat: Some(heartbeat),
            raw: self.raw,
        }
    }

    /// Adds a callback for undecoded frames, used with [`DeliveryMode::Raw`](crate::DeliveryMode::Raw).
    pub fn with_raw_frame<R2: FnMut(&[u8])>(self, raw: R2) -> FnSink<F, H, R2> {
        FnSink {
            batch: self.batch,
            heartbeat: self.heartbeat,
            raw: Some(raw),
        }
    }
}

impl<F, H, R> QuoteSink for FnSink<F, H, R>
where
    F: FnMut(&QuoteBatch),
    H: FnMut(DateTime<Utc>),
    R: FnMut(&[u8]),
{
    fn on_batch(&mut self, batch: &QuoteBatch) {
        (self.batch)(batch)
    }

    fn on_raw_frame(&mut self, frame: &[u8]) {
        match self.raw.as_mut() {
            Some(raw) => raw(frame),
            None => warn!("No raw frame callback set, dropping {} bytes", frame.len()),
        }
    }

    fn on_heartbeat(&mut self, at: DateTime<Utc>) {
        if let Some(heartbeat) = self.heartbeat.as_mut() {
            heartbeat(at)
        }
    }
}

/// Wraps a sink so it sees merged quotes instead of deltas.
///
/// Raw frames and heartbeats are passed through untouched.
pub struct Accumulating<S> {
    state: AccumulatedState,
    inner: S,
}

impl<S: QuoteSink> Accumulating<S> {
    /// Starts with an empty state.
    pub fn new(inner: S) -> Self {
        Self {
            state: AccumulatedState::new(),
            inner,
        }
    }

    /// Merged state so far.
    pub fn state(&self) -> &AccumulatedState {
        &self.state
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: QuoteSink> QuoteSink for Accumulating<S> {
    fn on_batch(&mut self, batch: &QuoteBatch) {
        let merged = self.state.merge(batch);
        self.inner.on_batch(&merged);
    }

    fn on_raw_frame(&mut self, frame: &[u8]) {
        self.inner.on_raw_frame(frame);
    }

    fn on_heartbeat(&mut self, at: DateTime<Utc>) {
        self.inner.on_heartbeat(at);
    }
}

/// Writes every quote to the log as one JSON object per line.
#[derive(Debug, Default)]
pub struct LogSink;

impl QuoteSink for LogSink {
    fn on_batch(&mut self, batch: &QuoteBatch) {
        for quote in batch.iter() {
            match serde_json::to_string(quote) {
                Ok(json) => info!("QUOTE: {}", json),
                Err(e) => error!("Failed to serialize quote for {}: {}", quote.symbol, e),
            }
        }
    }

    fn on_raw_frame(&mut self, frame: &[u8]) {
        let hex: Vec<String> = frame.iter().map(|b| format!("{:02x}", b)).collect();
        info!("FRAME: {}", hex.join(""));
    }

    fn on_heartbeat(&mut self, at: DateTime<Utc>) {
        debug!("Heartbeat at {}", at.to_rfc3339());
    }
}
