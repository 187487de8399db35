//! Client configuration.
//!
//! `FeedConfig` is built once at startup (defaults, then an optional JSON file,
//! then command-line overrides) and handed to the connection loop by value.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use feed_common::net::{
    DEFAULT_HANDSHAKE_CHUNK, DEFAULT_MAX_CHUNK, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
};
use feed_common::{DecoderOptions, FeedError, FieldCode, Result, Subscription};
use serde::{Deserialize, Serialize};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0 (compatible; MSIE 5.5; Windows NT 5.0)";

/// Fields requested when none are configured: everything except the reserved codes.
pub const DEFAULT_FIELDS: &[FieldCode] = &[
    FieldCode::Symbol,
    FieldCode::Bid,
    FieldCode::Ask,
    FieldCode::Last,
    FieldCode::BidSize,
    FieldCode::AskSize,
    FieldCode::BidId,
    FieldCode::AskId,
    FieldCode::Volume,
    FieldCode::LastSize,
    FieldCode::TradeTime,
    FieldCode::QuoteTime,
    FieldCode::High,
    FieldCode::Low,
    FieldCode::Tick,
    FieldCode::PrevClose,
    FieldCode::Exchange,
    FieldCode::IslandBid,
    FieldCode::IslandAsk,
    FieldCode::IslandVolume,
];

/// What the sink receives for a quote message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Decode and hand over a `QuoteBatch`.
    #[default]
    Decoded,
    /// Hand over the assembled frame bytes without decoding.
    Raw,
}

/// Reconnect pacing. The default retries immediately and forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Pause before each reconnect, in milliseconds.
    pub delay_ms: u64,
    /// Give up after this many reconnects.
    pub max_reconnects: Option<u32>,
}

impl RetryPolicy {
    /// Pause before each reconnect.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Everything the connection loop needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed server host name or IP address.
    pub host: String,
    /// Feed server port.
    pub port: u16,
    /// Account name embedded in the handshake.
    pub user: String,
    /// Account password embedded in the handshake.
    pub password: String,
    /// Subscription modes.
    pub modes: Vec<String>,
    /// Symbols to subscribe to.
    pub symbols: Vec<String>,
    /// Field codes to request.
    pub fields: Vec<FieldCode>,
    /// Bound on establishing the TCP connection, in seconds.
    pub connect_timeout_secs: u64,
    /// Bound on every socket read, in seconds.
    pub read_timeout_secs: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Upper bound on a single read while assembling a frame.
    pub max_chunk: usize,
    /// Upper bound on the read that drains the handshake reply.
    pub handshake_chunk: usize,
    /// Record decoder options.
    pub decoder: DecoderOptions,
    /// Decoded batches or raw frames.
    pub delivery: DeliveryMode,
    /// Reconnect pacing.
    pub retry: RetryPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            user: String::new(),
            password: String::new(),
            modes: vec![feed_common::subscription::DEFAULT_MODE.to_string()],
            symbols: Vec::new(),
            fields: DEFAULT_FIELDS.to_vec(),
            connect_timeout_secs: DEFAULT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_chunk: DEFAULT_MAX_CHUNK,
            handshake_chunk: DEFAULT_HANDSHAKE_CHUNK,
            decoder: DecoderOptions::default(),
            delivery: DeliveryMode::Decoded,
            retry: RetryPolicy::default(),
        }
    }
}

impl FeedConfig {
    /// Loads a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// `host:port` of the feed server.
    pub fn address(&self) -> String {
        feed_common::net::addr(&self.host, self.port)
    }

    /// Bound on establishing the TCP connection.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Bound on every socket read.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Builds the validated subscription.
    pub fn subscription(&self) -> Result<Subscription> {
        Subscription::with_modes(
            &self.user,
            &self.password,
            &self.modes,
            &self.symbols,
            &self.fields,
        )
    }

    /// Checks the settings that the subscription does not cover.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(FeedError::Config("host must not be empty".into()));
        }
        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err(FeedError::Config("timeouts must be at least one second".into()));
        }
        if self.max_chunk == 0 || self.handshake_chunk == 0 {
            return Err(FeedError::Config("read chunk sizes must be positive".into()));
        }
        Ok(())
    }

    /// Validates everything and renders the handshake bytes.
    pub fn handshake_request(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let subscription = self.subscription()?;
        Ok(subscription
            .request(&self.host, self.port, &self.user_agent)
            .into_bytes())
    }
}
