//! Command-line arguments for the feed client.
//!
//! Every option overrides the matching key of the JSON config file (if one is
//! given), which in turn overrides the built-in defaults.
use clap::Parser;
use feed_client::FeedConfig;
use feed_common::{ConsistencyPolicy, FieldCode};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON configuration file.
    #[clap(long)]
    pub config: Option<String>,

    /// Feed server host name or IP address.
    #[clap(long)]
    pub host: Option<String>,

    /// Feed server port.
    #[clap(long)]
    pub port: Option<u16>,

    /// Account name.
    #[clap(long)]
    pub user: Option<String>,

    /// Account password.
    #[clap(long)]
    pub password: Option<String>,

    /// Comma separated symbols, e.g. `AAPL,MSFT`.
    #[clap(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Text file with symbols separated by commas, spaces or new lines.
    #[clap(long)]
    pub symbols_file: Option<String>,

    /// Comma separated field names, e.g. `bid,ask,volume`.
    #[clap(long, value_enum, value_delimiter = ',')]
    pub fields: Vec<FieldCode>,

    /// Subscription mode; repeat for several.
    #[clap(long = "mode")]
    pub modes: Vec<String>,

    /// Connect and read timeout in seconds.
    #[clap(long)]
    pub timeout: Option<u64>,

    /// `User-Agent` header value.
    #[clap(long)]
    pub user_agent: Option<String>,

    /// Deliver merged per-symbol state instead of deltas.
    #[clap(long)]
    pub accumulate: bool,

    /// Deliver raw frames without decoding.
    #[clap(long)]
    pub raw: bool,

    /// Treat symbols longer than the protocol maximum as corrupt frames.
    #[clap(long)]
    pub strict_symbols: bool,

    /// Treat an unexpected marker value as a corrupt frame.
    #[clap(long)]
    pub strict_marker: bool,

    /// Pause before each reconnect, in milliseconds.
    #[clap(long)]
    pub retry_delay_ms: Option<u64>,

    /// Give up after this many reconnects.
    #[clap(long)]
    pub max_reconnects: Option<u32>,

    /// Write log lines to this file instead of stderr.
    #[clap(long)]
    pub log_file: Option<String>,
}

impl Args {
    /// Applies the command-line overrides to `config`.
    pub fn apply(&self, config: &mut FeedConfig) {
        if let Some(host) = &self.host {
            config.host = host.trim().replace('"', "");
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if !self.symbols.is_empty() {
            config.symbols = self.symbols.clone();
        }
        if !self.fields.is_empty() {
            config.fields = self.fields.clone();
        }
        if !self.modes.is_empty() {
            config.modes = self.modes.clone();
        }
        if let Some(timeout) = self.timeout {
            config.connect_timeout_secs = timeout;
            config.read_timeout_secs = timeout;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if self.raw {
            config.delivery = feed_client::DeliveryMode::Raw;
        }
        if self.strict_symbols {
            config.decoder.symbol_policy = ConsistencyPolicy::Reject;
        }
        if self.strict_marker {
            config.decoder.marker_policy = ConsistencyPolicy::Reject;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.retry.delay_ms = delay;
        }
        if self.max_reconnects.is_some() {
            config.retry.max_reconnects = self.max_reconnects;
        }
    }
}
