//! Feed Client: connects to the streaming quote feed, subscribes to a list of
//! symbols and logs every decoded quote as a JSON line. The connection is
//! re-established whenever it times out, fails or delivers a corrupt frame.
//!
//! Usage example (CLI):
//! ```bash
//! feed_client --host 127.0.0.1 --port 8080 --user demo --password demo \
//!     --symbols AAPL,MSFT --fields bid,ask,last,volume --accumulate
//! ```
//!
//! Settings can also come from a JSON file (`--config feed.json`); options given on
//! the command line win. Set `RUST_LOG=debug` for handshake and state-transition logs.
#![warn(missing_docs)]
mod args;

use crate::args::Args;
use clap::Parser;
use feed_client::{Accumulating, ConnectionLoop, FeedConfig, LogSink, QuoteSink};
use feed_common::subscription::read_symbols;
use feed_common::{FeedError, Result};
use log::{error, info};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

fn main() -> Result<(), FeedError> {
    let args = Args::parse();
    init_logger(args.log_file.as_deref())?;

    let mut config = match &args.config {
        Some(path) => FeedConfig::from_json_file(&normalize_path(path))?,
        None => FeedConfig::default(),
    };
    args.apply(&mut config);

    if let Some(path) = &args.symbols_file {
        let file = File::open(normalize_path(path))?;
        config.symbols.extend(read_symbols(BufReader::new(file))?);
    }
    info!("Symbols: {:?}", config.symbols);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| FeedError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    let sink: Box<dyn QuoteSink> = if args.accumulate {
        Box::new(Accumulating::new(LogSink))
    } else {
        Box::new(LogSink)
    };

    let mut feed = ConnectionLoop::tcp(config, sink)?.with_shutdown(shutdown);
    info!("Client is running. Press Ctrl+C to exit.");
    match feed.run() {
        Ok(stats) => {
            info!("Session totals: {}", serde_json::to_string(&stats)?);
            Ok(())
        }
        Err(e) => {
            error!("Feed loop failed: {}", e);
            Err(e)
        }
    }
}

fn init_logger(log_file: Option<&str>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info).parse_default_env();
    if let Some(path) = log_file {
        let file = File::create(normalize_path(path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}
