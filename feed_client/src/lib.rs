//! Feed client library: configuration, frame reassembly, the receive loop and
//! the sink interface it delivers to.
//!
//! ```no_run
//! use feed_client::{ConnectionLoop, FeedConfig, FnSink};
//!
//! let config = FeedConfig {
//!     host: "127.0.0.1".into(),
//!     port: 8080,
//!     user: "demo".into(),
//!     password: "demo".into(),
//!     symbols: vec!["AAPL".into(), "MSFT".into()],
//!     ..Default::default()
//! };
//! let sink = FnSink::new(|batch: &feed_common::QuoteBatch| println!("{:?}", batch.symbols()));
//! let mut feed = ConnectionLoop::tcp(config, sink)?;
//! feed.run()?;
//! # Ok::<(), feed_common::FeedError>(())
//! ```
#![warn(missing_docs)]
pub mod config;
pub mod connection;
pub mod frame;
pub mod sink;

pub use config::{DeliveryMode, FeedConfig, RetryPolicy};
pub use connection::{ConnectionLoop, ConnectionState, Connector, SessionStats, TcpConnector};
pub use frame::FrameAssembler;
pub use sink::{Accumulating, FnSink, LogSink, QuoteSink};
