//!
//! Wire format and quote types shared by the feed client and the feed simulator.
//!
//! This crate aggregates:
//! - `error`: unified error type `FeedError` used across the workspace.
//! - `result`: handy `Result<T, FeedError>` alias.
//! - `net`: status bytes, terminator and other protocol constants.
//! - `float_codec`: the feed's bit-string float decoding.
//! - `fields`: field code table.
//! - `quote`: `Quote` and `QuoteBatch`.
//! - `decoder` / `encoder`: record parsing and building.
//! - `accumulator`: per-symbol merged state.
//! - `subscription`: the handshake request.
#![warn(missing_docs)]
pub mod accumulator;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod fields;
pub mod float_codec;
pub mod net;
pub mod quote;
pub mod result;
pub mod subscription;

pub use accumulator::AccumulatedState;
pub use decoder::{ConsistencyPolicy, DecoderOptions, RecordDecoder};
pub use encoder::RecordEncoder;
pub use error::FeedError;
pub use fields::{FieldCode, FieldLayout};
pub use float_codec::{ExponentBitOrder, FloatCodec};
pub use quote::{DecodeWarning, FieldValue, Quote, QuoteBatch};
pub use result::Result;
pub use subscription::Subscription;
