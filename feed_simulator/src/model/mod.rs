//! Domain models for the feed simulator.
//!
//! - `quote`: per-symbol random-walk state producing partial `Quote` updates.
//! - `quote_generator`: background generator and `QuoteEvent` broadcasting.

pub mod quote;
pub mod quote_generator;
