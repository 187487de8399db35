//! Synthetic per-symbol market state.
//!
//! Each `SymbolState` walks its last price randomly and produces partial updates:
//! every tick only a random subset of the fields is sent, the way the real feed
//! only sends what changed. Prices are kept on a 1/64 grid so they survive the
//! 32-bit float encoding exactly.

use chrono::Utc;
use feed_common::Quote;
use rand::Rng;

const PRICE_GRID: f64 = 64.0;
const EXCHANGES: [char; 4] = ['N', 'Q', 'P', 'A'];

/// Running synthetic state of one symbol.
#[derive(Debug, Clone)]
pub struct SymbolState {
    symbol: String,
    last: f64,
    high: f64,
    low: f64,
    prev_close: f64,
    volume: u32,
}

impl SymbolState {
    /// Starts a symbol at `price`.
    pub fn new(symbol: &str, price: f64) -> Self {
        let price = snap(price);
        Self {
            symbol: symbol.to_string(),
            last: price,
            high: price,
            low: price,
            prev_close: price,
            volume: 0,
        }
    }

    /// Calculate the next synthetic price using a small random walk around `current_price`.
    ///
    /// The change is sampled uniformly from `[-1%, +1%]`, snapped to the price grid
    /// and clamped to one grid step so the price never reaches zero.
    pub fn next_price(current_price: f64) -> f64 {
        let mut rng = rand::rng();
        let change: f64 = rng.random_range(-0.01..0.01);
        snap(current_price * (1.0 + change)).max(1.0 / PRICE_GRID)
    }

    /// Advances the walk and returns the fields that changed this tick.
    pub fn tick(&mut self) -> Quote {
        let mut rng = rand::rng();
        let previous = self.last;
        self.last = Self::next_price(self.last);
        self.high = self.high.max(self.last);
        self.low = self.low.min(self.last);

        let size = 100 * rng.random_range(1..50u32);
        self.volume = self.volume.saturating_add(size);
        let spread = rng.random_range(1..4) as f64 / PRICE_GRID;
        let now = Utc::now().format("%H:%M:%S").to_string();

        let mut quote = Quote {
            bid: Some(snap(self.last - spread).max(1.0 / PRICE_GRID)),
            ask: Some(snap(self.last + spread)),
            ..Quote::new(self.symbol.clone())
        };
        if rng.random_bool(0.7) {
            quote.last = Some(self.last);
            quote.last_size = Some(size);
            quote.volume = Some(self.volume);
            quote.trade_time = Some(now.clone());
            quote.tick = Some(if self.last >= previous { '+' } else { '-' });
            quote.exchange = Some(EXCHANGES[rng.random_range(0..EXCHANGES.len())]);
        }
        if rng.random_bool(0.5) {
            quote.bid_size = Some(100 * rng.random_range(1..20u32));
            quote.ask_size = Some(100 * rng.random_range(1..20u32));
            quote.bid_id = Some(EXCHANGES[rng.random_range(0..EXCHANGES.len())]);
            quote.ask_id = Some(EXCHANGES[rng.random_range(0..EXCHANGES.len())]);
            quote.quote_time = Some(now);
        }
        if rng.random_bool(0.2) {
            quote.high = Some(self.high);
            quote.low = Some(self.low);
            quote.prev_close = Some(self.prev_close);
        }
        if rng.random_bool(0.1) {
            quote.island_bid = quote.bid;
            quote.island_ask = quote.ask;
            quote.island_volume = Some(self.volume / 10);
        }
        quote
    }
}

fn snap(price: f64) -> f64 {
    (price * PRICE_GRID).round() / PRICE_GRID
}
