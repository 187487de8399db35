//! Quote stream generator and event broadcasting.
//!
//! The `QuoteGenerator` runs a background thread that advances a `SymbolState` for
//! every symbol any client has asked for and broadcasts the resulting partial
//! quotes to all subscribers over `crossbeam_channel`. Subscribers register by
//! sending a [`Subscriber`] to the channel returned by [`QuoteGenerator::start`].
//!
//! Event model:
//! - `QuoteEvent::Quotes(Vec<Quote>)`: one tick's worth of updates, all symbols.
//! - `QuoteEvent::Shutdown`: signal for consumers to terminate gracefully.
//!
//! Broadcast is best-effort: if sending to a subscriber fails, it is dropped.
//! Symbols no remaining subscriber asked for stop being generated.

use crate::model::quote::SymbolState;
use crossbeam_channel::{Receiver, Sender};
use feed_common::Quote;
use log::{debug, info};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

/// Message sent by the generator to its subscribers.
#[derive(Clone, Debug)]
pub enum QuoteEvent {
    /// Updates produced in one tick.
    Quotes(Vec<Quote>),
    /// Global shutdown notification for all consumers.
    Shutdown,
}

/// Registration of a client stream with the generator.
pub struct Subscriber {
    /// Symbols the client asked for; the generator starts tracking unknown ones.
    pub symbols: Vec<String>,
    /// Where the client's events go.
    pub tx: Sender<QuoteEvent>,
}

/// Background market data generator that broadcasts to subscribers.
pub struct QuoteGenerator;

impl QuoteGenerator {
    /// Start the generator thread and return a channel for registering subscribers.
    ///
    /// Every `interval` the generator ticks all known symbols and pushes the
    /// updates to every registered subscriber. When the registration channel is
    /// closed the remaining subscribers get `QuoteEvent::Shutdown` and the thread ends.
    pub fn start(interval: Duration) -> Sender<Subscriber> {
        let (subscribe_tx, subscribe_rx) = crossbeam_channel::unbounded::<Subscriber>();

        thread::spawn(move || Self::run(subscribe_rx, interval));
        subscribe_tx
    }

    fn run(subscribe_rx: Receiver<Subscriber>, interval: Duration) {
        let mut clients: Vec<Subscriber> = Vec::new();
        let mut market: HashMap<String, SymbolState> = HashMap::new();
        let mut rng = rand::rng();

        info!("Market generator started (thread {:?})", thread::current().id());

        loop {
            loop {
                match subscribe_rx.try_recv() {
                    Ok(subscriber) => {
                        for symbol in &subscriber.symbols {
                            market.entry(symbol.clone()).or_insert_with(|| {
                                SymbolState::new(symbol, rng.random_range(10.0..500.0))
                            });
                        }
                        clients.push(subscriber);
                        info!("Generator: new client added. Total clients: {}", clients.len());
                    }
                    Err(crossbeam_channel::TryRecvError::Empty) => break,
                    Err(crossbeam_channel::TryRecvError::Disconnected) => {
                        for client in &clients {
                            let _ = client.tx.send(QuoteEvent::Shutdown);
                        }
                        info!("Generator stopping...");
                        return;
                    }
                }
            }

            if !clients.is_empty() {
                let quotes: Vec<Quote> = market.values_mut().map(SymbolState::tick).collect();
                debug!("Generated {} quotes", quotes.len());
                let event = QuoteEvent::Quotes(quotes);
                let before = clients.len();
                clients.retain(|client| client.tx.send(event.clone()).is_ok());
                if clients.len() < before {
                    info!(
                        "Generator: dropped {} client(s). Total clients: {}",
                        before - clients.len(),
                        clients.len()
                    );
                    prune_market(&mut market, &clients);
                }
            }

            thread::sleep(interval);
        }
    }
}

/// Drops the state of every symbol no client in `clients` asked for.
fn prune_market(market: &mut HashMap<String, SymbolState>, clients: &[Subscriber]) {
    let wanted: HashSet<&str> = clients
        .iter()
        .flat_map(|client| client.symbols.iter().map(String::as_str))
        .collect();
    market.retain(|symbol, _| wanted.contains(symbol.as_str()));
    debug!("Market now tracks {} symbols", market.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscriber(symbols: &[&str]) -> (Subscriber, Receiver<QuoteEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let symbols = symbols.iter().map(|s| s.to_string()).collect();
        (Subscriber { symbols, tx }, rx)
    }

    #[test]
    fn test_prune_keeps_only_wanted_symbols() {
        let mut market: HashMap<String, SymbolState> = ["AAPL", "MSFT", "IBM"]
            .into_iter()
            .map(|s| (s.to_string(), SymbolState::new(s, 100.0)))
            .collect();
        let (ibm, _rx) = subscriber(&["IBM"]);

        prune_market(&mut market, &[ibm]);
        assert_eq!(market.len(), 1);
        assert!(market.contains_key("IBM"));

        prune_market(&mut market, &[]);
        assert!(market.is_empty());
    }

    #[test]
    fn test_disconnected_subscriber_symbols_stop_ticking() {
        let subscribe_tx = QuoteGenerator::start(Duration::from_millis(5));
        let (gone, gone_rx) = subscriber(&["GONE"]);
        let (kept, kept_rx) = subscriber(&["KEPT"]);
        subscribe_tx.send(gone).unwrap();
        subscribe_tx.send(kept).unwrap();
        drop(gone_rx);

        // The first broadcast that fails removes `GONE`; later ones carry `KEPT` only.
        let mut last = Vec::new();
        for _ in 0..10 {
            match kept_rx.recv_timeout(Duration::from_secs(2)).unwrap() {
                QuoteEvent::Quotes(quotes) => {
                    last = quotes.into_iter().map(|q| q.symbol).collect::<Vec<_>>();
                }
                QuoteEvent::Shutdown => break,
            }
        }
        assert_eq!(last, vec!["KEPT"]);
    }
}
