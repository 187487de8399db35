//! Feed simulator.
//!
//! A local stand-in for the streaming quote feed, for running the client end to end.
//! It wires together three building blocks:
//!
//! - `QuoteGenerator`: random-walks every subscribed symbol and broadcasts partial
//!   quotes (`QuoteEvent`) to all client streams via `crossbeam_channel` senders.
//! - `SubscriptionReceiver`: accepts TCP connections, reads the handshake request
//!   and parses it into a `Subscription`.
//! - Per-client stream task: a thread per client that keeps the quotes for the
//!   client's symbols, strips fields it did not request, encodes them as one quote
//!   message and writes a heartbeat status byte at a fixed interval.
//!
//! Any write error ends that client's stream only.
#![warn(missing_docs)]
use crate::model::quote_generator::{QuoteEvent, QuoteGenerator, Subscriber};
use crate::receiver::SubscriptionReceiver;
use clap::Parser;
use crossbeam_channel::{Receiver, select, tick, unbounded};
use feed_common::net::STATUS_HEARTBEAT;
use feed_common::{FeedError, Quote, RecordEncoder, Result, Subscription};
use log::{debug, error, info};
use std::io::Write;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

pub mod model;
mod receiver;

/// Command-line arguments of the simulator.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// TCP port to accept feed clients on.
    #[clap(long, default_value_t = 8080)]
    port: u16,

    /// Milliseconds between quote ticks.
    #[clap(long, default_value_t = 500)]
    tick_ms: u64,

    /// Seconds between heartbeats.
    #[clap(long, default_value_t = 5)]
    heartbeat_secs: u64,
}

/// Stream task for a single client.
///
/// Listens for quote events on `data_rx`, keeps the quotes for the subscribed
/// symbols, restricts them to the subscribed fields and writes them as one message.
/// A heartbeat byte is written every `heartbeat`. The task ends on
/// `QuoteEvent::Shutdown` or on the first write error.
pub fn handle_client_stream(
    mut stream: TcpStream,
    subscription: Subscription,
    data_rx: Receiver<QuoteEvent>,
    heartbeat: Duration,
) -> Result<(), FeedError> {
    let peer = stream.peer_addr()?;
    let heartbeat_rx = tick(heartbeat);

    loop {
        select! {
            recv(heartbeat_rx) -> _ => {
                stream.write_all(&[STATUS_HEARTBEAT])?;
                debug!("Heartbeat sent to {}", peer);
            },
            recv(data_rx) -> msg => match msg {
                Ok(QuoteEvent::Quotes(quotes)) => {
                    let selected: Vec<Quote> = quotes
                        .into_iter()
                        .filter(|q| subscription.symbols.contains(&q.symbol))
                        .map(|mut q| {
                            q.retain_fields(&subscription.fields);
                            q
                        })
                        .collect();
                    if selected.is_empty() {
                        continue;
                    }
                    let message = RecordEncoder::encode_message(&selected)?;
                    stream.write_all(&message)?;
                },
                Ok(QuoteEvent::Shutdown) => break,
                Err(e) => {
                    error!("Quote channel closed for {}: {}", peer, e);
                    break;
                },
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();

    let (sub_tx, sub_rx) = unbounded::<(Subscription, TcpStream)>();
    let tcp_receiver = SubscriptionReceiver::new(&format!("0.0.0.0:{}", args.port))?;
    thread::spawn(move || {
        if let Err(e) = tcp_receiver.receive_loop_with_channel(sub_tx) {
            error!("Receiver loop failed: {:?}", e);
        };
    });

    let generator_tx = QuoteGenerator::start(Duration::from_millis(args.tick_ms));
    let heartbeat = Duration::from_secs(args.heartbeat_secs.max(1));

    for (subscription, stream) in sub_rx {
        let (client_data_tx, client_data_rx) = unbounded::<QuoteEvent>();
        let subscriber = Subscriber {
            symbols: subscription.symbols.clone(),
            tx: client_data_tx,
        };
        if let Err(e) = generator_tx.send(subscriber) {
            error!("Failed to subscribe client: {}", e);
            continue;
        }

        thread::spawn(move || {
            let user = subscription.user.clone();
            match handle_client_stream(stream, subscription, client_data_rx, heartbeat) {
                Ok(()) => info!("Stream for {} closed", user),
                Err(e) => info!("Stream for {} ended: {}", user, e),
            }
        });
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
