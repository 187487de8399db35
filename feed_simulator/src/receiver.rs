use crossbeam_channel::Sender;
use feed_common::{FeedError, Subscription};
use log::{debug, error, info, warn};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

/// Reply sent after a subscription request was understood.
const HANDSHAKE_REPLY: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\r\n";
/// Largest handshake request the simulator reads.
const MAX_REQUEST: usize = 4096;

/// TCP receiver that accepts feed connections and their subscription requests.
///
/// For each connection it reads one request, parses it into a `Subscription`,
/// answers with an HTTP-style status line and forwards the subscription together
/// with the open stream into a channel.
pub struct SubscriptionReceiver {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl SubscriptionReceiver {
    /// Bind a new TCP receiver to the provided `bind_addr` (e.g., `0.0.0.0:8080`).
    pub fn new(bind_addr: &str) -> Result<Self, FeedError> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    /// Blocking accept loop. A client that sends something other than a valid
    /// request is disconnected without affecting other clients.
    pub(crate) fn receive_loop_with_channel(
        self,
        tx: Sender<(Subscription, TcpStream)>,
    ) -> Result<(), FeedError> {
        info!("Feed simulator listening on {}", self.socket.local_addr()?);

        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => match Self::accept_subscription(stream) {
                    Ok((subscription, stream)) => {
                        tx.send((subscription, stream))
                            .map_err(|e| FeedError::ChannelSend(e.to_string()))?;
                    }
                    Err(e) => warn!("Rejected client: {}", e),
                },
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }

    fn accept_subscription(mut stream: TcpStream) -> Result<(Subscription, TcpStream), FeedError> {
        let peer = stream.peer_addr()?;
        debug!("client_tcp_addr: {:?}", peer);
        stream.set_read_timeout(Some(Duration::from_secs(10)))?;

        let mut buf = vec![0u8; MAX_REQUEST];
        let mut len = 0;
        while !buf[..len].ends_with(b"\r\n\r\n") {
            if len == buf.len() {
                return Err(FeedError::Format(format!("request from {} too long", peer)));
            }
            let n = stream.read(&mut buf[len..])?;
            if n == 0 {
                return Err(FeedError::ConnectionClosed);
            }
            len += n;
        }

        let request = String::from_utf8_lossy(&buf[..len]);
        let subscription = Subscription::parse_request(&request)?;
        info!(
            "Client {} ({}) subscribed to {:?}",
            peer, subscription.user, subscription.symbols
        );

        stream.write_all(HANDSHAKE_REPLY)?;
        stream.set_read_timeout(None)?;
        Ok((subscription, stream))
    }
}
