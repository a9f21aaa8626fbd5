//! In-memory transport
//!
//! A [`MemoryConnector`] hands out channel-backed transports and passes the
//! server end of each one, a [`MemoryPeer`], to whoever holds the peer
//! receiver. Connection attempts can be refused on demand, which makes
//! reconnect behaviour reproducible without a network.

use crate::networking::error::{NetworkError, NetworkResult};
use crate::networking::transport::{Connector, Transport};
use async_trait::async_trait;
use shared::protocol::{ClientEvent, ServerEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use url::Url;

#[derive(Debug, Default)]
struct Refusals {
    next: usize,
    all: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    attempts: Arc<AtomicUsize>,
    refusals: Arc<Mutex<Refusals>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let connector = Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            refusals: Arc::new(Mutex::new(Refusals::default())),
            peers,
        };
        (connector, peer_rx)
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_next(&self, count: usize) {
        if let Ok(mut refusals) = self.refusals.lock() {
            refusals.next += count;
        }
    }

    /// Refuse every connection attempt from now on.
    pub fn refuse_all(&self) {
        if let Ok(mut refusals) = self.refusals.lock() {
            refusals.all = true;
        }
    }

    /// Connection attempts made so far, refused ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn should_refuse(&self) -> bool {
        let Ok(mut refusals) = self.refusals.lock() else {
            return false;
        };
        if refusals.all {
            return true;
        }
        if refusals.next > 0 {
            refusals.next -= 1;
            return true;
        }
        false
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn connect(&self, endpoint: &Url) -> NetworkResult<MemoryTransport> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.should_refuse() {
            return Err(NetworkError::Connect {
                endpoint: endpoint.to_string(),
                message: format!("attempt {} refused", attempt),
            });
        }

        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            to_client,
            from_client,
        };
        self.peers.send(peer).map_err(|_| NetworkError::Connect {
            endpoint: endpoint.to_string(),
            message: "no server listening".to_string(),
        })?;
        Ok(MemoryTransport { incoming, outgoing })
    }
}

/// Client end of an in-memory connection.
pub struct MemoryTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: String) -> NetworkResult<()> {
        self.outgoing
            .send(frame)
            .map_err(|_| NetworkError::Transport("peer hung up".to_string()))
    }

    async fn recv(&mut self) -> Option<NetworkResult<String>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) -> NetworkResult<()> {
        self.incoming.close();
        Ok(())
    }
}

/// Server end of an in-memory connection. Dropping it closes the connection.
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    pub fn deliver(&self, event: &ServerEvent) {
        if let Ok(frame) = serde_json::to_string(event) {
            self.deliver_raw(frame);
        }
    }

    pub fn deliver_raw(&self, frame: impl Into<String>) {
        let _ = self.to_client.send(frame.into());
    }

    /// Next event the client sent. `None` once the client side is gone.
    /// Frames that do not decode are skipped.
    pub async fn next_sent(&mut self) -> Option<ClientEvent> {
        loop {
            let frame = self.from_client.recv().await?;
            if let Ok(event) = serde_json::from_str(&frame) {
                return Some(event);
            }
        }
    }

    /// Like [`next_sent`](Self::next_sent) but without waiting.
    pub fn try_next_sent(&mut self) -> Option<ClientEvent> {
        while let Ok(frame) = self.from_client.try_recv() {
            if let Ok(event) = serde_json::from_str(&frame) {
                return Some(event);
            }
        }
        None
    }
}
