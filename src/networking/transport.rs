//! Text-frame transports
//!
//! [`Transport`] is one open, bidirectional channel of JSON text frames.
//! [`Connector`] opens a fresh transport for every connection attempt, so the
//! connection manager can reconnect without knowing what sits underneath.
//! Production code uses WebSockets; tests script frames in memory.

use crate::networking::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;
use websocket::{ClientBuilder, MaybeTlsStream, Message, WebSocketStream};

#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> NetworkResult<()>;

    /// Next text frame. `None` once the peer closed the channel.
    async fn recv(&mut self) -> Option<NetworkResult<String>>;

    async fn close(&mut self) -> NetworkResult<()>;
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, endpoint: &Url) -> NetworkResult<Self::Transport>;
}

/// Connects over `ws://` or `wss://`, identifying the player with a
/// `playerId` query parameter.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    player_id: String,
}

impl WebSocketConnector {
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
        }
    }

    /// Endpoint with the player id attached.
    pub fn endpoint_for(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        let others: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "playerId")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(others)
            .append_pair("playerId", &self.player_id);
        url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, endpoint: &Url) -> NetworkResult<WebSocketTransport> {
        let url = self.endpoint_for(endpoint);
        let builder = ClientBuilder::new()
            .uri(url.as_str())
            .map_err(|e| NetworkError::InvalidEndpoint {
                endpoint: url.to_string(),
                message: e.to_string(),
            })?;
        let (stream, _response) = builder.connect().await.map_err(|e| NetworkError::Connect {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        debug!("[NETWORK] WebSocket handshake with {} complete", endpoint);
        Ok(WebSocketTransport { stream })
    }
}

pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> NetworkResult<()> {
        self.stream
            .send(Message::text(frame))
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<NetworkResult<String>> {
        loop {
            match self.stream.next().await? {
                Ok(message) if message.is_close() => return None,
                Ok(message) => match message.as_text() {
                    Some(text) => return Some(Ok(text.to_string())),
                    // Ping/pong and binary frames carry nothing for us
                    None => continue,
                },
                Err(e) => return Some(Err(NetworkError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> NetworkResult<()> {
        self.stream
            .close()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))
    }
}
