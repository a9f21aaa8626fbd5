//! Connection manager - one persistent, self-healing channel to the server
//!
//! [`ConnectionManager::start`] spawns a background task that connects,
//! pumps frames in both directions and reconnects after failures. The handle
//! it returns is cheap to call from the session loop:
//!
//! - [`ConnectionManager::send`] queues an outgoing event and never blocks
//! - inbound events and status changes arrive, in order, on the
//!   [`NetEvent`] receiver returned alongside the handle
//!
//! # Reconnect policy
//!
//! Every failed connection attempt counts against `max_retries`. A successful
//! connection resets the count. When the count reaches `max_retries` the
//! state becomes [`ConnectionStatus::Exhausted`] and the task stops for good.
//! Between attempts the task sleeps for a random jitter of up to
//! `max_jitter`.

use crate::core::config::ReconnectPolicy;
use crate::networking::transport::{Connector, Transport};
use rand::Rng;
use shared::protocol::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Retries used up; nothing reconnects without a restart
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Consecutive failed connection attempts
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl ConnectionState {
    fn new(status: ConnectionStatus, retry_count: u32, last_error: Option<String>) -> Self {
        Self {
            status,
            retry_count,
            last_error,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(ConnectionStatus::Disconnected, 0, None)
    }
}

/// Everything the connection task reports, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    Status(ConnectionState),
    Event(ServerEvent),
}

pub struct ConnectionManager {
    cmd_tx: mpsc::UnboundedSender<ClientEvent>,
    state_rx: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ConnectionManager {
    /// Spawn the connection task. Must be called inside a Tokio runtime.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<C: Connector>(
        connector: C,
        endpoint: Url,
        policy: ReconnectPolicy,
        event_capacity: usize,
    ) -> (Self, mpsc::Receiver<NetEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(event_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(ConnectionState::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!("[NETWORK] Connection manager starting for {}", endpoint);
        let task = tokio::spawn(
            ConnectionTask {
                connector,
                endpoint,
                policy,
                cmd_rx,
                event_tx,
                state_tx,
                shutdown_rx,
            }
            .run(),
        );

        let manager = Self {
            cmd_tx,
            state_rx,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
        };
        (manager, event_rx)
    }

    /// Queue `event` for the server. Dropped with a debug log when the
    /// connection is not up; callers resynchronize on reconnect instead.
    pub fn send(&self, event: ClientEvent) {
        if !self.is_connected() {
            debug!("[NETWORK] Not connected, dropping {}", event.name());
            return;
        }
        if self.cmd_tx.send(event).is_err() {
            debug!("[NETWORK] Connection task gone, dropping event");
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().status == ConnectionStatus::Connected
    }

    /// Close the transport and stop the task.
    pub async fn shutdown(&mut self) {
        info!("[NETWORK] Connection manager shutting down");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("[NETWORK] Connection task ended with {}", e),
                Err(_) => {
                    warn!("[NETWORK] Connection task did not stop in time, aborting");
                    task.abort();
                }
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum PumpExit {
    /// Shutdown requested or nobody is listening any more
    Stop,
    /// Connection dropped; reconnect
    Lost(String),
}

struct ConnectionTask<C: Connector> {
    connector: C,
    endpoint: Url,
    policy: ReconnectPolicy,
    cmd_rx: mpsc::UnboundedReceiver<ClientEvent>,
    event_tx: mpsc::Sender<NetEvent>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl<C: Connector> ConnectionTask<C> {
    async fn run(mut self) {
        let mut retry_count: u32 = 0;
        let mut last_error: Option<String> = None;

        loop {
            if !self
                .publish(ConnectionState::new(ConnectionStatus::Connecting, retry_count, last_error.clone()))
                .await
            {
                return;
            }

            let attempt = tokio::select! {
                _ = &mut self.shutdown_rx => None,
                attempt = self.connector.connect(&self.endpoint) => Some(attempt),
            };
            let Some(attempt) = attempt else {
                self.publish(ConnectionState::new(ConnectionStatus::Disconnected, retry_count, last_error))
                    .await;
                return;
            };

            match attempt {
                Ok(mut transport) => {
                    retry_count = 0;
                    last_error = None;
                    // Anything queued while offline was built against stale state
                    let mut stale = 0usize;
                    while self.cmd_rx.try_recv().is_ok() {
                        stale += 1;
                    }
                    if stale > 0 {
                        debug!("[NETWORK] Discarded {} commands queued while offline", stale);
                    }

                    info!("[NETWORK] Connected to {}", self.endpoint);
                    if !self
                        .publish(ConnectionState::new(ConnectionStatus::Connected, 0, None))
                        .await
                    {
                        let _ = transport.close().await;
                        return;
                    }

                    match self.pump(&mut transport).await {
                        PumpExit::Stop => {
                            let _ = transport.close().await;
                            self.publish(ConnectionState::default()).await;
                            info!("[NETWORK] Connection closed");
                            return;
                        }
                        PumpExit::Lost(reason) => {
                            warn!("[NETWORK] Connection lost: {}", reason);
                            last_error = Some(reason);
                        }
                    }
                }
                Err(e) => {
                    retry_count += 1;
                    warn!(
                        "[NETWORK] Connection attempt {}/{} failed: {}",
                        retry_count, self.policy.max_retries, e
                    );
                    last_error = Some(e.to_string());
                    if retry_count >= self.policy.max_retries {
                        error!(
                            "[NETWORK] Giving up after {} failed attempts",
                            retry_count
                        );
                        self.publish(ConnectionState::new(ConnectionStatus::Exhausted, retry_count, last_error))
                            .await;
                        return;
                    }
                }
            }

            if !self
                .publish(ConnectionState::new(ConnectionStatus::Disconnected, retry_count, last_error.clone()))
                .await
            {
                return;
            }

            let delay = self.jitter();
            if !delay.is_zero() {
                tokio::select! {
                    _ = &mut self.shutdown_rx => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    /// Move frames until the connection drops or the task is told to stop.
    async fn pump<T: Transport>(&mut self, transport: &mut T) -> PumpExit {
        loop {
            tokio::select! {
                command = self.cmd_rx.recv() => match command {
                    Some(event) => match event.to_frame() {
                        Ok(frame) => {
                            debug!("[NETWORK] -> {}", event.name());
                            if let Err(e) = transport.send(frame).await {
                                return PumpExit::Lost(e.to_string());
                            }
                        }
                        Err(e) => error!("[NETWORK] Could not encode {}: {}", event.name(), e),
                    },
                    None => return PumpExit::Stop,
                },
                _ = &mut self.shutdown_rx => return PumpExit::Stop,
                incoming = transport.recv() => match incoming {
                    Some(Ok(frame)) => match ServerEvent::from_frame(&frame) {
                        Ok(event) => {
                            debug!("[NETWORK] <- {}", event.name());
                            if self.event_tx.send(NetEvent::Event(event)).await.is_err() {
                                return PumpExit::Stop;
                            }
                        }
                        Err(e) => warn!("[NETWORK] Ignoring frame ({}): {}", e, preview(&frame)),
                    },
                    Some(Err(e)) => return PumpExit::Lost(e.to_string()),
                    None => return PumpExit::Lost("closed by server".to_string()),
                },
            }
        }
    }

    /// Record and announce a state change. False once nobody listens.
    async fn publish(&self, state: ConnectionState) -> bool {
        self.state_tx.send_replace(state.clone());
        self.event_tx.send(NetEvent::Status(state)).await.is_ok()
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.policy.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

/// First characters of a frame, for logs.
fn preview(frame: &str) -> &str {
    match frame.char_indices().nth(120) {
        Some((end, _)) => &frame[..end],
        None => frame,
    }
}
