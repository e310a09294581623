//! Live change notifications
//!
//! Keeps one WebSocket connection to the notification endpoint. Message
//! content is never parsed: any text or binary frame means "something
//! changed" and the owner refetches. The connection is retried with
//! exponential backoff unless reconnecting is turned off.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Commands sent to the subscriber task
#[derive(Debug, Clone)]
pub enum LiveCommand {
    /// Close the connection and stop the task
    Shutdown,
}

/// Events emitted by the subscriber task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Connection established
    Connected,
    /// A notification arrived; refetch
    Changed,
    /// Connecting or reading failed
    Error(String),
    /// The server ended the connection; `clean` when a close frame was seen
    Closed { clean: bool },
}

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Handle to control the subscriber task
pub struct LiveHandle {
    /// Send commands to the task
    pub command_tx: mpsc::Sender<LiveCommand>,
    /// Receive events; closes when the task ends
    pub event_rx: mpsc::Receiver<LiveEvent>,
    /// Watch connection status
    pub status_rx: watch::Receiver<LinkStatus>,
}

impl LiveHandle {
    pub fn status(&self) -> LinkStatus {
        *self.status_rx.borrow()
    }

    /// Ask the task to close the connection and stop
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(LiveCommand::Shutdown).await;
    }
}

/// Configuration for the subscriber
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// WebSocket URL
    pub url: String,
    /// Retry after the connection ends
    pub reconnect: bool,
    pub initial_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect: true,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
        }
    }
}

impl LiveConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.ws_url.clone(),
            reconnect: config.reconnect,
            initial_reconnect_delay: Duration::from_millis(config.initial_reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(config.max_reconnect_delay_ms),
        }
    }
}

/// Shortest wait between connection attempts
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a connection ended without error
enum SessionEnd {
    Shutdown,
    Closed { clean: bool },
}

/// Spawn the subscriber task
///
/// Must be called from within a tokio runtime.
pub fn spawn_subscriber(config: LiveConfig) -> LiveHandle {
    let (command_tx, command_rx) = mpsc::channel(8);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (status_tx, status_rx) = watch::channel(LinkStatus::Disconnected);

    tokio::spawn(subscriber_loop(config, command_rx, event_tx, status_tx));

    LiveHandle {
        command_tx,
        event_rx,
        status_rx,
    }
}

/// Main loop with reconnection
async fn subscriber_loop(
    config: LiveConfig,
    mut command_rx: mpsc::Receiver<LiveCommand>,
    event_tx: mpsc::Sender<LiveEvent>,
    status_tx: watch::Sender<LinkStatus>,
) {
    let initial_delay = config.initial_reconnect_delay.max(MIN_RECONNECT_DELAY);
    let max_delay = config.max_reconnect_delay.max(initial_delay);
    let mut reconnect_delay = initial_delay;

    loop {
        let _ = status_tx.send(LinkStatus::Connecting);

        let session = match connect(&config, &mut command_rx).await {
            Ok(Some(ws_stream)) => {
                info!("Connected to {}", config.url);
                let _ = status_tx.send(LinkStatus::Connected);
                let _ = event_tx.send(LiveEvent::Connected).await;

                // Reset backoff after a successful connection
                reconnect_delay = initial_delay;
                listen(ws_stream, &mut command_rx, &event_tx).await
            }
            Ok(None) => Ok(SessionEnd::Shutdown),
            Err(e) => Err(e),
        };

        match session {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Closed { clean }) => {
                if clean {
                    info!("Notification stream closed by server");
                } else {
                    warn!("Notification stream closed unexpectedly");
                }
                let _ = event_tx.send(LiveEvent::Closed { clean }).await;
            }
            Err(e) => {
                warn!("Notification stream error: {}", e);
                let _ = event_tx.send(LiveEvent::Error(e.message())).await;
            }
        }

        let _ = status_tx.send(LinkStatus::Disconnected);

        if !config.reconnect {
            break;
        }

        debug!("Reconnecting in {:?}", reconnect_delay);
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {
                reconnect_delay = (reconnect_delay * 2).min(max_delay);
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(LiveCommand::Shutdown) | None => break,
                }
            }
        }
    }

    let _ = status_tx.send(LinkStatus::Disconnected);
}

/// Open the connection; `None` when shut down before the handshake finished
async fn connect(
    config: &LiveConfig,
    command_rx: &mut mpsc::Receiver<LiveCommand>,
) -> ApiResult<Option<WsStream>> {
    tokio::select! {
        connected = connect_async(config.url.as_str()) => {
            let (ws_stream, _) = connected?;
            Ok(Some(ws_stream))
        }
        cmd = command_rx.recv() => {
            match cmd {
                Some(LiveCommand::Shutdown) | None => Ok(None),
            }
        }
    }
}

/// Forward notifications until the connection ends
async fn listen(
    ws_stream: WsStream,
    command_rx: &mut mpsc::Receiver<LiveCommand>,
    event_tx: &mpsc::Sender<LiveEvent>,
) -> ApiResult<SessionEnd> {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                match cmd {
                    Some(LiveCommand::Shutdown) | None => {
                        write.close().await.ok();
                        return Ok(SessionEnd::Shutdown);
                    }
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                        debug!("Change notification received");
                        let _ = event_tx.send(LiveEvent::Changed).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        // Send the queued close reply before dropping the socket
                        write.close().await.ok();
                        return Ok(SessionEnd::Closed { clean: true });
                    }
                    None => {
                        return Ok(SessionEnd::Closed { clean: false });
                    }
                    Some(Err(e)) => {
                        return Err(ApiError::from(e));
                    }
                    _ => {}
                }
            }
        }
    }
}
