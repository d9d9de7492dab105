use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::HubHandle;
use super::messages::{ClientMessage, INVALID_MESSAGE_FORMAT, ServerMessage};
use super::types::{ClientId, OutboundMessage};
use crate::config::Config;

/// How long a closing connection may spend flushing queued frames
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a new TCP connection has to complete the WebSocket upgrade
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
struct Keepalive {
    ping_interval: Duration,
    pong_timeout: Duration,
}

pub struct SignalingServer {
    handle: HubHandle,
    keepalive: Keepalive,
}

impl SignalingServer {
    /// Spawns the hub actor; must be called inside a tokio runtime.
    pub fn new(config: &Config) -> Self {
        Self {
            handle: HubHandle::spawn(),
            keepalive: Keepalive {
                ping_interval: config.ping_interval,
                pong_timeout: config.pong_timeout,
            },
        }
    }

    /// Handle to the shared hub, for introspection
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    pub async fn bind(addr: &str) -> std::io::Result<TcpListener> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signaling server listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Accept connections until `shutdown` resolves, then close every live
    /// connection and wait for its cleanup to finish.
    pub async fn run(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        let (close_tx, close_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, closing {} connection(s)", connections.len());
                    break;
                }

                Some(_) = connections.join_next(), if !connections.is_empty() => {}

                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                            continue;
                        }
                    };
                    let handle = self.handle.clone();
                    let keepalive = self.keepalive;
                    let close_rx = close_rx.clone();

                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, handle, keepalive, close_rx).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
            }
        }

        let _ = close_tx.send(true);
        while connections.join_next().await.is_some() {}
        info!("Signaling server stopped");

        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: HubHandle,
    keepalive: Keepalive,
    mut close_rx: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, tokio_tungstenite::accept_async(stream));
    let ws_stream = tokio::select! {
        _ = close_rx.changed() => {
            debug!("Shutdown before handshake completed from {}", addr);
            return Ok(());
        }
        accepted = handshake => match accepted {
            Ok(ws_stream) => ws_stream?,
            Err(_) => {
                warn!("Handshake timeout from {}", addr);
                return Ok(());
            }
        },
    };
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let client_id = handle.connect(tx.clone()).await?;
    info!("Client {} connected from {}", client_id, addr);

    let mut ping_interval = tokio::time::interval(keepalive.ping_interval);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = close_rx.changed() => {
                let _ = ctrl_tx.send(Message::Close(None));
                debug!("Closing {} for shutdown", client_id);
                break;
            }

            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", client_id);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + keepalive.pong_timeout);
                debug!("Ping sent to {}", client_id);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", client_id);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", client_id, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        if let Err(e) = handle_text_message(&text, &tx, &handle, &client_id).await {
                            error!("Dropping connection {}: {}", client_id, e);
                            break;
                        }
                    }
                    Message::Binary(_) => {
                        warn!("Binary frame from {}", client_id);
                        reply_error(&tx, INVALID_MESSAGE_FORMAT);
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", client_id);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", client_id);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    handle.disconnect(&client_id).await;

    drop(tx);
    drop(ctrl_tx);
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
    info!("WebSocket disconnected: {} ({})", client_id, addr);

    Ok(())
}

/// Decode one text frame and route it. An error means the connection
/// can no longer be served.
async fn handle_text_message(
    text: &str,
    tx: &mpsc::UnboundedSender<OutboundMessage>,
    handle: &HubHandle,
    client_id: &ClientId,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let client_msg = match ClientMessage::decode(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("Invalid message from {}: {}", client_id, e);
            reply_error(tx, INVALID_MESSAGE_FORMAT);
            return Ok(());
        }
    };

    handle.inbound(client_id, client_msg).await?;
    Ok(())
}

fn reply_error(tx: &mpsc::UnboundedSender<OutboundMessage>, message: &str) {
    let _ = tx.send(OutboundMessage::from(ServerMessage::error(message)));
}
