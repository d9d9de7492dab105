use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use super::messages::{ClientMessage, ServerMessage};
use super::router::{Delivery, Router, Snapshot};
use super::types::{ClientId, OutboundMessage, SignalingError};

/// Commands sent to the hub actor
pub(crate) enum HubCommand {
    Connect {
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
        reply: oneshot::Sender<ClientId>,
    },
    Inbound {
        id: ClientId,
        msg: ClientMessage,
        reply: oneshot::Sender<Result<(), SignalingError>>,
    },
    Disconnect {
        id: ClientId,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Owns all room and connection state. Commands are applied one at a
/// time, so a membership change and its notifications form one unit.
/// Outbound frames go to unbounded per-connection queues and never wait
/// on a socket.
pub(crate) async fn hub_actor(mut rx: mpsc::Receiver<HubCommand>) {
    let mut router = Router::new();
    let mut outboxes: HashMap<ClientId, mpsc::UnboundedSender<OutboundMessage>> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            HubCommand::Connect { peer_tx, reply } => {
                let id = router.connect();
                let _ = peer_tx.send(OutboundMessage::from(ServerMessage::Connected {
                    client_id: id.clone(),
                }));
                outboxes.insert(id.clone(), peer_tx);
                let _ = reply.send(id);
            }

            HubCommand::Inbound { id, msg, reply } => {
                let result = router.handle(&id, msg).map(|out| dispatch(&outboxes, out));
                if let Err(e) = &result {
                    error!("Rejected message from {}: {}", id, e);
                }
                let _ = reply.send(result);
            }

            HubCommand::Disconnect { id, reply } => {
                let out = router.disconnect(&id);
                outboxes.remove(&id);
                dispatch(&outboxes, out);
                let _ = reply.send(());
            }

            HubCommand::Snapshot { reply } => {
                let _ = reply.send(router.snapshot());
            }
        }
    }
}

fn dispatch(
    outboxes: &HashMap<ClientId, mpsc::UnboundedSender<OutboundMessage>>,
    deliveries: Vec<Delivery>,
) {
    for Delivery { to, message } in deliveries {
        match outboxes.get(&to) {
            Some(tx) => {
                if tx.send(message).is_err() {
                    debug!("Outbox for {} closed, dropping message", to);
                }
            }
            None => debug!("No outbox for {}, dropping message", to),
        }
    }
}

/// Handle to communicate with the hub actor
#[derive(Clone)]
pub struct HubHandle {
    pub(crate) tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Spawn the hub actor on the current runtime
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<HubCommand>(1024);
        tokio::spawn(hub_actor(rx));
        Self { tx }
    }

    /// Register a connection. Its `connected` frame is queued on `peer_tx`
    /// before this returns.
    pub async fn connect(
        &self,
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<ClientId, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Connect {
            peer_tx,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(closed)
    }

    /// Route one decoded message from `id`
    pub async fn inbound(&self, id: &ClientId, msg: ClientMessage) -> Result<(), SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Inbound {
            id: id.clone(),
            msg,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(closed)?
    }

    /// Leave the current room (if any) and forget the connection
    pub async fn disconnect(&self, id: &ClientId) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .send(HubCommand::Disconnect {
                id: id.clone(),
                reply: reply_tx,
            })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }

    /// Current room ids and connection count
    pub async fn snapshot(&self) -> Result<Snapshot, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(closed)
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), SignalingError> {
        self.tx.send(cmd).await.map_err(closed)
    }
}

fn closed<E>(_: E) -> SignalingError {
    SignalingError::Internal("actor channel closed".to_string())
}
