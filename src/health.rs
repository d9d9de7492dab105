//! Read-only HTTP introspection endpoint.

use std::future::Future;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::signaling::{HubHandle, RoomId};

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub rooms: Vec<RoomId>,
    pub connections: usize,
    /// RFC 3339, UTC
    pub timestamp: String,
}

pub fn router(hub: HubHandle) -> Router {
    Router::new().route("/health", get(health)).with_state(hub)
}

pub async fn health(State(hub): State<HubHandle>) -> Result<Json<HealthReport>, StatusCode> {
    let snapshot = hub.snapshot().await.map_err(|e| {
        warn!("Health snapshot failed: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(HealthReport {
        status: "ok",
        rooms: snapshot.rooms,
        connections: snapshot.connections,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn serve(
    listener: TcpListener,
    hub: HubHandle,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!("Health check available at http://{}/health", listener.local_addr()?);
    axum::serve(listener, router(hub))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::{ClientMessage, OutboundMessage};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn reports_rooms_and_connections() {
        let hub = HubHandle::spawn();
        let (tx, _rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let id = hub.connect(tx.clone()).await.unwrap();
        hub.connect(tx).await.unwrap();
        hub.inbound(
            &id,
            ClientMessage::Join {
                room: Some(RoomId::from("alpha")),
            },
        )
        .await
        .unwrap();

        let Json(report) = health(State(hub.clone())).await.unwrap();
        assert_eq!(report.status, "ok");
        assert_eq!(report.rooms, vec![RoomId::from("alpha")]);
        assert_eq!(report.connections, 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rooms"], serde_json::json!(["alpha"]));
    }

    #[tokio::test]
    async fn health_does_not_mutate_state() {
        let hub = HubHandle::spawn();
        let (tx, _rx) = mpsc::unbounded_channel::<OutboundMessage>();
        hub.connect(tx).await.unwrap();

        let before = hub.snapshot().await.unwrap();
        health(State(hub.clone())).await.unwrap();
        health(State(hub.clone())).await.unwrap();
        assert_eq!(hub.snapshot().await.unwrap(), before);
    }
}
