use std::{future::Future, net::SocketAddr};

use anyhow::Result;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{relay::Relay, session};

/// A bound listener plus the relay it serves.
pub struct RelayServer {
    listener: TcpListener,
    relay: Relay,
}

impl RelayServer {
    pub fn new(listener: TcpListener, relay: Relay) -> Self {
        Self { listener, relay }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Serves until `shutdown` resolves, then closes every client connection.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let RelayServer { listener, relay } = self;
        let app = router(relay.clone());

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                relay.shutdown().await;
            })
            .await?;

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

/// Routes: `/ws` for the WebSocket relay and `/health` for a liveness probe.
/// Any origin may connect.
pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/ws", get(upgrade))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(relay)
}

async fn upgrade(ws: WebSocketUpgrade, State(relay): State<Relay>) -> Response {
    ws.on_upgrade(move |socket| session::run(socket, relay))
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    connections: usize,
}

async fn health(State(relay): State<Relay>) -> Json<Health> {
    Json(Health {
        status: "ok",
        connections: relay.connection_count().await,
    })
}
