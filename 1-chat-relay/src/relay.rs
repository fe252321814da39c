use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    error::RelayError,
    policy::BroadcastPolicy,
    registry::{ConnectionId, ConnectionRegistry, Registration, RegistryLimits},
};

/// Everything needed to build a [`Relay`].
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub policy: BroadcastPolicy,
    pub limits: RegistryLimits,
    pub session: SessionLimits,
}

/// Per-connection timing used by the socket reader and writer.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    /// Close a connection that sends nothing for this long.
    pub idle_timeout: Option<Duration>,
    /// Upper bound on a single socket write.
    pub write_timeout: Duration,
    /// How often the writer pings an otherwise quiet connection.
    pub ping_interval: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            write_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Result of one [`Relay::on_message`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the payload was queued for.
    pub delivered: usize,
    /// Connections dropped because they could not take the payload.
    pub dropped: Vec<ConnectionId>,
}

/// Handle to the broadcast relay. Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct Relay {
    registry: Arc<ConnectionRegistry>,
    policy: Arc<BroadcastPolicy>,
    session: SessionLimits,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(config.limits)),
            policy: Arc::new(config.policy),
            session: config.session,
        }
    }

    pub fn policy(&self) -> &BroadcastPolicy {
        &self.policy
    }

    pub fn session_limits(&self) -> SessionLimits {
        self.session
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn is_registered(&self, id: ConnectionId) -> bool {
        self.registry.contains(id).await
    }

    /// Admits a new connection.
    pub async fn on_connect(&self) -> Result<Registration, RelayError> {
        let registration = self.registry.register().await?;
        info!(id = %registration.id, "client connected");
        Ok(registration)
    }

    /// Broadcasts what `sender` sent to every connection the policy selects.
    /// Messages from a connection that has already been dropped go nowhere.
    pub async fn on_message(&self, sender: ConnectionId, payload: &str) -> BroadcastReport {
        debug!(id = %sender, bytes = payload.len(), "message received");

        let policy = &self.policy;
        let outbound = policy.outbound(payload);
        let fan_out = self
            .registry
            .fan_out(sender, outbound, |recipient| {
                policy.reaches(sender, recipient)
            })
            .await;

        let mut dropped = Vec::with_capacity(fan_out.failed.len());
        for failure in fan_out.failed {
            warn!(error = %failure, "dropping peer");
            if let RelayError::DeliveryFailure { id, .. } = failure {
                dropped.push(id);
            }
        }

        debug!(
            id = %sender,
            delivered = fan_out.delivered,
            dropped = dropped.len(),
            "broadcast complete"
        );
        BroadcastReport {
            delivered: fan_out.delivered,
            dropped,
        }
    }

    /// Forgets a connection. Returns `false` if it was already gone.
    pub async fn on_disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.registry.remove(id).await;
        if removed {
            info!(%id, "client disconnected");
        }
        removed
    }

    /// Drops every connection; their writers close the sockets.
    pub async fn shutdown(&self) -> usize {
        let closed = self.registry.clear().await;
        info!(closed, "relay shutting down");
        closed
    }
}
