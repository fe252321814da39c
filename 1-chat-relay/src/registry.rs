use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::{mpsc, Mutex};

use crate::error::{DeliveryFailureReason, RelayError};

/// Process-unique identifier of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Read-only view of whether the registry still holds a connection.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handed to the task that owns a connection's socket.
///
/// The `outbox` yields every frame the relay queued for this connection and
/// returns `None` once the connection has been dropped from the registry.
#[derive(Debug)]
pub struct Registration {
    pub id: ConnectionId,
    pub outbox: mpsc::Receiver<String>,
    live: Liveness,
}

impl Registration {
    /// Whether the registry still holds this connection.
    pub fn is_live(&self) -> bool {
        self.live.is_live()
    }

    pub fn liveness(&self) -> Liveness {
        self.live.clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryLimits {
    /// Frames buffered per connection before it counts as too slow.
    pub queue_depth: usize,
    /// Upper bound on simultaneous connections, if any.
    pub max_connections: Option<usize>,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            max_connections: None,
        }
    }
}

struct Connection {
    outbound: mpsc::Sender<String>,
    live: Arc<AtomicBool>,
}

impl Connection {
    fn retire(self) {
        self.live.store(false, Ordering::Release);
    }
}

/// Outcome of queueing one payload to every matching connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub failed: Vec<RelayError>,
}

/// The set of live connections.
///
/// All access goes through one mutex, so a fan-out never observes a
/// half-applied connect or disconnect.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    limits: RegistryLimits,
}

impl ConnectionRegistry {
    pub fn new(limits: RegistryLimits) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            limits: RegistryLimits {
                queue_depth: limits.queue_depth.max(1),
                ..limits
            },
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().await.contains_key(&id)
    }

    pub(crate) async fn register(&self) -> Result<Registration, RelayError> {
        let mut connections = self.connections.lock().await;

        if let Some(limit) = self.limits.max_connections {
            if connections.len() >= limit {
                return Err(RelayError::RegistrationFailure { limit });
            }
        }

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (outbound, outbox) = mpsc::channel(self.limits.queue_depth);
        let live = Arc::new(AtomicBool::new(true));
        connections.insert(
            id,
            Connection {
                outbound,
                live: Arc::clone(&live),
            },
        );

        Ok(Registration {
            id,
            outbox,
            live: Liveness(live),
        })
    }

    pub(crate) async fn remove(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        match connections.remove(&id) {
            Some(connection) => {
                connection.retire();
                true
            }
            None => false,
        }
    }

    /// Queues `payload` from `sender` to every connection accepted by `filter`.
    /// Connections that cannot take it are removed before the lock is
    /// released. A sender that is no longer registered reaches nobody.
    pub(crate) async fn fan_out(
        &self,
        sender: ConnectionId,
        payload: &str,
        filter: impl Fn(ConnectionId) -> bool,
    ) -> FanOut {
        let mut connections = self.connections.lock().await;
        let mut report = FanOut::default();
        if !connections.contains_key(&sender) {
            return report;
        }

        for (&id, connection) in connections.iter() {
            if !filter(id) {
                continue;
            }
            match connection.outbound.try_send(payload.to_owned()) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    let reason = match err {
                        mpsc::error::TrySendError::Full(_) => DeliveryFailureReason::QueueFull,
                        mpsc::error::TrySendError::Closed(_) => DeliveryFailureReason::Closed,
                    };
                    report
                        .failed
                        .push(RelayError::DeliveryFailure { id, reason });
                }
            }
        }

        for failure in &report.failed {
            if let RelayError::DeliveryFailure { id, .. } = failure {
                if let Some(connection) = connections.remove(id) {
                    connection.retire();
                }
            }
        }

        report
    }

    /// Drops every connection, closing all outboxes. Returns how many there were.
    pub(crate) async fn clear(&self) -> usize {
        let mut connections = self.connections.lock().await;
        let count = connections.len();
        for (_, connection) in connections.drain() {
            connection.retire();
        }
        count
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(RegistryLimits::default())
    }
}
