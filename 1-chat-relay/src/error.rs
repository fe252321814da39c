use std::fmt;

use thiserror::Error;

use crate::registry::ConnectionId;

/// Failures the relay handles internally. None of them reach the client whose
/// message triggered them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    /// The connection could not be admitted and is closed right away.
    #[error("connection limit of {limit} reached")]
    RegistrationFailure { limit: usize },

    /// A single peer could not take a broadcast; it is dropped from the registry.
    #[error("delivery to {id} failed: {reason}")]
    DeliveryFailure {
        id: ConnectionId,
        reason: DeliveryFailureReason,
    },

    /// An inbound frame could not be decoded as text and was discarded.
    #[error("discarded {len}-byte binary frame that is not valid UTF-8")]
    MalformedFrame { len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailureReason {
    /// The peer's outbound queue is full; it is not keeping up.
    QueueFull,
    /// The peer's writer has gone away.
    Closed,
}

impl fmt::Display for DeliveryFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryFailureReason::QueueFull => f.write_str("outbound queue full"),
            DeliveryFailureReason::Closed => f.write_str("connection closed"),
        }
    }
}
