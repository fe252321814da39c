use crate::registry::ConnectionId;

/// What gets broadcast when a client sends a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Reply {
    /// Broadcast the received payload verbatim.
    #[default]
    Echo,
    /// Broadcast this text regardless of what was received.
    Fixed(String),
}

/// Decides the outbound payload and its recipients for every inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPolicy {
    pub reply: Reply,
    pub include_sender: bool,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        Self {
            reply: Reply::Echo,
            include_sender: true,
        }
    }
}

impl BroadcastPolicy {
    pub fn outbound<'a>(&'a self, payload: &'a str) -> &'a str {
        match &self.reply {
            Reply::Echo => payload,
            Reply::Fixed(text) => text,
        }
    }

    pub fn reaches(&self, sender: ConnectionId, recipient: ConnectionId) -> bool {
        self.include_sender || sender != recipient
    }
}
