use axum::extract::ws::Message;

use crate::error::RelayError;

/// An inbound WebSocket frame, as far as the relay cares.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A complete text payload to broadcast.
    Text(String),
    /// Ping or pong; proof of life and nothing else.
    Control,
    /// The peer is closing.
    Close,
}

pub fn decode(frame: Message) -> Result<Inbound, RelayError> {
    match frame {
        Message::Text(text) => Ok(Inbound::Text(text)),
        // Some clients ship text in binary frames; accept them when they decode.
        Message::Binary(bytes) => {
            let len = bytes.len();
            String::from_utf8(bytes)
                .map(Inbound::Text)
                .map_err(|_| RelayError::MalformedFrame { len })
        }
        Message::Ping(_) | Message::Pong(_) => Ok(Inbound::Control),
        Message::Close(_) => Ok(Inbound::Close),
    }
}
