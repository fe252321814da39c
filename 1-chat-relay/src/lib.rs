//! WebSocket broadcast relay.
//!
//! Every text frame a client sends is fanned out to all connected clients.
//! Each module focuses on a concrete responsibility:
//!
//! - [`cli`] parses the command line into a [`relay::RelayConfig`].
//! - [`registry`] owns the set of live connections and their outbound queues.
//! - [`relay`] implements connect / message / disconnect on top of the
//!   registry according to a [`policy::BroadcastPolicy`].
//! - [`frame`] classifies inbound WebSocket frames.
//! - [`server`] wires the relay into an axum router; `session` drives each
//!   connection's reader and writer.
//! - [`error`] holds the relay's error taxonomy.
//!
//! Integration tests drive the relay both through its API and over real
//! WebSocket connections.

pub mod cli;
pub mod error;
pub mod frame;
pub mod policy;
pub mod registry;
pub mod relay;
pub mod server;
mod session;
