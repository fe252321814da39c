use std::{net::SocketAddr, time::Duration};

use clap::Parser;

use crate::{
    policy::{BroadcastPolicy, Reply},
    registry::RegistryLimits,
    relay::{RelayConfig, SessionLimits},
};

/// Relay every message a WebSocket client sends to all connected clients.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address the relay should bind to. Use port 0 for an ephemeral port.
    #[arg(long, env = "CHAT_RELAY_LISTEN", default_value = "0.0.0.0:4000")]
    pub listen: SocketAddr,

    /// Broadcast this text for every message instead of echoing the message itself.
    #[arg(long, env = "CHAT_RELAY_FIXED_REPLY", value_name = "TEXT")]
    pub fixed_reply: Option<String>,

    /// Do not send a broadcast back to the client that triggered it.
    #[arg(long, env = "CHAT_RELAY_EXCLUDE_SENDER")]
    pub exclude_sender: bool,

    /// Frames buffered per client before it is dropped as too slow.
    #[arg(long, env = "CHAT_RELAY_QUEUE_DEPTH", default_value_t = 64,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub queue_depth: u64,

    /// Refuse connections beyond this many. Unlimited when omitted.
    #[arg(long, env = "CHAT_RELAY_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,

    /// Close clients that send nothing for this many seconds.
    #[arg(long, env = "CHAT_RELAY_IDLE_TIMEOUT", value_name = "SECS",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub idle_timeout: Option<u64>,

    /// Give up on a single write to a client after this many seconds.
    #[arg(long, env = "CHAT_RELAY_WRITE_TIMEOUT", value_name = "SECS", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub write_timeout: u64,

    /// Seconds between keepalive pings.
    #[arg(long, env = "CHAT_RELAY_PING_INTERVAL", value_name = "SECS", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub ping_interval: u64,
}

impl Cli {
    pub fn relay_config(&self) -> RelayConfig {
        let reply = match &self.fixed_reply {
            Some(text) => Reply::Fixed(text.clone()),
            None => Reply::Echo,
        };

        RelayConfig {
            policy: BroadcastPolicy {
                reply,
                include_sender: !self.exclude_sender,
            },
            limits: RegistryLimits {
                queue_depth: usize::try_from(self.queue_depth).unwrap_or(usize::MAX),
                max_connections: self.max_connections,
            },
            session: SessionLimits {
                idle_timeout: self.idle_timeout.map(Duration::from_secs),
                write_timeout: Duration::from_secs(self.write_timeout),
                ping_interval: Duration::from_secs(self.ping_interval),
            },
        }
    }
}
