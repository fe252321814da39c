use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Check an email and password against a file of known users.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address the server should bind to. Use port 0 for an ephemeral port.
    #[arg(long, env = "LOGIN_SERVER_LISTEN", default_value = "0.0.0.0:5002")]
    pub listen: SocketAddr,

    /// JSON file of the form {"users":[{"email":..,"password_sha256":..}]}.
    #[arg(long, env = "LOGIN_SERVER_USERS")]
    pub users: PathBuf,
}
