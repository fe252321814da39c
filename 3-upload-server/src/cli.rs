use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

use crate::storage::DEFAULT_EXTENSIONS;

/// Accept multipart file uploads into a directory.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address the server should bind to. Use port 0 for an ephemeral port.
    #[arg(long, env = "UPLOAD_SERVER_LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Directory accepted files are written to. Created if missing.
    #[arg(long, env = "UPLOAD_SERVER_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// Comma-separated file extensions that may be uploaded.
    #[arg(long, env = "UPLOAD_SERVER_ALLOW_EXT", value_delimiter = ',',
          default_values_t = DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()))]
    pub allow_ext: Vec<String>,

    /// Largest request body accepted, in bytes.
    #[arg(long, env = "UPLOAD_SERVER_MAX_BYTES", default_value_t = 16 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}
