use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use upload_server::{cli::Cli, routes, storage::UploadStore};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let store = UploadStore::open(&cli.upload_dir, &cli.allow_ext)
        .await
        .with_context(|| format!("failed to prepare {}", cli.upload_dir.display()))?;
    info!(dir = %store.dir().display(), allowed = ?cli.allow_ext, "upload directory ready");

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    info!("upload server listening on {}", listener.local_addr()?);

    axum::serve(listener, routes::router(store, cli.max_upload_bytes))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await?;

    Ok(())
}
