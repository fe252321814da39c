use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use login_server::{cli::Cli, credentials::InMemoryCredentialStore, routes};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let store = InMemoryCredentialStore::load(&cli.users)
        .await
        .with_context(|| format!("failed to load users from {}", cli.users.display()))?;
    info!(users = store.len(), "credentials loaded");

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    info!("login server listening on {}", listener.local_addr()?);

    axum::serve(listener, routes::router(Arc::new(store)))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await?;

    Ok(())
}
