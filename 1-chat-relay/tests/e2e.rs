use std::{process::Stdio, time::Duration};

use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStdout, Command},
    time::timeout,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn binary_relays_between_clients() -> Result<()> {
    let (mut relay, mut stdout) = spawn_relay(&["--exclude-sender"])?;
    let addr = read_relay_addr(&mut stdout).await?;
    let url = format!("ws://{addr}/ws");

    // Keep the pipe drained so relay logging never blocks.
    let log_task = tokio::spawn(async move {
        let mut lines = stdout.lines();
        while let Ok(Some(_)) = lines.next_line().await {}
    });

    let (mut alice, _) = connect_async(url.as_str()).await.context("alice connect")?;
    let (mut bob, _) = connect_async(url.as_str()).await.context("bob connect")?;
    // Give the relay a moment to register both sessions.
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice.send(Message::Text("Hello from Alice".into())).await?;
    let heard = timeout(READ_TIMEOUT, bob.next())
        .await
        .context("waiting for bob to hear alice")?
        .ok_or_else(|| anyhow!("bob's connection closed"))??;
    assert_eq!(heard, Message::Text("Hello from Alice".into()));

    let echo = timeout(Duration::from_millis(200), alice.next()).await;
    assert!(echo.is_err(), "sender should not hear itself: {echo:?}");

    let _ = relay.kill().await;
    let _ = relay.wait().await;
    let _ = log_task.await;
    Ok(())
}

fn spawn_relay(extra_args: &[&str]) -> Result<(Child, BufReader<ChildStdout>)> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chat-relay"));
    cmd.arg("--listen")
        .arg("127.0.0.1:0")
        .args(extra_args)
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = cmd.spawn().context("failed to spawn relay")?;
    let stdout = child
        .stdout
        .take()
        .context("relay stdout missing after spawn")?;

    Ok((child, BufReader::new(stdout)))
}

async fn read_relay_addr(reader: &mut BufReader<ChildStdout>) -> Result<String> {
    let mut line = String::new();
    let bytes = timeout(READ_TIMEOUT, reader.read_line(&mut line))
        .await
        .map_err(|_| anyhow!("timed out waiting for relay banner"))??;
    if bytes == 0 {
        return Err(anyhow!("relay exited before printing its address"));
    }

    let trimmed = line.trim();
    let addr = trimmed
        .split_whitespace()
        .last()
        .context("unexpected relay banner format")?;
    if !addr.contains(':') {
        return Err(anyhow!("relay banner missing socket: {trimmed}"));
    }
    Ok(addr.to_string())
}
