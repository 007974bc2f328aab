//! Producer-side helpers for publishing events

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use super::protocol::Event;

/// Write one event as one line
pub async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &Event) -> Result<()> {
    let line = event.to_line().context("Failed to serialize event")?;
    writer
        .write_all(&line)
        .await
        .context("Failed to write event")?;
    writer.flush().await.context("Failed to flush stream")?;
    Ok(())
}

/// Act as a one-shot producer: wait for a consumer on `address`, deliver
/// `event` and hang up
pub async fn send_once(address: &str, event: &Event) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    tracing::info!("Waiting for a consumer on {}", address);
    deliver_once(listener, event).await
}

async fn deliver_once(listener: TcpListener, event: &Event) -> Result<()> {
    let (mut stream, peer) = listener
        .accept()
        .await
        .context("Failed to accept consumer")?;
    write_event(&mut stream, event).await?;
    stream.shutdown().await.context("Failed to close stream")?;
    tracing::info!("Event delivered to {}", peer);
    Ok(())
}
