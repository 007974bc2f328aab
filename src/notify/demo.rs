//! Demo producer that pushes the current time to every consumer

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

use super::client::write_event;
use super::protocol::Event;

const DEMO_TOOLTIP: &str = "Timer";
const DEMO_TITLE: &str = "Current time";

/// Serve timer events on `address` until the process exits
pub async fn run_demo_producer(address: &str, interval: Duration) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    tracing::info!("Demo producer listening on {}", address);
    serve(listener, interval).await
}

async fn serve(listener: TcpListener, interval: Duration) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::info!("Consumer connected: {}", peer);
                tokio::spawn(async move {
                    if let Err(e) = push_timer(stream, interval).await {
                        tracing::debug!("Consumer {} gone: {:#}", peer, e);
                    }
                });
            }
            Err(e) => {
                tracing::warn!("Failed to accept connection: {}", e);
            }
        }
    }
}

fn timer_event() -> Event {
    Event::new(DEMO_TOOLTIP, DEMO_TITLE, chrono::Local::now().to_rfc3339())
}

async fn push_timer(mut stream: TcpStream, interval: Duration) -> Result<()> {
    loop {
        tokio::time::sleep(interval).await;
        write_event(&mut stream, &timer_event()).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::protocol::LineDecoder;

    #[test]
    fn test_timer_event_shape() {
        let event = timer_event();
        assert_eq!(event.tooltip, "Timer");
        assert_eq!(event.title, "Current time");
        assert!(chrono::DateTime::parse_from_rfc3339(&event.info).is_ok());
    }

    #[tokio::test]
    async fn test_consumer_receives_ticks() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, Duration::from_millis(10)));

        let stream = TcpStream::connect(address).await.unwrap();
        let mut decoder = LineDecoder::new(stream);
        for _ in 0..2 {
            let event = decoder.next_frame().await.decode().unwrap();
            assert_eq!(event.title, "Current time");
        }

        server.abort();
    }
}
