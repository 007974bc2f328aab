//! TCP connection session: one live connection to a producer

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::protocol::{Event, LineDecoder, StreamEnd};

/// Callback invoked synchronously for every decoded event
pub type Handler<'a> = dyn FnMut(Event) + Send + 'a;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connection closed by peer")]
    Closed,
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session state lock poisoned")]
    Poisoned,
}

/// Source of events that can be observed and stopped from another task
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to `address` and feed decoded events to `handler`
    ///
    /// Returns `Ok(())` only when the session was stopped; every other exit
    /// is an error (including the peer closing the stream).
    async fn observe(&self, address: &str, handler: &mut Handler<'_>) -> Result<(), SessionError>;

    /// Stop the active observation, if any. Safe to call repeatedly.
    fn stop(&self) -> Result<(), SessionError>;
}

/// Line-delimited JSON over TCP
#[derive(Debug, Default)]
pub struct SocketSession {
    running: AtomicBool,
    /// Cancellation handle of the live connection, `None` when idle
    conn: Mutex<Option<CancellationToken>>,
}

impl SocketSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn attach(&self) -> Result<Attached<'_>, SessionError> {
        let token = CancellationToken::new();
        let mut slot = self.conn.lock().map_err(|_| SessionError::Poisoned)?;
        *slot = Some(token.clone());
        Ok(Attached {
            session: self,
            token,
        })
    }

    async fn observe_attached(
        &self,
        address: &str,
        handler: &mut Handler<'_>,
        attached: Attached<'_>,
    ) -> Result<(), SessionError> {
        // stop() landed before the connection handle was registered
        if !self.is_running() {
            return Ok(());
        }
        self.read_loop(address, handler, &attached.token).await
    }

    async fn read_loop(
        &self,
        address: &str,
        handler: &mut Handler<'_>,
        token: &CancellationToken,
    ) -> Result<(), SessionError> {
        let stream = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            res = TcpStream::connect(address) => res.map_err(|source| SessionError::Connect {
                address: address.to_string(),
                source,
            })?,
        };
        tracing::info!("Connected to {}", address);

        let mut decoder = LineDecoder::new(stream);
        loop {
            let frame = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                frame = decoder.next_frame() => frame,
            };

            // A frame that races a stop is dropped undelivered.
            if !self.is_running() {
                return Ok(());
            }

            if let Some(event) = frame.decode() {
                handler(event);
            }

            match frame.end {
                None => {}
                Some(StreamEnd::Closed) => return Err(SessionError::Closed),
                Some(StreamEnd::Error(e)) => return Err(SessionError::Io(e)),
            }
        }
    }
}

/// Live-connection registration; clears the session state when the
/// observation ends, however it ends.
struct Attached<'a> {
    session: &'a SocketSession,
    token: CancellationToken,
}

impl Drop for Attached<'_> {
    fn drop(&mut self) {
        self.session.running.store(false, Ordering::Release);
        if let Ok(mut slot) = self.session.conn.lock() {
            slot.take();
        }
    }
}

#[async_trait]
impl Transport for SocketSession {
    async fn observe(&self, address: &str, handler: &mut Handler<'_>) -> Result<(), SessionError> {
        self.running.store(true, Ordering::Release);
        let attached = self.attach()?;
        self.observe_attached(address, handler, attached).await
    }

    fn stop(&self) -> Result<(), SessionError> {
        self.running.store(false, Ordering::Release);
        let token = self
            .conn
            .lock()
            .map_err(|_| SessionError::Poisoned)?
            .take();
        if let Some(token) = token {
            token.cancel();
        }
        Ok(())
    }
}
