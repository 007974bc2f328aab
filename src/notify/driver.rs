//! Reconnect driver: keeps a transport observing across connection failures

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::session::{Handler, Transport};

/// Lifecycle of the relay loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Connecting, observing, or waiting out the retry delay
    Running,
    /// Shutdown was requested. Terminal.
    Stopped,
}

pub struct ReconnectDriver<T> {
    transport: Arc<T>,
    shutdown: CancellationToken,
    retry_delay: Duration,
}

impl<T: Transport> ReconnectDriver<T> {
    pub fn new(transport: Arc<T>, shutdown: CancellationToken, retry_delay: Duration) -> Self {
        Self {
            transport,
            shutdown,
            retry_delay,
        }
    }

    pub fn state(&self) -> DriverState {
        if self.shutdown.is_cancelled() {
            DriverState::Stopped
        } else {
            DriverState::Running
        }
    }

    /// Observe `address` until shutdown is requested
    ///
    /// No connection attempt starts or stays open once shutdown is requested.
    /// Failed observations are logged and retried after the retry delay.
    /// Errors surfacing after shutdown was requested are the expected result
    /// of stopping the session and are not reported.
    pub async fn run(&self, address: &str, handler: &mut Handler<'_>) {
        tracing::info!(
            "Relay started (address: {}, retry delay: {}ms)",
            address,
            self.retry_delay.as_millis()
        );

        while self.state() == DriverState::Running {
            // Shutdown may land after the state check but before the dial;
            // the abandoned observation cleans up when dropped.
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = self.transport.observe(address, handler) => result,
            };
            if self.state() == DriverState::Stopped {
                break;
            }

            if let Err(e) = result {
                tracing::warn!("observe error: {}", e);
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.retry_delay) => {}
                }
            }
        }

        tracing::info!("Relay stopped");
    }
}
