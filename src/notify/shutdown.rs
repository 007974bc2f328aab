//! Termination signal handling

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::session::Transport;

/// Stops the active session once the process is asked to terminate
pub struct ShutdownCoordinator<T> {
    transport: Arc<T>,
    shutdown: CancellationToken,
}

impl<T: Transport> ShutdownCoordinator<T> {
    pub fn new(transport: Arc<T>, shutdown: CancellationToken) -> Self {
        Self {
            transport,
            shutdown,
        }
    }

    /// Wait for `signal`, then stop the session
    ///
    /// If the signal cannot be listened for, the session is stopped right
    /// away: a relay nobody can stop gracefully is not left running.
    pub async fn run<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        let listened = signal
            .await
            .context("Failed to listen for termination signal");
        let stopped = self.trigger();
        listened.and(stopped)
    }

    /// Request shutdown and stop the session. Only the first call acts.
    ///
    /// The shutdown flag is raised before stopping so the driver treats the
    /// session's resulting I/O error as expected and stays quiet about it.
    pub fn trigger(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Ok(());
        }
        tracing::info!("Shutdown requested");
        self.shutdown.cancel();
        self.transport.stop().context("stop error")
    }
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C elsewhere)
pub async fn termination_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
