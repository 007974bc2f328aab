//! Sink that writes notifications to the log

use anyhow::Result;

use super::NotificationSink;

#[derive(Debug, Default)]
pub struct LogSink {
    shown: usize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications shown so far
    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl NotificationSink for LogSink {
    fn add_notify_icon(&mut self, tip: &str, title: &str, info: &str) -> Result<()> {
        tracing::info!("[{}] {}: {}", tip, title, info);
        self.shown = 1;
        Ok(())
    }

    fn update(&mut self, tip: &str, title: &str, info: &str) -> Result<()> {
        tracing::info!("[{}] {}: {}", tip, title, info);
        self.shown += 1;
        Ok(())
    }
}
