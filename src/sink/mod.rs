//! Notification sinks: where relayed events are displayed

pub mod command;
pub mod log;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::app::SinkConfig;
use crate::notify::Event;

pub use command::CommandSink;
pub use log::LogSink;

/// 通知バックエンドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkBackend {
    /// Write each notification to the log
    Log,
    /// Desktop notification through a notify-send compatible command
    Command,
}

/// Display surface for notifications
///
/// `add_notify_icon` shows the first notification; later calls to `update`
/// replace its content in place.
pub trait NotificationSink {
    fn add_notify_icon(&mut self, tip: &str, title: &str, info: &str) -> Result<()>;

    fn update(&mut self, tip: &str, title: &str, info: &str) -> Result<()>;

    /// Remove the notification
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Build the configured sink
pub fn build(config: &SinkConfig, icon: &Path) -> Result<Box<dyn NotificationSink + Send>> {
    match config.backend {
        SinkBackend::Log => Ok(Box::new(LogSink::new())),
        SinkBackend::Command => Ok(Box::new(CommandSink::new(
            &config.command,
            icon,
            config.expire_timeout_ms,
        )?)),
    }
}

/// Handler that forwards every event to `sink`
///
/// Delivery failures are logged and the relay keeps running.
pub fn forward_to<'a>(
    sink: &'a mut (dyn NotificationSink + Send),
) -> impl FnMut(Event) + Send + 'a {
    move |event: Event| {
        if let Err(e) = sink.update(&event.tooltip, &event.title, &event.info) {
            tracing::error!("notification error: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records updates, failing the first `failures` of them
    #[derive(Default)]
    struct FlakySink {
        failures: usize,
        shown: Vec<(String, String, String)>,
    }

    impl NotificationSink for FlakySink {
        fn add_notify_icon(&mut self, tip: &str, title: &str, info: &str) -> Result<()> {
            self.update(tip, title, info)
        }

        fn update(&mut self, tip: &str, title: &str, info: &str) -> Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                anyhow::bail!("display unavailable");
            }
            self.shown
                .push((tip.to_string(), title.to_string(), info.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_forward_survives_sink_errors() {
        let mut sink = FlakySink {
            failures: 1,
            ..Default::default()
        };
        {
            let mut handler = forward_to(&mut sink);
            handler(Event::new("a", "lost", "x"));
            handler(Event::new("a", "shown", "y"));
        }
        assert_eq!(
            sink.shown,
            vec![("a".to_string(), "shown".to_string(), "y".to_string())]
        );
    }

    #[test]
    fn test_build_log_backend() {
        let config = SinkConfig {
            backend: SinkBackend::Log,
            ..Default::default()
        };
        let mut sink = build(&config, Path::new("icon.ico")).unwrap();
        sink.add_notify_icon("Notifier", "Notifier started.", "listening")
            .unwrap();
        sink.update("app", "title", "info").unwrap();
        sink.close().unwrap();
    }

    #[test]
    fn test_backend_names() {
        let backend: SinkBackend = serde_json::from_str("\"command\"").unwrap();
        assert_eq!(backend, SinkBackend::Command);
        assert_eq!(serde_json::to_string(&SinkBackend::Log).unwrap(), "\"log\"");
    }
}
