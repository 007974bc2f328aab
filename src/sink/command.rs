//! Desktop notifications through a notify-send compatible command

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::NotificationSink;

/// notify-send のラッパー
///
/// The id printed by the first call is passed back on later calls so each
/// notification replaces the previous popup instead of stacking.
pub struct CommandSink {
    program: String,
    icon: PathBuf,
    expire_timeout_ms: u32,
    id: Option<u32>,
}

impl CommandSink {
    pub fn new(program: &str, icon: &Path, expire_timeout_ms: u32) -> Result<Self> {
        // アイコンは絶対パスで渡す
        let icon = if icon.is_absolute() {
            icon.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Failed to resolve icon path")?
                .join(icon)
        };

        Ok(Self {
            program: program.to_string(),
            icon,
            expire_timeout_ms,
            id: None,
        })
    }

    /// Id of the popup currently on screen
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    fn args(&self, tip: &str, title: &str, info: &str) -> Vec<String> {
        let mut args = vec![
            "--app-name".to_string(),
            tip.to_string(),
            "--icon".to_string(),
            self.icon.to_string_lossy().to_string(),
            "--expire-time".to_string(),
            self.expire_timeout_ms.to_string(),
            "--print-id".to_string(),
        ];
        if let Some(id) = self.id {
            args.push("--replace-id".to_string());
            args.push(id.to_string());
        }
        args.push(title.to_string());
        args.push(info.to_string());
        args
    }

    fn send(&mut self, tip: &str, title: &str, info: &str) -> Result<()> {
        let output = Command::new(&self.program)
            .args(self.args(tip, title, info))
            .output()
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed: {}", self.program, stderr.trim());
        }

        // 古い notify-send は ID を出力しない
        if let Ok(id) = String::from_utf8_lossy(&output.stdout).trim().parse() {
            self.id = Some(id);
        }
        Ok(())
    }
}

impl NotificationSink for CommandSink {
    fn add_notify_icon(&mut self, tip: &str, title: &str, info: &str) -> Result<()> {
        self.id = None;
        self.send(tip, title, info)
    }

    fn update(&mut self, tip: &str, title: &str, info: &str) -> Result<()> {
        self.send(tip, title, info)
    }

    fn close(&mut self) -> Result<()> {
        // notify-send cannot withdraw a popup; let it expire
        self.id = None;
        Ok(())
    }
}
