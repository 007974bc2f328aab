use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sink::SinkBackend;

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Producer address to dial
    #[serde(default = "default_address")]
    pub address: String,
    /// Notification icon path
    #[serde(default = "default_icon")]
    pub icon: PathBuf,
    /// Tray icon / application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Pause between failed connection attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub sink: SinkConfig,
}

fn default_address() -> String {
    "localhost:9998".to_string()
}

fn default_icon() -> PathBuf {
    PathBuf::from("icon.ico")
}

fn default_name() -> String {
    "Notifier".to_string()
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: default_address(),
            icon: default_icon(),
            name: default_name(),
            retry_delay_ms: default_retry_delay_ms(),
            sink: SinkConfig::default(),
        }
    }
}

/// 通知バックエンド設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_backend")]
    pub backend: SinkBackend,
    /// notify-send compatible program
    #[serde(default = "default_command")]
    pub command: String,
    /// Popup lifetime
    #[serde(default = "default_expire_timeout_ms")]
    pub expire_timeout_ms: u32,
}

fn default_backend() -> SinkBackend {
    SinkBackend::Command
}

fn default_command() -> String {
    "notify-send".to_string()
}

fn default_expire_timeout_ms() -> u32 {
    5000
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            command: default_command(),
            expire_timeout_ms: default_expire_timeout_ms(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み（存在しない場合はデフォルトを作成して保存）
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`, writing the defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;
            Ok(config)
        } else {
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                tracing::warn!("Failed to save default config: {}", e);
            }
            Ok(config)
        }
    }

    /// 設定ファイルパスを取得
    pub fn config_path() -> Result<PathBuf> {
        // ~/.config/notify-relay/config.toml を使用
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))?;
        Ok(base_dirs.home_dir().join(".config/notify-relay/config.toml"))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
