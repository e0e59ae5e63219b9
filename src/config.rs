use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::{LayoutConfig, LayoutDirection};
use crate::locks::LockSettings;

/// Editor settings, loaded from `SCRIPTGRAPH_*` environment variables or a
/// TOML file. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Identity announced with lock claims
    pub holder: String,
    /// REST store base URL; takes precedence over `database_path`
    pub remote_base_url: Option<String>,
    pub api_token: Option<String>,
    /// Local SQLite file used when no remote URL is set
    pub database_path: Option<String>,
    pub request_timeout_ms: u64,
    pub presence_topic: String,
    pub lease_ttl_ms: u64,
    pub heartbeat_ms: u64,
    pub settle_window_ms: u64,
    pub acquire_timeout_ms: u64,
    pub history_depth: usize,
    pub log_level: String,
    pub layout: LayoutConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            holder: format!("editor-{}", Uuid::new_v4()),
            remote_base_url: None,
            api_token: None,
            database_path: None,
            request_timeout_ms: 10_000,
            presence_topic: "script".to_string(),
            lease_ttl_ms: 30_000,
            heartbeat_ms: 10_000,
            settle_window_ms: 250,
            acquire_timeout_ms: 5_000,
            history_depth: 100,
            log_level: "info".to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_env() -> Self {
        let values = Self::tracked_keys()
            .into_iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();
        Self::from_map(&values)
    }

    /// Builds a config from `SCRIPTGRAPH_*` keys; missing, blank or
    /// unparsable values fall back to the defaults.
    pub fn from_map(values: &HashMap<String, String>) -> Self {
        fn value(values: &HashMap<String, String>, key: &str) -> Option<String> {
            values
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        fn parsed<T: std::str::FromStr>(values: &HashMap<String, String>, key: &str, default: T) -> T {
            value(values, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        let defaults = Self::default();
        let layout = LayoutConfig {
            direction: value(values, "SCRIPTGRAPH_LAYOUT_DIRECTION")
                .and_then(|v| v.parse::<LayoutDirection>().ok())
                .unwrap_or(defaults.layout.direction),
            node_separation: parsed(
                values,
                "SCRIPTGRAPH_NODE_SEPARATION",
                defaults.layout.node_separation,
            ),
            rank_separation: parsed(
                values,
                "SCRIPTGRAPH_RANK_SEPARATION",
                defaults.layout.rank_separation,
            ),
            ..defaults.layout.clone()
        };

        Self {
            holder: value(values, "SCRIPTGRAPH_HOLDER").unwrap_or(defaults.holder),
            remote_base_url: value(values, "SCRIPTGRAPH_REMOTE_URL"),
            api_token: value(values, "SCRIPTGRAPH_API_TOKEN"),
            database_path: value(values, "SCRIPTGRAPH_DATABASE"),
            request_timeout_ms: parsed(
                values,
                "SCRIPTGRAPH_REQUEST_TIMEOUT_MS",
                defaults.request_timeout_ms,
            ),
            presence_topic: value(values, "SCRIPTGRAPH_PRESENCE_TOPIC")
                .unwrap_or(defaults.presence_topic),
            lease_ttl_ms: parsed(values, "SCRIPTGRAPH_LEASE_TTL_MS", defaults.lease_ttl_ms),
            heartbeat_ms: parsed(values, "SCRIPTGRAPH_HEARTBEAT_MS", defaults.heartbeat_ms),
            settle_window_ms: parsed(
                values,
                "SCRIPTGRAPH_SETTLE_WINDOW_MS",
                defaults.settle_window_ms,
            ),
            acquire_timeout_ms: parsed(
                values,
                "SCRIPTGRAPH_ACQUIRE_TIMEOUT_MS",
                defaults.acquire_timeout_ms,
            ),
            history_depth: parsed(values, "SCRIPTGRAPH_HISTORY_DEPTH", defaults.history_depth),
            log_level: value(values, "SCRIPTGRAPH_LOG_LEVEL").unwrap_or(defaults.log_level),
            layout,
        }
    }

    fn tracked_keys() -> Vec<&'static str> {
        vec![
            "SCRIPTGRAPH_HOLDER",
            "SCRIPTGRAPH_REMOTE_URL",
            "SCRIPTGRAPH_API_TOKEN",
            "SCRIPTGRAPH_DATABASE",
            "SCRIPTGRAPH_REQUEST_TIMEOUT_MS",
            "SCRIPTGRAPH_PRESENCE_TOPIC",
            "SCRIPTGRAPH_LEASE_TTL_MS",
            "SCRIPTGRAPH_HEARTBEAT_MS",
            "SCRIPTGRAPH_SETTLE_WINDOW_MS",
            "SCRIPTGRAPH_ACQUIRE_TIMEOUT_MS",
            "SCRIPTGRAPH_HISTORY_DEPTH",
            "SCRIPTGRAPH_LOG_LEVEL",
            "SCRIPTGRAPH_LAYOUT_DIRECTION",
            "SCRIPTGRAPH_NODE_SEPARATION",
            "SCRIPTGRAPH_RANK_SEPARATION",
        ]
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid editor config")?;
        config.check()?;
        Ok(config)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    fn check(&self) -> Result<()> {
        if self.holder.trim().is_empty() {
            anyhow::bail!("holder must not be blank");
        }
        if self.heartbeat_ms >= self.lease_ttl_ms {
            anyhow::bail!(
                "heartbeat_ms ({}) must be shorter than lease_ttl_ms ({})",
                self.heartbeat_ms,
                self.lease_ttl_ms
            );
        }
        Ok(())
    }

    /// Installs the global subscriber at `log_level`; see [`crate::telemetry::setup_logging`].
    pub fn init_logging(&self) -> bool {
        crate::telemetry::setup_logging(Some(&self.log_level))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn lock_settings(&self) -> LockSettings {
        // a heartbeat at or past the lease would let our own claims expire
        let heartbeat = self.heartbeat_ms.min(self.lease_ttl_ms / 2).max(1);
        LockSettings {
            holder: self.holder.clone(),
            topic: self.presence_topic.clone(),
            lease_ttl: Duration::from_millis(self.lease_ttl_ms),
            heartbeat_interval: Duration::from_millis(heartbeat),
            settle_window: Duration::from_millis(self.settle_window_ms),
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
        }
    }
}
