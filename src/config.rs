use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::ToolKind;
use crate::{klog_debug, Error, Result};

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_concurrency() -> usize {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_retry_on_timeout() -> bool {
    true
}

/// Per-tool execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Hard per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
    /// Re-attempts allowed after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Dispatch-ordering tie-break; higher runs earlier.
    #[serde(default)]
    pub priority: i32,
    /// Minimum spacing between dispatches of this tool, for rate-limited
    /// upstreams. None means unlimited.
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout_secs(),
            max_retries: default_max_retries(),
            priority: 0,
            min_interval_ms: None,
        }
    }
}

impl ToolConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval_ms.map(Duration::from_millis)
    }
}

/// Application configuration, loaded from `~/.kombajn/kombajn.toml`.
///
/// Missing file or missing keys fall back to defaults that mirror the
/// tools' upstream recommendations (300 s timeout, 3 retries, 5 workers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upper bound on concurrently running jobs.
    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,
    /// Base delay for exponential backoff between retries.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on the backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Whether a timed-out attempt is retried like a transient failure.
    #[serde(default = "default_retry_on_timeout")]
    pub retry_on_timeout: bool,
    /// Directory for result files and reports.
    pub output_dir: Option<String>,
    /// Per-tool overrides, keyed by tool name ("sherlock", "holehe", ...).
    #[serde(default)]
    pub tools: HashMap<String, ToolConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            retry_on_timeout: default_retry_on_timeout(),
            output_dir: None,
            tools: HashMap::new(),
        }
    }
}

impl Config {
    pub fn kombajn_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".kombajn"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::kombajn_dir()?.join("kombajn.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        klog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            klog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        klog_debug!(
            "Config loaded: concurrency_limit={}, {} tool overrides",
            config.concurrency_limit,
            config.tools.len()
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::kombajn_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        klog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Settings for one tool, falling back to defaults when the config
    /// file carries no `[tools.<name>]` table.
    pub fn tool(&self, kind: ToolKind) -> ToolConfig {
        self.tools.get(kind.as_str()).cloned().unwrap_or_default()
    }

    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(expand_tilde(dir)),
            None => Ok(Self::kombajn_dir()?.join("results")),
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
