use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Orchestrator settings read from `multitool.yaml`.
///
/// Every field has a default so a partial file (or no file at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// How long a run waits for the host-wide lock before giving up.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
    /// Directory holding the lock artifact. Defaults to the system temp dir.
    #[serde(default)]
    pub lock_dir: Option<PathBuf>,
    #[serde(default = "default_lock_name")]
    pub lock_name: String,
    /// Pause between consecutive actions of one run.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Reject `depends` entries that are not registered instead of dropping them.
    #[serde(default)]
    pub strict_dependencies: bool,
}

fn default_lock_timeout_secs() -> u64 {
    30
}

fn default_lock_name() -> String {
    paths::DEFAULT_LOCK_NAME.to_string()
}

fn default_throttle_ms() -> u64 {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout_secs(),
            lock_dir: None,
            lock_name: default_lock_name(),
            throttle_ms: default_throttle_ms(),
            strict_dependencies: false,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(&data)?;
        Ok(settings)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.lock_dir
            .clone()
            .unwrap_or_else(paths::default_lock_dir)
            .join(&self.lock_name)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}
