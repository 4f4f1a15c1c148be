use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::info;

use crate::sync::client::DEFAULT_BATCH_TIMEOUT;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Budget for each stream of a round, in seconds.
    pub batch_timeout_secs: u64,

    /// Hook definitions pushed to the service before each round. Honoured in
    /// debug builds only.
    pub debug_hooks: Option<PathBuf>,

    pub simulated: SimulatedSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatedSettings {
    pub batch_size: usize,
    pub max_batch_delay_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_timeout_secs: DEFAULT_BATCH_TIMEOUT.as_secs(),
            debug_hooks: None,
            simulated: SimulatedSettings::default(),
        }
    }
}

impl Default for SimulatedSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_batch_delay_ms: 150,
        }
    }
}

static SETTINGS: OnceCell<SyncSettings> = OnceCell::new();

impl SyncSettings {
    pub const FILE_NAME: &'static str = "hooksync.yml";

    pub fn load() -> Result<&'static SyncSettings> {
        SETTINGS.get_or_try_init(|| Self::load_from(Path::new(Self::FILE_NAME)))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;

        Self::from_yaml(&raw).with_context(|| format!("invalid settings {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let settings: SyncSettings =
            serde_yaml::from_str(raw).context("failed to parse settings")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    /// Debug hooks are an environment-gated side effect: release builds never
    /// push them, whatever the settings say.
    pub fn debug_hooks(&self) -> Option<&Path> {
        if cfg!(debug_assertions) {
            self.debug_hooks.as_deref()
        } else {
            None
        }
    }

    fn validate(&self) -> Result<()> {
        if self.batch_timeout_secs == 0 {
            bail!("batch_timeout_secs must be > 0");
        }
        if self.simulated.batch_size == 0 {
            bail!("simulated.batch_size must be > 0");
        }
        Ok(())
    }
}
