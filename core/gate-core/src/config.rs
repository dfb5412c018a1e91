//! Static gate configuration.
//!
//! Loaded once per process from `<config dir>/farm-gate/gate.toml`. A missing
//! file yields defaults; a malformed file is an error. `GATE_NETWORK` in the
//! environment overrides the file's network.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GateError, Result};

/// Network on which test-only routes (the builder) are reachable.
pub const TEST_NETWORK: &str = "mumbai";
pub const DEFAULT_NETWORK: &str = "mainnet";
pub const DEFAULT_VISIBILITY_DELAY_MS: u64 = 20;
pub const NETWORK_ENV: &str = "GATE_NETWORK";

const CONFIG_DIR_NAME: &str = "farm-gate";
const CONFIG_FILE_NAME: &str = "gate.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub network: String,
    /// Delay before a visibility change is committed.
    pub visibility_delay_ms: u64,
    pub wishing_well_contract: Option<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            visibility_delay_ms: DEFAULT_VISIBILITY_DELAY_MS,
            wishing_well_contract: None,
        }
    }
}

impl GateConfig {
    pub fn with_network(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            ..Self::default()
        }
    }

    pub fn is_test_network(&self) -> bool {
        self.network == TEST_NETWORK
    }

    pub fn visibility_delay(&self) -> Duration {
        Duration::from_millis(self.visibility_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.trim().is_empty() {
            return Err(GateError::InvalidConfig {
                field: "network",
                reason: "must not be blank".to_string(),
            });
        }
        // Anything near human perception defeats the point of the delay.
        if self.visibility_delay_ms > 1_000 {
            return Err(GateError::InvalidConfig {
                field: "visibility_delay_ms",
                reason: format!("{} exceeds 1000ms", self.visibility_delay_ms),
            });
        }
        Ok(())
    }
}

/// Returns the default configuration path, if a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads the gate configuration from `path` (or the default path) and applies
/// environment overrides.
pub fn load_gate_config(path: Option<PathBuf>) -> Result<GateConfig> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path().ok_or(GateError::ConfigDirNotFound)?,
    };

    let mut config = read_config_file(&config_path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<GateConfig> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(GateConfig::default());
        }
        Err(err) => {
            return Err(GateError::Io {
                context: format!("reading {}", path.display()),
                source: err,
            })
        }
    };

    toml::from_str::<GateConfig>(&content).map_err(|err| GateError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

pub fn apply_env_overrides<F>(config: &mut GateConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(network) = lookup(NETWORK_ENV).filter(|value| !value.trim().is_empty()) {
        tracing::debug!(network = %network, "Network overridden from environment");
        config.network = network.trim().to_string();
    }
}
