//! Viewer configuration, read from an optional `rptr.toml`.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration pointing at `data/data.csv` and `data/orders.csv`.

use std::path::{Path, PathBuf};

use rptr_core::lod::LodPolicy;
use rptr_core::markers::MarkerStyle;
use rptr_core::ViewSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "rptr.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub data: DataConfig,
    pub store: StoreConfig,
    pub markers: MarkerStyle,
    pub lod: LodPolicy,
    pub format: FormatConfig,
}

/// Where the two input streams (and the optional strategy source) live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub bars: PathBuf,
    pub orders: PathBuf,
    pub strategy: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            bars: PathBuf::from("data/data.csv"),
            orders: PathBuf::from("data/orders.csv"),
            strategy: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("backtests"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Significant digits for prices and quantities in the trade table.
    pub sig_digits: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self { sig_digits: 2 }
    }
}

impl ViewerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that parse but cannot work together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lod.lite_above > self.lod.hide_above {
            return Err(ConfigError::Invalid(format!(
                "lod.lite_above ({}) is above lod.hide_above ({})",
                self.lod.lite_above, self.lod.hide_above
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Explicit path if given (must exist), else `rptr.toml` in the working
    /// directory if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The display settings handed to the core.
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            markers: self.markers.clone(),
            lod: self.lod,
            sig_digits: self.format.sig_digits,
        }
    }
}
