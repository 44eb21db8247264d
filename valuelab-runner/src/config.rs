//! Run configuration loaded from TOML.
//!
//! ```toml
//! threshold = 0.58                # optional explicit buy threshold
//!
//! [inputs]
//! prices = "data/prices.parquet"  # .csv or .parquet
//! signals = "data/signals.csv"
//! index = "data/vnindex.csv"      # optional; missing → always bullish
//! threshold_artifact = "models/best_threshold.json"
//!
//! [strategy]                      # any EngineConfig field; omitted ones use defaults
//! max_positions = 10
//! trail_stop_percent = 0.15
//!
//! [output]
//! dir = "results"
//! ```
//!
//! Relative paths are resolved against the config file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use valuelab_core::engine::{ConfigError as EngineConfigError, EngineConfig};

/// Unique identifier for a backtest run (content hash of its config).
pub type RunId = String;

/// Errors reading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy parameters: {0}")]
    Strategy(#[from] EngineConfigError),
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Explicit buy threshold; wins over any artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub inputs: InputsConfig,
    /// Engine parameters. `buy_threshold` here is the fallback when neither
    /// an explicit value nor an artifact is available.
    #[serde(default)]
    pub strategy: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsConfig {
    pub prices: PathBuf,
    pub signals: PathBuf,
    #[serde(default)]
    pub index: Option<PathBuf>,
    #[serde(default)]
    pub threshold_artifact: Option<PathBuf>,
    /// Inputs were produced by `valuelab synth`.
    #[serde(default)]
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

impl BacktestConfig {
    /// Parse and validate a TOML document. Paths are left as written.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.strategy.validate()?;
        Ok(config)
    }

    /// Load from a file, resolving relative paths against its directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Make every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.inputs.prices);
        join(&mut self.inputs.signals);
        if let Some(p) = self.inputs.index.as_mut() {
            join(p);
        }
        if let Some(p) = self.inputs.threshold_artifact.as_mut() {
            join(p);
        }
        join(&mut self.output.dir);
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Deterministic id for an engine config: BLAKE3 of its JSON form.
pub fn run_id(config: &EngineConfig) -> RunId {
    // Plain data with finite floats; serialization cannot fail.
    let json = serde_json::to_string(config).unwrap_or_default();
    blake3::hash(json.as_bytes()).to_hex().to_string()
}
