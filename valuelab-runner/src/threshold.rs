//! Buy-threshold resolution: explicit value, else calibration artifact, else default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Where the resolved threshold came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    Explicit,
    Artifact,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResolution {
    pub value: f64,
    pub source: ThresholdSource,
}

/// Artifact body: a bare number or `{"threshold": x}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Artifact {
    Bare(f64),
    Object { threshold: f64 },
}

/// Read a threshold from a JSON artifact.
///
/// The value must be a finite probability in [0, 1].
pub fn read_threshold_artifact(path: &Path) -> Result<f64, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
    let value = match serde_json::from_str::<Artifact>(&text)
        .map_err(|e| format!("parse {}: {e}", path.display()))?
    {
        Artifact::Bare(v) => v,
        Artifact::Object { threshold } => threshold,
    };
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("threshold {value} in {} is outside [0, 1]", path.display()));
    }
    Ok(value)
}

/// Pick the buy threshold for a run.
///
/// An unreadable or invalid artifact is logged and skipped rather than
/// failing the run.
pub fn resolve_buy_threshold(
    explicit: Option<f64>,
    artifact: Option<&Path>,
    default: f64,
) -> ThresholdResolution {
    if let Some(value) = explicit {
        return ThresholdResolution {
            value,
            source: ThresholdSource::Explicit,
        };
    }
    if let Some(path) = artifact {
        match read_threshold_artifact(path) {
            Ok(value) => {
                info!(threshold = value, path = %path.display(), "loaded calibrated threshold");
                return ThresholdResolution {
                    value,
                    source: ThresholdSource::Artifact,
                };
            }
            Err(reason) => warn!(%reason, fallback = default, "threshold artifact unusable"),
        }
    }
    ThresholdResolution {
        value: default,
        source: ThresholdSource::Default,
    }
}
