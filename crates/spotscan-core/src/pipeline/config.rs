use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_BLOB_DIAMETER;
use crate::detection::ThresholdMode;
use crate::error::{Result, SpotError};
use crate::quality::ScorerKind;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Physical size of one sample along x, y, z. Overrides the calibration
    /// carried by the input stack when set.
    pub calibration: Option<[f64; 3]>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl PipelineConfig {
    /// Reject settings that would make every frame fail.
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        if let Some(cal) = &self.calibration {
            if let Some(bad) = cal.iter().find(|c| !c.is_finite() || **c <= 0.0) {
                return Err(SpotError::InvalidParameter(format!(
                    "calibration must be positive, got {bad}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Expected blob diameter in physical units.
    #[serde(default = "default_diameter")]
    pub diameter: f64,
    /// Run a 3x3 in-plane median over the downsampled volume before the
    /// blob filter.
    #[serde(default)]
    pub use_median_filter: bool,
    /// Keep maxima whose plateau touches the volume boundary.
    #[serde(default)]
    pub allow_edge_maxima: bool,
    #[serde(default = "ScorerKind::default_enabled")]
    pub scorers: Vec<ScorerKind>,
    #[serde(default)]
    pub threshold: ThresholdMode,
}

fn default_diameter() -> f64 {
    DEFAULT_BLOB_DIAMETER
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            diameter: DEFAULT_BLOB_DIAMETER,
            use_median_filter: false,
            allow_edge_maxima: false,
            scorers: ScorerKind::default_enabled(),
            threshold: ThresholdMode::default(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.diameter.is_finite() || self.diameter <= 0.0 {
            return Err(SpotError::InvalidParameter(format!(
                "blob diameter must be positive, got {}",
                self.diameter
            )));
        }
        if self.scorers.is_empty() {
            return Err(SpotError::InvalidParameter(
                "at least one scorer must be enabled".into(),
            ));
        }
        if let ThresholdMode::Fixed(v) = self.threshold {
            if !v.is_finite() {
                return Err(SpotError::InvalidParameter(format!(
                    "fixed threshold must be finite, got {v}"
                )));
            }
        }
        Ok(())
    }
}

/// What a run does when one frame fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure for that frame and keep going.
    #[default]
    Continue,
    /// Abort the run with the error of the lowest-index failing frame.
    FailFast,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => write!(f, "Continue"),
            Self::FailFast => write!(f, "Fail fast"),
        }
    }
}
