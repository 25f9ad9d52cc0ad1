pub mod blob;
pub mod log_response;
pub mod neighborhood;
pub mod overlap;
pub mod scoring;

use serde::{Deserialize, Serialize};

use crate::detection::Spot;
use crate::volume::Volume;

pub use scoring::aggregate_scores;

/// Identity of a spot quality criterion.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Blob-enhanced (LoG) response at the spot.
    Log,
    /// Intensity variance inside the spot sphere.
    Variance,
    /// Summed intensity inside the spot sphere.
    Brightness,
    /// Mean inside the sphere minus mean of the surrounding shell.
    Contrast,
    /// How little the spot's sphere overlaps its nearest neighbour's.
    Overlap,
}

impl ScorerKind {
    pub const ALL: [ScorerKind; 5] = [
        ScorerKind::Log,
        ScorerKind::Variance,
        ScorerKind::Brightness,
        ScorerKind::Contrast,
        ScorerKind::Overlap,
    ];

    /// Scorers enabled when nothing else is configured.
    pub fn default_enabled() -> Vec<ScorerKind> {
        vec![ScorerKind::Log, ScorerKind::Variance]
    }

    pub fn scorer(self) -> &'static dyn Scorer {
        match self {
            ScorerKind::Log => &log_response::LogScorer,
            ScorerKind::Variance => &blob::VarianceScorer,
            ScorerKind::Brightness => &blob::BrightnessScorer,
            ScorerKind::Contrast => &blob::ContrastScorer,
            ScorerKind::Overlap => &overlap::OverlapScorer,
        }
    }
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Log => write!(f, "LoG"),
            Self::Variance => write!(f, "Variance"),
            Self::Brightness => write!(f, "Brightness"),
            Self::Contrast => write!(f, "Contrast"),
            Self::Overlap => write!(f, "Overlap"),
        }
    }
}

/// Everything a scorer may read for one frame.
#[derive(Clone, Copy, Debug)]
pub struct ScoringContext<'a> {
    /// The frame at full resolution.
    pub original: &'a Volume,
    /// Blob-enhanced volume on the downsampled grid.
    pub filtered: &'a Volume,
    /// Per-axis downsample factors used to produce `filtered`.
    pub factors: &'a [f64],
    /// Expected blob diameter in physical units.
    pub diameter: f64,
    /// Positions (original pixel space) of every spot in the frame.
    pub positions: &'a [Vec<f64>],
}

impl ScoringContext<'_> {
    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn calibration(&self) -> &[f64] {
        self.original.calibration()
    }
}

/// A single quality criterion. Scorers only read the context and the spot,
/// never other scorers' output.
pub trait Scorer: Send + Sync {
    fn kind(&self) -> ScorerKind;

    /// Raw score for `spot`, whose coordinates are in original pixel space.
    fn score(&self, spot: &Spot, ctx: &ScoringContext<'_>) -> f64;
}

/// Score one spot with the scorer identified by `kind`.
pub fn score_with(kind: ScorerKind, spot: &Spot, ctx: &ScoringContext<'_>) -> f64 {
    kind.scorer().score(spot, ctx)
}
