use crate::detection::Spot;

use super::neighborhood::nearest_sample;
use super::{ScorerKind, ScoringContext, Scorer};

/// Reads the blob-enhanced response at the spot.
///
/// The spot position is divided by the downsample factors to land back on
/// the filtered grid, then rounded to the nearest voxel.
pub struct LogScorer;

impl Scorer for LogScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Log
    }

    fn score(&self, spot: &Spot, ctx: &ScoringContext<'_>) -> f64 {
        let position: Vec<f64> = spot
            .coordinates
            .iter()
            .zip(ctx.factors)
            .map(|(c, f)| c / f)
            .collect();
        nearest_sample(ctx.filtered, &position).map_or(0.0, |v| v as f64)
    }
}
