//! Intensity criteria measured on the full-resolution frame inside the
//! sphere of the expected blob diameter.

use crate::consts::CONTRAST_SHELL_FACTOR;
use crate::detection::Spot;

use super::neighborhood::{shell_stats, sphere_stats};
use super::{ScorerKind, ScoringContext, Scorer};

/// Population variance of the samples inside the spot sphere.
pub struct VarianceScorer;

impl Scorer for VarianceScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Variance
    }

    fn score(&self, spot: &Spot, ctx: &ScoringContext<'_>) -> f64 {
        sphere_stats(ctx.original, &spot.coordinates, ctx.radius()).variance()
    }
}

/// Summed intensity inside the spot sphere.
pub struct BrightnessScorer;

impl Scorer for BrightnessScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Brightness
    }

    fn score(&self, spot: &Spot, ctx: &ScoringContext<'_>) -> f64 {
        sphere_stats(ctx.original, &spot.coordinates, ctx.radius()).sum
    }
}

/// Mean inside the sphere minus the mean of the shell around it.
///
/// The shell runs from the spot radius out to twice the radius. A spot with
/// no shell voxels inside the frame gets its inner mean.
pub struct ContrastScorer;

impl Scorer for ContrastScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Contrast
    }

    fn score(&self, spot: &Spot, ctx: &ScoringContext<'_>) -> f64 {
        let radius = ctx.radius();
        let inner = sphere_stats(ctx.original, &spot.coordinates, radius);
        let outer = shell_stats(
            ctx.original,
            &spot.coordinates,
            radius,
            radius * CONTRAST_SHELL_FACTOR,
        );
        inner.mean() - outer.mean()
    }
}
