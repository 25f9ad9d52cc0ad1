use std::f64::consts::PI;

use crate::detection::Spot;

use super::{ScorerKind, ScoringContext, Scorer};

/// Penalises spots whose sphere overlaps the nearest other spot's sphere.
///
/// Score is `1 - overlap / sphere volume` against the nearest neighbour:
/// 1 for an isolated spot, 0 for two coincident spots.
pub struct OverlapScorer;

impl Scorer for OverlapScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Overlap
    }

    fn score(&self, spot: &Spot, ctx: &ScoringContext<'_>) -> f64 {
        let calibration = ctx.calibration();
        let mut skipped_self = false;
        let mut nearest = f64::INFINITY;

        for position in ctx.positions {
            if !skipped_self && *position == spot.coordinates {
                skipped_self = true;
                continue;
            }
            let d = position
                .iter()
                .zip(&spot.coordinates)
                .zip(calibration)
                .map(|((a, b), cal)| ((a - b) * cal).powi(2))
                .sum::<f64>()
                .sqrt();
            nearest = nearest.min(d);
        }

        1.0 - overlap_fraction(ctx.radius(), nearest, spot.ndim())
    }
}

/// Fraction of one sphere (3D) or disc (2D) of radius `r` covered by an
/// equal one whose centre lies `d` away.
pub fn overlap_fraction(r: f64, d: f64, ndim: usize) -> f64 {
    if r <= 0.0 || d >= 2.0 * r {
        return 0.0;
    }
    let d = d.max(0.0);
    let fraction = if ndim == 2 {
        let lens = 2.0 * r * r * (d / (2.0 * r)).acos() - 0.5 * d * (4.0 * r * r - d * d).sqrt();
        lens / (PI * r * r)
    } else {
        let lens = PI * (4.0 * r + d) * (2.0 * r - d).powi(2) / 12.0;
        lens / (4.0 / 3.0 * PI * r.powi(3))
    };
    fraction.clamp(0.0, 1.0)
}
