use serde::{Deserialize, Serialize};

use crate::consts::EPSILON;

use super::spot::Spot;

/// How the per-frame score cutoff is chosen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Otsu's method over the frame's aggregated scores.
    #[default]
    Otsu,
    /// The same user-chosen cutoff for every frame.
    Fixed(f64),
}

impl std::fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Otsu => write!(f, "Otsu"),
            Self::Fixed(v) => write!(f, "Fixed ({v})"),
        }
    }
}

/// Compute the threshold for one frame's spots using the configured mode.
///
/// Spots without an aggregated score are ignored. Returns `None` when Otsu
/// has no scores to work with.
pub fn compute_threshold(spots: &[Spot], mode: &ThresholdMode) -> Option<f64> {
    match mode {
        ThresholdMode::Otsu => {
            let scores: Vec<f64> = spots.iter().filter_map(|s| s.aggregated_score).collect();
            otsu_threshold(&scores)
        }
        ThresholdMode::Fixed(v) => Some(*v),
    }
}

/// `(min, max)` of the finite scores, or `None` if there are none.
pub fn score_range(scores: &[f64]) -> Option<(f64, f64)> {
    scores
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Histogram of the finite scores with `ceil(sqrt(N))` equal-width bins over
/// their range. The maximum lands in the last bin.
///
/// Returns an empty histogram for no scores and a single bin when the range
/// is zero.
pub fn score_histogram(scores: &[f64]) -> Vec<usize> {
    let finite: Vec<f64> = scores.iter().copied().filter(|v| v.is_finite()).collect();
    let Some((min, max)) = score_range(&finite) else {
        return Vec::new();
    };

    let range = max - min;
    if range <= 0.0 {
        return vec![finite.len()];
    }

    let bins = (finite.len() as f64).sqrt().ceil() as usize;
    let bin_width = range / bins as f64;
    let mut histogram = vec![0usize; bins];
    for v in finite {
        let bin = (((v - min) / bin_width).floor() as usize).min(bins - 1);
        histogram[bin] += 1;
    }
    histogram
}

/// Otsu threshold over a frame's aggregated scores.
///
/// Class means are taken over bin indices (not bin centres) and the winning
/// bin `t` maps back to `min + (t + 1) * range / bins`. The first bin
/// reaching the maximal between-class variance wins.
///
/// No scores yields `None`. A single score or a zero range has nothing to
/// separate, so the threshold sits just below the minimum and every spot is
/// kept.
pub fn otsu_threshold(scores: &[f64]) -> Option<f64> {
    let (min, max) = score_range(scores)?;
    let range = max - min;
    let histogram = score_histogram(scores);
    let total: usize = histogram.iter().sum();
    if total < 2 || range <= EPSILON * min.abs().max(1.0) {
        return Some(below(min));
    }

    let mut sum_all = 0.0f64;
    for (i, &count) in histogram.iter().enumerate() {
        sum_all += i as f64 * count as f64;
    }

    let mut weight_bg = 0usize;
    let mut sum_bg = 0.0f64;
    let mut best_variance = 0.0f64;
    let mut best_bin = 0usize;

    for (t, &count) in histogram.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }

        sum_bg += t as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let between_variance =
            weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);

        if between_variance > best_variance {
            best_variance = between_variance;
            best_bin = t;
        }
    }

    Some(min + (best_bin + 1) as f64 * range / histogram.len() as f64)
}

/// Whether a spot with aggregated `score` passes `threshold`.
///
/// Scores must be strictly above the threshold. Unscored spots and frames
/// without a threshold select nothing.
pub fn passes_threshold(score: Option<f64>, threshold: Option<f64>) -> bool {
    matches!((score, threshold), (Some(s), Some(t)) if s > t)
}

/// Keep only spots whose aggregated score is strictly above `threshold`.
pub fn retain_above(spots: Vec<Spot>, threshold: f64) -> Vec<Spot> {
    spots
        .into_iter()
        .filter(|s| passes_threshold(s.aggregated_score, Some(threshold)))
        .collect()
}

/// A value strictly below `v`, scaled to its magnitude.
fn below(v: f64) -> f64 {
    v - EPSILON * v.abs().max(1.0)
}
