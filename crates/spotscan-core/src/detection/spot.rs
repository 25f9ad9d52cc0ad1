use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::quality::ScorerKind;

/// One detected blob candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    /// Position per axis (x, y[, z]). Downsampled-grid units straight out of
    /// the extrema finder, original pixel units after rescaling.
    pub coordinates: Vec<f64>,
    /// Raw score written by each scorer that ran on this spot.
    pub scores: BTreeMap<ScorerKind, f64>,
    /// Mean of the enabled scorers, set once all of them have run.
    pub aggregated_score: Option<f64>,
}

impl Spot {
    pub fn new(coordinates: Vec<f64>) -> Self {
        Self {
            coordinates,
            scores: BTreeMap::new(),
            aggregated_score: None,
        }
    }

    pub fn ndim(&self) -> usize {
        self.coordinates.len()
    }

    pub fn score(&self, kind: ScorerKind) -> Option<f64> {
        self.scores.get(&kind).copied()
    }

    /// Coordinates multiplied by the per-axis calibration.
    pub fn physical_position(&self, calibration: &[f64]) -> Vec<f64> {
        self.coordinates
            .iter()
            .zip(calibration)
            .map(|(c, cal)| c * cal)
            .collect()
    }

    /// Euclidean distance to `other` in physical units.
    pub fn physical_distance(&self, other: &Spot, calibration: &[f64]) -> f64 {
        self.coordinates
            .iter()
            .zip(&other.coordinates)
            .zip(calibration)
            .map(|((a, b), cal)| ((a - b) * cal).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}
