use crate::error::{Result, SpotError};

use super::spot::Spot;

/// Map spot coordinates from the downsampled grid back to original pixel
/// space, in place. Must run exactly once, before any scorer.
pub fn rescale_to_original(spots: &mut [Spot], factors: &[f64]) -> Result<()> {
    if let Some(spot) = spots.iter().find(|s| s.coordinates.len() != factors.len()) {
        return Err(SpotError::Precondition {
            stage: "rescale",
            reason: format!(
                "spot has {} coordinates, {} downsample factors",
                spot.coordinates.len(),
                factors.len()
            ),
        });
    }

    for spot in spots.iter_mut() {
        for (c, f) in spot.coordinates.iter_mut().zip(factors) {
            *c *= f;
        }
    }
    Ok(())
}
