use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::debug;

use crate::consts::PARALLEL_SPOT_THRESHOLD;
use crate::detection::Spot;
use crate::error::{Result, SpotError};

use super::{ScorerKind, ScoringContext};

/// Run every enabled scorer on every spot, then set each spot's aggregated
/// score to the unweighted mean of its raw scores.
///
/// Duplicate entries in `enabled` count once. A spot's aggregate is written
/// only after all of its raw scores are in place. Spots are scored in
/// parallel for larger frames.
pub fn aggregate_scores(
    spots: &mut [Spot],
    ctx: &ScoringContext<'_>,
    enabled: &[ScorerKind],
) -> Result<()> {
    let kinds: BTreeSet<ScorerKind> = enabled.iter().copied().collect();
    if kinds.is_empty() {
        return Err(SpotError::InvalidParameter(
            "at least one scorer must be enabled".into(),
        ));
    }
    debug!(spots = spots.len(), scorers = ?kinds, "Scoring spots");

    let score_spot = |spot: &mut Spot| {
        for &kind in &kinds {
            let value = kind.scorer().score(spot, ctx);
            spot.scores.insert(kind, value);
        }
        let total: f64 = kinds.iter().map(|k| spot.scores[k]).sum();
        spot.aggregated_score = Some(total / kinds.len() as f64);
    };

    if spots.len() >= PARALLEL_SPOT_THRESHOLD {
        spots.par_iter_mut().for_each(score_spot);
    } else {
        spots.iter_mut().for_each(score_spot);
    }
    Ok(())
}
