use tracing::{debug, info};

use crate::detection::{compute_threshold, find_regional_maxima, rescale_to_original};
use crate::error::{Result, SpotError};
use crate::filters::blob_filter::enhance_blobs;
use crate::filters::downsample::{downsample, downsample_factors};
use crate::filters::median::median_filter;
use crate::quality::{aggregate_scores, ScoringContext};
use crate::volume::Volume;

use super::config::DetectionConfig;
use super::types::{DetectionContext, FrameResult, PipelineStage};

impl DetectionContext {
    /// Resolve the per-run settings for frames of `ndim` axes.
    pub fn new(ndim: usize, calibration: &[f64], diameter: f64) -> Result<Self> {
        if calibration.len() < ndim {
            return Err(SpotError::InvalidParameter(format!(
                "calibration has {} entries for {}D frames",
                calibration.len(),
                ndim
            )));
        }
        let calibration = calibration[..ndim].to_vec();
        let factors = downsample_factors(diameter, &calibration, ndim)?;
        Ok(Self {
            ndim,
            calibration,
            factors,
            diameter,
        })
    }
}

/// Find, score and threshold the spots of a single frame.
///
/// Every candidate is returned with its scores; the threshold is recorded
/// alongside rather than applied.
pub fn detect_frame(
    frame_index: usize,
    volume: &Volume,
    ctx: &DetectionContext,
    config: &DetectionConfig,
) -> Result<FrameResult> {
    if volume.ndim() != ctx.ndim {
        return Err(SpotError::Precondition {
            stage: "detection",
            reason: format!(
                "frame {frame_index} is {}D but the run expects {}D frames",
                volume.ndim(),
                ctx.ndim
            ),
        });
    }

    debug!(frame = frame_index, stage = %PipelineStage::Downsampling, factors = ?ctx.factors);
    let mut reduced = downsample(volume, &ctx.factors)?;

    if config.use_median_filter {
        debug!(frame = frame_index, stage = %PipelineStage::MedianFiltering);
        reduced = median_filter(&reduced)?;
    }

    debug!(frame = frame_index, stage = %PipelineStage::BlobFiltering, shape = ?reduced.shape());
    let filtered = enhance_blobs(reduced)?;

    debug!(frame = frame_index, stage = %PipelineStage::ExtremaSearch);
    let mut spots = find_regional_maxima(&filtered, config.allow_edge_maxima)?;
    rescale_to_original(&mut spots, &ctx.factors)?;

    debug!(frame = frame_index, stage = %PipelineStage::Scoring, candidates = spots.len());
    if !spots.is_empty() {
        let positions: Vec<Vec<f64>> = spots.iter().map(|s| s.coordinates.clone()).collect();
        let scoring = ScoringContext {
            original: volume,
            filtered: &filtered,
            factors: &ctx.factors,
            diameter: ctx.diameter,
            positions: &positions,
        };
        aggregate_scores(&mut spots, &scoring, &config.scorers)?;
    }

    debug!(frame = frame_index, stage = %PipelineStage::Thresholding, mode = %config.threshold);
    let threshold = compute_threshold(&spots, &config.threshold);

    let result = FrameResult {
        frame_index,
        spots,
        threshold,
    };
    info!(
        frame = frame_index,
        candidates = result.spots.len(),
        selected = result.selected().len(),
        threshold = ?result.threshold,
        "Frame processed"
    );
    Ok(result)
}
