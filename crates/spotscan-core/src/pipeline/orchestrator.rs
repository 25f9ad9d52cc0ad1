use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{Result, SpotError};
use crate::frame::Stack;
use crate::volume::Volume;

use super::config::{FailurePolicy, PipelineConfig};
use super::detect::detect_frame;
use super::types::{
    DetectionContext, FrameOutcome, FrameResult, FrameStatus, NoOpReporter, PipelineStage,
    ProgressReporter,
};

/// Run detection over every frame of `stack` with a thread-safe progress
/// reporter.
///
/// Outcomes come back in frame order. Under [`FailurePolicy::Continue`] a
/// failing frame is recorded as [`FrameStatus::Failed`]; under
/// [`FailurePolicy::FailFast`] the run returns the error of the lowest-index
/// failing frame.
pub fn run_pipeline_reported(
    stack: &Stack,
    config: &PipelineConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<Vec<FrameOutcome>> {
    config.validate()?;
    let calibration = config.calibration.unwrap_or(stack.calibration);
    info!(
        width = stack.width,
        height = stack.height,
        slices = stack.num_slices,
        frames = stack.num_frames,
        calibration = ?calibration,
        "Detecting spots in stack"
    );

    reporter.begin_stage(PipelineStage::Splitting, Some(stack.num_frames));
    let frames = stack
        .split_frames()?
        .into_iter()
        .map(|v| v.with_calibration(&calibration))
        .collect::<Result<Vec<_>>>()?;
    reporter.finish_stage();

    detect_volumes_reported(frames, config, reporter)
}

/// Run detection over every frame of `stack`.
pub fn run_pipeline(stack: &Stack, config: &PipelineConfig) -> Result<Vec<FrameOutcome>> {
    run_pipeline_reported(stack, config, Arc::new(NoOpReporter))
}

/// Run detection over frames that are already split.
///
/// All frames must share a dimensionality. Calibration comes from the config
/// when set, otherwise from the first frame.
pub fn detect_volumes_reported(
    frames: Vec<Volume>,
    config: &PipelineConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<Vec<FrameOutcome>> {
    config.validate()?;
    let first = frames.first().ok_or(SpotError::EmptySequence)?;
    let calibration = match config.calibration {
        Some(cal) => cal.to_vec(),
        None => first.calibration().to_vec(),
    };
    let ctx = DetectionContext::new(first.ndim(), &calibration, config.detection.diameter)?;
    info!(
        frames = frames.len(),
        ndim = ctx.ndim,
        factors = ?ctx.factors,
        policy = %config.failure_policy,
        "Running spot detection"
    );

    let total = frames.len();
    reporter.begin_stage(PipelineStage::Detecting, Some(total));
    let done = AtomicUsize::new(0);
    let process = |(i, volume): (usize, Volume)| {
        let result = detect_frame(i, &volume, &ctx, &config.detection);
        let completed = done.fetch_add(1, Ordering::Relaxed) + 1;
        reporter.advance(completed);
        result
    };
    let results: Vec<Result<FrameResult>> = if total >= PARALLEL_FRAME_THRESHOLD {
        frames.into_par_iter().enumerate().map(process).collect()
    } else {
        frames.into_iter().enumerate().map(process).collect()
    };
    reporter.finish_stage();

    collect_outcomes(results, config.failure_policy)
}

/// Run detection over frames that are already split, without progress
/// reporting.
pub fn detect_volumes(frames: Vec<Volume>, config: &PipelineConfig) -> Result<Vec<FrameOutcome>> {
    detect_volumes_reported(frames, config, Arc::new(NoOpReporter))
}

/// Apply the failure policy to per-frame results held in frame order.
fn collect_outcomes(
    results: Vec<Result<FrameResult>>,
    policy: FailurePolicy,
) -> Result<Vec<FrameOutcome>> {
    let mut outcomes = Vec::with_capacity(results.len());
    for (frame_index, result) in results.into_iter().enumerate() {
        let status = match result {
            Ok(r) => FrameStatus::Detected(r),
            Err(e) if policy == FailurePolicy::FailFast => return Err(e),
            Err(e) => {
                warn!(frame = frame_index, error = %e, "Frame failed, continuing");
                FrameStatus::Failed(e.to_string())
            }
        };
        outcomes.push(FrameOutcome {
            frame_index,
            status,
        });
    }

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    info!(
        frames = outcomes.len(),
        failed,
        "Spot detection complete"
    );
    Ok(outcomes)
}
