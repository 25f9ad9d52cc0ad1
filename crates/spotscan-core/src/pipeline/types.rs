use serde::{Deserialize, Serialize};

use crate::detection::{passes_threshold, Spot};

/// Pipeline processing stage, used for progress reporting and logging.
#[derive(Clone, Copy, Debug)]
pub enum PipelineStage {
    Splitting,
    Detecting,
    Downsampling,
    MedianFiltering,
    BlobFiltering,
    ExtremaSearch,
    Scoring,
    Thresholding,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Splitting => write!(f, "Splitting frames"),
            Self::Detecting => write!(f, "Detecting spots"),
            Self::Downsampling => write!(f, "Downsampling"),
            Self::MedianFiltering => write!(f, "Median filtering"),
            Self::BlobFiltering => write!(f, "Enhancing blobs"),
            Self::ExtremaSearch => write!(f, "Finding maxima"),
            Self::Scoring => write!(f, "Scoring spots"),
            Self::Thresholding => write!(f, "Thresholding"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Settings shared by every frame of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionContext {
    pub ndim: usize,
    pub calibration: Vec<f64>,
    /// Requested per-axis downsampling factors (`diameter / calibration / 10`,
    /// at least 1). Spot coordinates are rescaled by these; the realised size
    /// ratio after flooring can differ slightly.
    pub factors: Vec<f64>,
    pub diameter: f64,
}

/// Every candidate spot of one frame with its scores, plus the frame's
/// threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub frame_index: usize,
    pub spots: Vec<Spot>,
    /// `None` when the frame had no candidates to threshold.
    pub threshold: Option<f64>,
}

impl FrameResult {
    /// Spots whose aggregated score is strictly above the threshold.
    pub fn selected(&self) -> Vec<&Spot> {
        self.spots
            .iter()
            .filter(|s| passes_threshold(s.aggregated_score, self.threshold))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FrameStatus {
    Detected(FrameResult),
    /// The frame's error message.
    Failed(String),
}

/// What happened to one frame of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameOutcome {
    pub frame_index: usize,
    pub status: FrameStatus,
}

impl FrameOutcome {
    pub fn result(&self) -> Option<&FrameResult> {
        match &self.status {
            FrameStatus::Detected(r) => Some(r),
            FrameStatus::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FrameStatus::Failed(_))
    }
}
