pub mod config;
mod detect;
mod orchestrator;
mod types;

pub use config::{DetectionConfig, FailurePolicy, PipelineConfig};
pub use detect::detect_frame;
pub use orchestrator::{
    detect_volumes, detect_volumes_reported, run_pipeline, run_pipeline_reported,
};
pub use types::{
    DetectionContext, FrameOutcome, FrameResult, FrameStatus, PipelineStage, ProgressReporter,
};
