#[allow(dead_code)]
mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ndarray::IxDyn;

use spotscan_core::detection::ThresholdMode;
use spotscan_core::error::SpotError;
use spotscan_core::filters::downsample::downsampled_shape;
use spotscan_core::pipeline::{
    detect_frame, detect_volumes, run_pipeline, run_pipeline_reported, DetectionConfig,
    DetectionContext, FailurePolicy, FrameStatus, PipelineConfig, PipelineStage,
    ProgressReporter,
};
use spotscan_core::quality::ScorerKind;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const BLOB_CENTRES_3D: [[f64; 3]; 3] = [[24.0, 24.0, 24.0], [72.0, 24.0, 24.0], [24.0, 72.0, 24.0]];

/// 96x96x48 frame: three bright blobs plus a dim noisy box away from them.
fn three_blob_frame(seed: u64) -> ndarray::ArrayD<f32> {
    let centres: Vec<Vec<f64>> = BLOB_CENTRES_3D.iter().map(|c| c.to_vec()).collect();
    let mut data = common::gaussian_blobs(&[96, 96, 48], &centres, 5.0, 200.0);
    common::add_noise_box(&mut data, &[60, 60, 16], &[84, 84, 32], 10.0, seed);
    data
}

fn blob_config() -> PipelineConfig {
    PipelineConfig {
        detection: DetectionConfig {
            diameter: 20.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Small 2D frame with one blob; `poisoned` frames carry a NaN sample.
fn small_frame(poisoned: bool) -> ndarray::ArrayD<f32> {
    let mut data = common::gaussian_blobs(&[40, 40], &[vec![20.0, 20.0]], 2.0, 50.0);
    if poisoned {
        data[IxDyn(&[5, 5])] = f32::NAN;
    }
    data
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn test_three_blobs_are_found_in_3d() {
    let stack = common::stack_from_frames(&[three_blob_frame(11)], [1.0, 1.0, 1.0]);
    let outcomes = run_pipeline(&stack, &blob_config()).unwrap();
    assert_eq!(outcomes.len(), 1);

    let result = outcomes[0].result().expect("frame should succeed");
    assert!(result.threshold.is_some());
    let selected = result.selected();
    assert_eq!(selected.len(), 3, "selected: {selected:?}");

    for centre in &BLOB_CENTRES_3D {
        let nearest = selected
            .iter()
            .map(|s| distance(&s.coordinates, centre))
            .fold(f64::INFINITY, f64::min);
        assert!(nearest <= 2.0, "no spot within 2 px of {centre:?}");
    }

    for spot in &result.spots {
        assert_eq!(spot.coordinates.len(), 3);
        assert_eq!(spot.scores.len(), 2);
        assert!(spot.aggregated_score.is_some());
    }
}

#[test]
fn test_two_blobs_are_found_in_2d() {
    let mut data = common::gaussian_blobs(&[80, 80], &[vec![20.0, 20.0], vec![60.0, 30.0]], 3.0, 200.0);
    common::add_noise_box(&mut data, &[30, 50], &[55, 75], 10.0, 5);
    let stack = common::stack_from_frames(&[data], [1.0, 1.0, 1.0]);

    let outcomes = run_pipeline(&stack, &PipelineConfig::default()).unwrap();
    let result = outcomes[0].result().unwrap();
    let selected = result.selected();
    assert_eq!(selected.len(), 2, "selected: {selected:?}");
    for centre in [[20.0, 20.0], [60.0, 30.0]] {
        assert!(selected.iter().any(|s| distance(&s.coordinates, &centre) <= 1.0));
    }
}

#[test]
fn test_single_blob_frame_keeps_its_spot() {
    let data = common::gaussian_blobs(&[32, 32, 16], &[vec![16.0, 16.0, 8.0]], 2.0, 100.0);
    let stack = common::stack_from_frames(&[data], [1.0, 1.0, 1.0]);

    let outcomes = run_pipeline(&stack, &PipelineConfig::default()).unwrap();
    let result = outcomes[0].result().unwrap();
    let selected = result.selected();
    assert_eq!(selected.len(), 1, "spots: {:?}", result.spots);
    assert!(distance(&selected[0].coordinates, &[16.0, 16.0, 8.0]) <= 1.0);
}

#[test]
fn test_frames_come_back_in_order() {
    let frames: Vec<_> = (0..4).map(|_| small_frame(false)).collect();
    let stack = common::stack_from_frames(&frames, [1.0, 1.0, 1.0]);
    let outcomes = run_pipeline(&stack, &PipelineConfig::default()).unwrap();

    let indices: Vec<usize> = outcomes.iter().map(|o| o.frame_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    for outcome in &outcomes {
        assert_eq!(outcome.result().unwrap().frame_index, outcome.frame_index);
    }
}

#[test]
fn test_unscored_candidates_are_kept_in_result() {
    let stack = common::stack_from_frames(&[small_frame(false)], [1.0, 1.0, 1.0]);
    let outcomes = run_pipeline(&stack, &PipelineConfig::default()).unwrap();
    let result = outcomes[0].result().unwrap();
    assert!(!result.spots.is_empty());
    assert!(result.selected().len() <= result.spots.len());
}

#[test]
fn test_fixed_threshold_applies_to_every_frame() {
    let frames: Vec<_> = (0..2).map(|_| small_frame(false)).collect();
    let stack = common::stack_from_frames(&frames, [1.0, 1.0, 1.0]);
    let config = PipelineConfig {
        detection: DetectionConfig {
            threshold: ThresholdMode::Fixed(1e9),
            ..Default::default()
        },
        ..Default::default()
    };
    let outcomes = run_pipeline(&stack, &config).unwrap();
    for outcome in &outcomes {
        let result = outcome.result().unwrap();
        assert_eq!(result.threshold, Some(1e9));
        assert!(result.selected().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Failure policy
// ---------------------------------------------------------------------------

#[test]
fn test_continue_records_failed_frame() {
    let frames = vec![small_frame(false), small_frame(true), small_frame(false)];
    let stack = common::stack_from_frames(&frames, [1.0, 1.0, 1.0]);
    let outcomes = run_pipeline(&stack, &PipelineConfig::default()).unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(!outcomes[0].is_failed());
    assert!(outcomes[1].is_failed());
    assert!(!outcomes[2].is_failed());
    match &outcomes[1].status {
        FrameStatus::Failed(message) => assert!(message.contains("Numerical failure")),
        FrameStatus::Detected(_) => panic!("poisoned frame should fail"),
    }
}

#[test]
fn test_fail_fast_returns_error() {
    let frames = vec![small_frame(false), small_frame(true), small_frame(false)];
    let stack = common::stack_from_frames(&frames, [1.0, 1.0, 1.0]);
    let config = PipelineConfig {
        failure_policy: FailurePolicy::FailFast,
        ..Default::default()
    };
    assert!(matches!(
        run_pipeline(&stack, &config),
        Err(SpotError::NumericalFailure(_))
    ));
}

#[test]
fn test_fail_fast_reports_lowest_failing_frame() {
    // Frame 1 fails numerically, frame 2 on dimensionality.
    let frames = vec![
        common::unit_volume(small_frame(false)),
        common::unit_volume(small_frame(true)),
        common::unit_volume(ndarray::ArrayD::zeros(IxDyn(&[8, 8, 8]))),
    ];
    let config = PipelineConfig {
        failure_policy: FailurePolicy::FailFast,
        ..Default::default()
    };
    assert!(matches!(
        detect_volumes(frames.clone(), &config),
        Err(SpotError::NumericalFailure(_))
    ));

    let outcomes = detect_volumes(frames, &PipelineConfig::default()).unwrap();
    assert!(outcomes[1].is_failed());
    assert!(outcomes[2].is_failed());
}

#[test]
fn test_invalid_config_aborts_before_any_frame() {
    let stack = common::stack_from_frames(&[small_frame(false)], [1.0, 1.0, 1.0]);
    let mut config = PipelineConfig::default();
    config.detection.scorers.clear();
    assert!(matches!(
        run_pipeline(&stack, &config),
        Err(SpotError::InvalidParameter(_))
    ));

    let mut config = PipelineConfig::default();
    config.detection.diameter = -1.0;
    assert!(run_pipeline(&stack, &config).is_err());
}

#[test]
fn test_empty_frame_list() {
    assert!(matches!(
        detect_volumes(Vec::new(), &PipelineConfig::default()),
        Err(SpotError::EmptySequence)
    ));
}

// ---------------------------------------------------------------------------
// Per-frame detection and context
// ---------------------------------------------------------------------------

#[test]
fn test_detection_context_factors() {
    let ctx = DetectionContext::new(3, &[0.5, 0.5, 2.0], 20.0).unwrap();
    assert_eq!(ctx.ndim, 3);
    assert_eq!(ctx.factors, vec![4.0, 4.0, 1.0]);

    let ctx_2d = DetectionContext::new(2, &[1.0, 1.0, 1.0], 7.3).unwrap();
    assert_eq!(ctx_2d.calibration, vec![1.0, 1.0]);
    assert_eq!(ctx_2d.factors, vec![1.0, 1.0]);
}

#[test]
fn test_detection_context_keeps_requested_factors() {
    let ctx = DetectionContext::new(2, &[1.0, 1.0], 25.0).unwrap();
    assert_eq!(ctx.factors, vec![2.5, 2.5]);

    // Flooring 64 / 2.5 to 25 samples gives a realised ratio of 2.56.
    let shape = downsampled_shape(&[64, 64], &ctx.factors).unwrap();
    assert_eq!(shape, vec![25, 25]);
    assert_ne!(64.0 / shape[0] as f64, ctx.factors[0]);
}

#[test]
fn test_detect_frame_rescales_to_original_pixels() {
    let data = common::gaussian_blobs(&[64, 64], &[vec![30.0, 34.0]], 4.0, 100.0);
    let volume = common::unit_volume(data);
    let ctx = DetectionContext::new(2, &[1.0, 1.0], 20.0).unwrap();
    assert_eq!(ctx.factors, vec![2.0, 2.0]);

    let result = detect_frame(0, &volume, &ctx, &DetectionConfig::default()).unwrap();
    let best = result
        .spots
        .iter()
        .max_by(|a, b| a.aggregated_score.unwrap().total_cmp(&b.aggregated_score.unwrap()))
        .unwrap();
    assert!(distance(&best.coordinates, &[30.0, 34.0]) <= 2.0);
}

#[test]
fn test_detect_frame_rejects_wrong_ndim() {
    let volume = common::unit_volume(small_frame(false));
    let ctx = DetectionContext::new(3, &[1.0, 1.0, 1.0], 7.3).unwrap();
    assert!(matches!(
        detect_frame(0, &volume, &ctx, &DetectionConfig::default()),
        Err(SpotError::Precondition { .. })
    ));
}

#[test]
fn test_median_filter_option_runs() {
    let stack = common::stack_from_frames(&[small_frame(false)], [1.0, 1.0, 1.0]);
    let config = PipelineConfig {
        detection: DetectionConfig {
            use_median_filter: true,
            scorers: ScorerKind::ALL.to_vec(),
            ..Default::default()
        },
        ..Default::default()
    };
    let outcomes = run_pipeline(&stack, &config).unwrap();
    let result = outcomes[0].result().unwrap();
    assert!(result
        .spots
        .iter()
        .all(|s| s.scores.len() == ScorerKind::ALL.len()));
}

#[test]
fn test_calibration_override() {
    // Stack claims 4 units per pixel; the override restores unit pixels so
    // the 20-unit blob maps to a factor of 2 rather than 1.
    let data = common::gaussian_blobs(&[64, 64], &[vec![30.0, 34.0]], 4.0, 100.0);
    let stack = common::stack_from_frames(&[data], [4.0, 4.0, 1.0]);
    let config = PipelineConfig {
        detection: DetectionConfig {
            diameter: 20.0,
            ..Default::default()
        },
        calibration: Some([1.0, 1.0, 1.0]),
        ..Default::default()
    };
    let outcomes = run_pipeline(&stack, &config).unwrap();
    let result = outcomes[0].result().unwrap();
    assert!(result
        .spots
        .iter()
        .any(|s| distance(&s.coordinates, &[30.0, 34.0]) <= 2.0));
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<String>>,
    max_done: AtomicUsize,
    finished: AtomicUsize,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.max_done.fetch_max(items_done, Ordering::SeqCst);
    }

    fn finish_stage(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_progress_reporter_sees_every_frame() {
    let frames: Vec<_> = (0..3).map(|_| small_frame(false)).collect();
    let stack = common::stack_from_frames(&frames, [1.0, 1.0, 1.0]);
    let reporter = Arc::new(RecordingReporter::default());

    run_pipeline_reported(&stack, &PipelineConfig::default(), reporter.clone()).unwrap();

    let stages = reporter.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Splitting.to_string(),
            PipelineStage::Detecting.to_string()
        ]
    );
    assert_eq!(reporter.max_done.load(Ordering::SeqCst), 3);
    assert_eq!(reporter.finished.load(Ordering::SeqCst), 2);
}
