use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use spotscan_core::detection::{passes_threshold, ThresholdMode};
use spotscan_core::io::save_projection_png;
use spotscan_core::pipeline::{
    run_pipeline_reported, DetectionConfig, FailurePolicy, FrameOutcome, FrameStatus,
    PipelineConfig, PipelineStage, ProgressReporter,
};
use spotscan_core::quality::ScorerKind;

use crate::summary::{print_detection_summary, print_frame_table};

use super::input::InputArgs;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum ScorerArg {
    Log,
    Variance,
    Brightness,
    Contrast,
    Overlap,
}

impl From<ScorerArg> for ScorerKind {
    fn from(arg: ScorerArg) -> Self {
        match arg {
            ScorerArg::Log => ScorerKind::Log,
            ScorerArg::Variance => ScorerKind::Variance,
            ScorerArg::Brightness => ScorerKind::Brightness,
            ScorerArg::Contrast => ScorerKind::Contrast,
            ScorerArg::Overlap => ScorerKind::Overlap,
        }
    }
}

#[derive(Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Detection config file (TOML); replaces the detection flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Expected blob diameter in physical units
    #[arg(long, default_value = "7.3")]
    pub diameter: f64,

    /// Median-filter the downsampled volume before blob filtering
    #[arg(long)]
    pub median: bool,

    /// Keep maxima that touch the volume boundary
    #[arg(long)]
    pub allow_edge: bool,

    /// Comma-separated scorers to average
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [ScorerArg::Log, ScorerArg::Variance])]
    pub scorers: Vec<ScorerArg>,

    /// Fixed score threshold instead of Otsu
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Abort on the first failing frame
    #[arg(long)]
    pub fail_fast: bool,

    /// Include rejected candidates in the report
    #[arg(long)]
    pub all: bool,

    /// Directory for per-frame projection PNGs with selected spots marked
    #[arg(long)]
    pub projections: Option<PathBuf>,

    /// Output report path (TOML)
    #[arg(short, long, default_value = "spots.toml")]
    pub output: PathBuf,
}

/// Drives an indicatif bar from pipeline progress.
struct BarReporter {
    bar: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.bar.set_length(total_items.unwrap_or(0) as u64);
        self.bar.set_position(0);
        self.bar.set_message(stage.to_string());
    }

    // Frames finish in any order; each call is one more completed item.
    fn advance(&self, _items_done: usize) {
        self.bar.inc(1);
    }

    fn finish_stage(&self) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
    }
}

#[derive(Serialize)]
struct Report {
    config: PipelineConfig,
    frames: Vec<FrameReport>,
}

#[derive(Serialize)]
struct FrameReport {
    frame: usize,
    status: &'static str,
    error: Option<String>,
    threshold: Option<f64>,
    candidates: usize,
    spots: Vec<SpotRecord>,
}

#[derive(Serialize)]
struct SpotRecord {
    coordinates: Vec<f64>,
    score: Option<f64>,
    selected: bool,
    scores: BTreeMap<String, f64>,
}

pub fn run(args: &DetectArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid detection config")?
    } else {
        build_config_from_args(args)?
    };

    let stack = args.input.load()?;
    print_detection_summary(&config, &stack, &args.output);

    let bar = ProgressBar::new(stack.num_frames as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let reporter = Arc::new(BarReporter { bar: bar.clone() });
    let outcomes = run_pipeline_reported(&stack, &config, reporter)?;
    bar.finish_with_message("Done");

    print_frame_table(&outcomes);

    if let Some(ref dir) = args.projections {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for outcome in &outcomes {
            let Some(result) = outcome.result() else {
                continue;
            };
            let path = dir.join(format!("frame_{:04}.png", outcome.frame_index));
            let volume = stack.frame(outcome.frame_index)?;
            save_projection_png(&volume, &result.selected(), &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        println!("Projections saved to {}", dir.display());
    }

    let report = Report {
        frames: outcomes.iter().map(|o| frame_report(o, args.all)).collect(),
        config,
    };
    let toml_str = toml::to_string_pretty(&report)?;
    std::fs::write(&args.output, toml_str)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;
    println!("\nReport saved to {}", args.output.display());

    Ok(())
}

fn build_config_from_args(args: &DetectArgs) -> Result<PipelineConfig> {
    let mut scorers = args.scorers.clone();
    scorers.sort();
    scorers.dedup();

    Ok(PipelineConfig {
        detection: DetectionConfig {
            diameter: args.diameter,
            use_median_filter: args.median,
            allow_edge_maxima: args.allow_edge,
            scorers: scorers.into_iter().map(ScorerKind::from).collect(),
            threshold: args
                .threshold
                .map_or(ThresholdMode::Otsu, ThresholdMode::Fixed),
        },
        calibration: Some(args.input.calibration()?),
        failure_policy: if args.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Continue
        },
    })
}

fn frame_report(outcome: &FrameOutcome, include_rejected: bool) -> FrameReport {
    match &outcome.status {
        FrameStatus::Detected(result) => {
            let threshold = result.threshold;
            let spots = result
                .spots
                .iter()
                .map(|spot| {
                    let selected = passes_threshold(spot.aggregated_score, threshold);
                    SpotRecord {
                        coordinates: spot.coordinates.clone(),
                        score: spot.aggregated_score,
                        selected,
                        scores: spot
                            .scores
                            .iter()
                            .map(|(kind, v)| (kind.to_string(), *v))
                            .collect(),
                    }
                })
                .filter(|record| include_rejected || record.selected)
                .collect();
            FrameReport {
                frame: outcome.frame_index,
                status: "detected",
                error: None,
                threshold,
                candidates: result.spots.len(),
                spots,
            }
        }
        FrameStatus::Failed(message) => FrameReport {
            frame: outcome.frame_index,
            status: "failed",
            error: Some(message.clone()),
            threshold: None,
            candidates: 0,
            spots: Vec::new(),
        },
    }
}
