use std::path::Path;

use console::Style;
use spotscan_core::frame::Stack;
use spotscan_core::pipeline::{FrameOutcome, FrameStatus, PipelineConfig};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            error: Style::new().red(),
        }
    }
}

fn on_off(s: &Styles, enabled: bool) -> String {
    if enabled {
        s.method.apply_to("on").to_string()
    } else {
        s.disabled.apply_to("off").to_string()
    }
}

pub fn print_detection_summary(config: &PipelineConfig, stack: &Stack, output: &Path) {
    let s = Styles::new();
    let detection = &config.detection;
    let calibration = config.calibration.unwrap_or(stack.calibration);

    println!();
    println!("  {}", s.title.apply_to("Spot Detection"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(14)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Stack"),
        s.value.apply_to(format!(
            "{}x{}x{}, {} frame(s)",
            stack.width, stack.height, stack.num_slices, stack.num_frames
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Calibration"),
        s.value.apply_to(format!(
            "{} x {} x {}",
            calibration[0], calibration[1], calibration[2]
        ))
    );
    println!();

    println!("  {}", s.header.apply_to("Detection"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Diameter"),
        s.value.apply_to(detection.diameter)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Median"),
        on_off(&s, detection.use_median_filter)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Edge maxima"),
        on_off(&s, detection.allow_edge_maxima)
    );
    let scorers: Vec<String> = detection.scorers.iter().map(|k| k.to_string()).collect();
    println!(
        "    {:<12}{}",
        s.label.apply_to("Scorers"),
        s.method.apply_to(scorers.join(", "))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Threshold"),
        s.method.apply_to(&detection.threshold)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("On failure"),
        s.method.apply_to(config.failure_policy)
    );
    println!();
}

pub fn print_frame_table(outcomes: &[FrameOutcome]) {
    let s = Styles::new();

    println!();
    println!(
        "{:>6}  {:>10}  {:>8}  {:>12}",
        "Frame", "Candidates", "Spots", "Threshold"
    );
    println!("{}", "-".repeat(42));

    let mut total_selected = 0;
    for outcome in outcomes {
        match &outcome.status {
            FrameStatus::Detected(result) => {
                let selected = result.selected().len();
                total_selected += selected;
                let threshold = result
                    .threshold
                    .map_or_else(|| "-".to_string(), |t| format!("{t:.4}"));
                println!(
                    "{:>6}  {:>10}  {:>8}  {:>12}",
                    outcome.frame_index,
                    result.spots.len(),
                    selected,
                    threshold
                );
            }
            FrameStatus::Failed(message) => {
                println!(
                    "{:>6}  {}",
                    outcome.frame_index,
                    s.error.apply_to(format!("failed: {message}"))
                );
            }
        }
    }

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    println!(
        "\n{} spot(s) across {} frame(s), {} failed",
        s.value.apply_to(total_selected),
        outcomes.len(),
        failed
    );
}
