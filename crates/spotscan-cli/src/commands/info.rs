use anyhow::Result;
use clap::Args;

use super::input::InputArgs;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let stack = args.input.load()?;

    if args.input.is_raw() {
        println!("File:        {}", args.input.files[0].display());
    } else {
        println!("Images:      {}", args.input.files.len());
    }
    println!("Frames:      {}", stack.num_frames);
    println!("Dimensions:  {}x{}", stack.width, stack.height);
    println!("Slices:      {}", stack.num_slices);
    println!("Frame kind:  {}D", stack.frame_ndim());
    println!(
        "Calibration: {} x {} x {}",
        stack.calibration[0], stack.calibration[1], stack.calibration[2]
    );

    let (lo, hi) = (0..stack.slice_count())
        .map(|i| stack.slice(i))
        .try_fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), slice| {
            let slice = slice?;
            Ok::<_, anyhow::Error>(slice.iter().fold((lo, hi), |(lo, hi), &v| (lo.min(v), hi.max(v))))
        })?;
    println!("Intensity:   {} .. {}", lo, hi);

    let total_mb = (stack.slice_len() * stack.slice_count() * std::mem::size_of::<f32>()) as f64
        / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}
