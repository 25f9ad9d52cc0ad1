pub mod extrema;
pub mod rescale;
pub mod spot;
pub mod threshold;

pub use extrema::find_regional_maxima;
pub use rescale::rescale_to_original;
pub use spot::Spot;
pub use threshold::{
    compute_threshold, otsu_threshold, passes_threshold, retain_above, ThresholdMode,
};
