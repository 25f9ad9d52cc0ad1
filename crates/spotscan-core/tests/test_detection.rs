#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::{ArrayD, IxDyn};

use spotscan_core::detection::threshold::{score_histogram, score_range};
use spotscan_core::detection::{
    compute_threshold, find_regional_maxima, otsu_threshold, passes_threshold, rescale_to_original,
    retain_above, Spot, ThresholdMode,
};
use spotscan_core::error::SpotError;

fn scored(value: f64) -> Spot {
    let mut spot = Spot::new(vec![0.0, 0.0]);
    spot.aggregated_score = Some(value);
    spot
}

// ---------------------------------------------------------------------------
// Regional maxima
// ---------------------------------------------------------------------------

#[test]
fn test_single_interior_peak() {
    let vol = common::unit_volume(common::impulse(&[7, 7], &[3, 2], 4.0));
    let spots = find_regional_maxima(&vol, false).unwrap();
    assert_eq!(spots.len(), 1);
    assert_eq!(spots[0].coordinates, vec![3.0, 2.0]);
    assert!(spots[0].scores.is_empty());
    assert_eq!(spots[0].aggregated_score, None);
}

#[test]
fn test_plateau_yields_centroid() {
    let mut data = ArrayD::<f32>::zeros(IxDyn(&[9, 9]));
    for x in 3..5 {
        for y in 3..5 {
            data[[x, y]] = 5.0;
        }
    }
    let spots = find_regional_maxima(&common::unit_volume(data), false).unwrap();
    assert_eq!(spots.len(), 1);
    assert_eq!(spots[0].coordinates, vec![3.5, 3.5]);
}

#[test]
fn test_plateau_with_higher_neighbour_is_not_a_maximum() {
    let mut data = ArrayD::<f32>::zeros(IxDyn(&[9, 9]));
    for x in 2..6 {
        data[[x, 4]] = 5.0;
    }
    data[[6, 5]] = 6.0;
    let spots = find_regional_maxima(&common::unit_volume(data), false).unwrap();
    assert_eq!(spots.len(), 1);
    assert_eq!(spots[0].coordinates, vec![6.0, 5.0]);
}

#[test]
fn test_edge_maximum_policy() {
    let vol = common::unit_volume(common::impulse(&[8, 8], &[0, 4], 3.0));
    assert!(find_regional_maxima(&vol, false).unwrap().is_empty());

    let spots = find_regional_maxima(&vol, true).unwrap();
    assert_eq!(spots.len(), 1);
    assert_eq!(spots[0].coordinates, vec![0.0, 4.0]);
}

#[test]
fn test_constant_volume_is_one_edge_region() {
    let data = ArrayD::from_elem(IxDyn(&[5, 7, 3]), 1.0f32);
    let vol = common::unit_volume(data);
    assert!(find_regional_maxima(&vol, false).unwrap().is_empty());

    let spots = find_regional_maxima(&vol, true).unwrap();
    assert_eq!(spots.len(), 1);
    assert_eq!(spots[0].coordinates, vec![2.0, 3.0, 1.0]);
}

#[test]
fn test_two_peaks_in_3d() {
    let mut data = common::impulse(&[10, 10, 6], &[2, 3, 2], 8.0);
    data[[7, 6, 3]] = 5.0;
    let spots = find_regional_maxima(&common::unit_volume(data), false).unwrap();
    let mut coords: Vec<Vec<f64>> = spots.into_iter().map(|s| s.coordinates).collect();
    coords.sort_by(|a, b| a[0].total_cmp(&b[0]));
    assert_eq!(coords, vec![vec![2.0, 3.0, 2.0], vec![7.0, 6.0, 3.0]]);
}

#[test]
fn test_diagonal_neighbour_dominates() {
    // Full connectivity: a larger diagonal neighbour suppresses the peak.
    let mut data = common::impulse(&[7, 7], &[3, 3], 4.0);
    data[[4, 4]] = 6.0;
    let spots = find_regional_maxima(&common::unit_volume(data), false).unwrap();
    assert_eq!(spots.len(), 1);
    assert_eq!(spots[0].coordinates, vec![4.0, 4.0]);
}

#[test]
fn test_non_finite_sample_is_rejected() {
    let mut data = ArrayD::<f32>::zeros(IxDyn(&[5, 5]));
    data[[1, 1]] = f32::NAN;
    let result = find_regional_maxima(&common::unit_volume(data), false);
    assert!(matches!(result, Err(SpotError::Precondition { .. })));
}

// ---------------------------------------------------------------------------
// Rescaling
// ---------------------------------------------------------------------------

#[test]
fn test_rescale_multiplies_per_axis() {
    let mut spots = vec![Spot::new(vec![1.0, 2.5, 3.0]), Spot::new(vec![0.0, 4.0, 1.0])];
    rescale_to_original(&mut spots, &[2.0, 2.0, 1.0]).unwrap();
    assert_eq!(spots[0].coordinates, vec![2.0, 5.0, 3.0]);
    assert_eq!(spots[1].coordinates, vec![0.0, 8.0, 1.0]);
}

#[test]
fn test_rescale_length_mismatch_leaves_spots_untouched() {
    let mut spots = vec![Spot::new(vec![1.0, 1.0, 1.0]), Spot::new(vec![1.0, 1.0])];
    let result = rescale_to_original(&mut spots, &[2.0, 2.0, 2.0]);
    assert!(matches!(result, Err(SpotError::Precondition { .. })));
    assert_eq!(spots[0].coordinates, vec![1.0, 1.0, 1.0]);
}

#[test]
fn test_spot_physical_distance() {
    let a = Spot::new(vec![0.0, 0.0, 0.0]);
    let b = Spot::new(vec![3.0, 4.0, 1.0]);
    assert_abs_diff_eq!(a.physical_distance(&b, &[1.0, 1.0, 0.0]), 5.0, epsilon = 1e-12);
    assert_eq!(b.physical_position(&[2.0, 0.5, 3.0]), vec![6.0, 2.0, 3.0]);
}

// ---------------------------------------------------------------------------
// Histogram and Otsu
// ---------------------------------------------------------------------------

#[test]
fn test_histogram_bin_count_and_total() {
    let scores: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let histogram = score_histogram(&scores);
    assert_eq!(histogram.len(), 4);
    assert_eq!(histogram.iter().sum::<usize>(), 10);
    assert!(*histogram.last().unwrap() >= 1);
}

#[test]
fn test_histogram_degenerate_inputs() {
    assert!(score_histogram(&[]).is_empty());
    assert_eq!(score_histogram(&[2.0, 2.0, 2.0]), vec![3]);
    assert_eq!(score_range(&[f64::NAN, 1.0, -3.0]), Some((-3.0, 1.0)));
}

#[test]
fn test_otsu_empty_is_none() {
    assert_eq!(otsu_threshold(&[]), None);
}

#[test]
fn test_otsu_single_score() {
    let t = otsu_threshold(&[4.5]).unwrap();
    assert!(t < 4.5);
    assert_abs_diff_eq!(t, 4.5, epsilon = 1e-9);
    assert!(passes_threshold(Some(4.5), Some(t)));
}

#[test]
fn test_otsu_zero_range() {
    let t = otsu_threshold(&[2.0, 2.0, 2.0, 2.0]).unwrap();
    assert!(t < 2.0);
    assert_abs_diff_eq!(t, 2.0, epsilon = 1e-9);

    let t_neg = otsu_threshold(&[-3.0, -3.0]).unwrap();
    assert!(t_neg < -3.0);
    assert_abs_diff_eq!(t_neg, -3.0, epsilon = 1e-9);
}

#[test]
fn test_tied_frame_keeps_every_spot() {
    let spots: Vec<Spot> = (0..5).map(|_| scored(7.25)).collect();
    let t = compute_threshold(&spots, &ThresholdMode::Otsu).unwrap();
    assert_eq!(retain_above(spots, t).len(), 5);
}

#[test]
fn test_passes_threshold_is_strict() {
    assert!(passes_threshold(Some(3.0), Some(2.0)));
    assert!(!passes_threshold(Some(2.0), Some(2.0)));
    assert!(!passes_threshold(Some(1.0), Some(2.0)));
    assert!(!passes_threshold(None, Some(2.0)));
    assert!(!passes_threshold(Some(3.0), None));
}

#[test]
fn test_otsu_separates_two_clusters() {
    let scores = [1.0, 1.2, 0.8, 1.1, 0.9, 1.0, 10.0, 10.5, 9.8];
    let t = otsu_threshold(&scores).unwrap();
    assert!(t > 1.2 && t < 9.8, "threshold {t} does not split the clusters");
}

#[test]
fn test_otsu_stays_within_range() {
    let mut rng = common::XorShift::new(7);
    let scores: Vec<f64> = (0..200).map(|_| 50.0 + 30.0 * rng.next_f32() as f64).collect();
    let (min, max) = score_range(&scores).unwrap();
    let t = otsu_threshold(&scores).unwrap();
    assert!(t >= min && t <= max);
}

#[test]
fn test_otsu_first_maximum_wins_ties() {
    // Bins [0,3) [3,6) [6,9]: the empty middle bin ties with the first.
    let scores = [0.0, 0.0, 0.0, 0.0, 9.0, 9.0, 9.0, 9.0, 9.0];
    assert_eq!(otsu_threshold(&scores), Some(3.0));
}

#[test]
fn test_compute_threshold_modes() {
    let mut spots: Vec<Spot> = [1.0, 1.0, 1.0, 8.0, 8.0].into_iter().map(scored).collect();
    spots.push(Spot::new(vec![0.0, 0.0]));

    assert_eq!(compute_threshold(&spots, &ThresholdMode::Fixed(2.5)), Some(2.5));
    let t = compute_threshold(&spots, &ThresholdMode::Otsu).unwrap();
    assert!(t > 1.0 && t < 8.0);
    assert_eq!(compute_threshold(&[], &ThresholdMode::Otsu), None);
}

#[test]
fn test_retain_above_is_strict() {
    let spots: Vec<Spot> = [1.0, 2.0, 3.0].into_iter().map(scored).collect();
    let kept = retain_above(spots, 2.0);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].aggregated_score, Some(3.0));
}

#[test]
fn test_threshold_mode_display() {
    assert_eq!(format!("{}", ThresholdMode::Otsu), "Otsu");
    assert_eq!(format!("{}", ThresholdMode::Fixed(1.5)), "Fixed (1.5)");
}
