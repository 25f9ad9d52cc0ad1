use tracing::debug;

use crate::error::{Result, SpotError};
use crate::volume::Volume;

use super::spot::Spot;

/// Find the regional maxima of `volume` and return one spot per region,
/// placed at the region's centroid.
///
/// A regional maximum is a maximal plateau of equal samples, connected
/// through all `3^N - 1` neighbours, with no neighbour strictly greater.
/// Regions touching the volume border are dropped unless
/// `allow_edge_maxima` is set.
pub fn find_regional_maxima(volume: &Volume, allow_edge_maxima: bool) -> Result<Vec<Spot>> {
    let samples = volume.samples();
    if samples.len() != volume.len() {
        return Err(SpotError::Precondition {
            stage: "extrema",
            reason: "volume samples are not contiguous".into(),
        });
    }
    if let Some(bad) = samples.iter().find(|v| !v.is_finite()) {
        return Err(SpotError::Precondition {
            stage: "extrema",
            reason: format!("volume contains non-finite sample {bad}"),
        });
    }

    let grid = volume.grid();
    let ndim = grid.ndim();
    let offsets = grid.neighbor_offsets();

    let mut visited = vec![false; grid.len()];
    let mut coord = vec![0usize; ndim];
    let mut member = vec![0usize; ndim];
    let mut stack: Vec<usize> = Vec::new();
    let mut spots = Vec::new();

    for start in 0..grid.len() {
        if visited[start] {
            continue;
        }
        let value = samples[start];

        // Cheap rejection; plateau neighbours will still reach this voxel
        // through their own flood since it stays unvisited.
        grid.coord_of(start, &mut coord);
        let dominated = offsets.iter().any(|delta| {
            grid.offset(&coord, delta)
                .is_some_and(|n| samples[n] > value)
        });
        if dominated {
            continue;
        }

        let mut is_maximum = true;
        let mut touches_edge = false;
        let mut sums = vec![0.0f64; ndim];
        let mut count = 0usize;

        visited[start] = true;
        stack.push(start);
        while let Some(index) = stack.pop() {
            grid.coord_of(index, &mut member);
            touches_edge |= grid.on_boundary(&member);
            for (sum, &c) in sums.iter_mut().zip(&member) {
                *sum += c as f64;
            }
            count += 1;

            for delta in &offsets {
                let Some(n) = grid.offset(&member, delta) else {
                    continue;
                };
                let neighbour = samples[n];
                if neighbour > value {
                    is_maximum = false;
                } else if neighbour == value && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        if is_maximum && (allow_edge_maxima || !touches_edge) {
            let centroid = sums.iter().map(|s| s / count as f64).collect();
            spots.push(Spot::new(centroid));
        }
    }

    debug!(
        maxima = spots.len(),
        allow_edge_maxima, "Regional maxima found"
    );
    Ok(spots)
}
