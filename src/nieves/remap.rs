//! Pixel reassignment to relevant cube colours.

use super::grid::CubeGrid;
use crate::{
    colorspace::Lab,
    progress::{Cancelled, Tracker},
};
use ordered_float::OrderedFloat;

/// Rewrites every pixel to the mean colour of its own cube when that cube is
/// relevant, or to the mean colour of the nearest relevant cube otherwise,
/// tallying how many pixels end up with each relevant cube's colour.
///
/// Progress is reported every few image rows up to `target`.
pub(crate) fn reassign(
    lab: &mut [Lab],
    grid: &mut CubeGrid,
    assignments: &[[i32; 3]],
    relevant: &[usize],
    width: usize,
    tracker: &mut Tracker<'_, '_>,
    target: f64,
) -> Result<(), Cancelled> {
    let means: Vec<Lab> = relevant.iter().map(|&index| grid.cube(index).mean).collect();

    // arena-sized lookup from cube index to its slot in the relevant list
    let mut slots: Vec<Option<u32>> = vec![None; grid.len()];
    for (slot, &index) in relevant.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let slot = slot as u32;
        slots[index] = Some(slot);
    }

    let rows = if width == 0 { 0 } else { lab.len() / width };
    let step = tracker.step(target, rows);

    for row in 0..rows {
        let start = row * width;
        for i in start..start + width {
            let cube_index = grid.index(assignments[i]);
            let slot = match slots[cube_index] {
                Some(slot) => slot as usize,
                None => nearest(&means, lab[i]),
            };
            lab[i] = means[slot];
            grid.cube_mut(relevant[slot]).reassigned += 1;
        }
        if row % 8 == 7 {
            tracker.advance(8.0 * step)?;
        }
    }
    tracker.set(target)
}

/// Returns the slot of the mean colour closest to `pixel` in Euclidean
/// CIELAB distance; on exact ties the first slot in list order wins.
fn nearest(means: &[Lab], pixel: Lab) -> usize {
    means
        .iter()
        .enumerate()
        .min_by_key(|&(_, &mean)| OrderedFloat(distance_squared(pixel, mean)))
        .map(|(slot, _)| slot)
        // the relevant list is checked to be non-empty before reassignment
        .unwrap_or_default()
}

/// The squared Euclidean distance between two CIELAB colours.
fn distance_squared(a: Lab, b: Lab) -> f64 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    dl * dl + da * da + db * db
}

/// Returns the fraction of the image's pixels recoloured with each relevant
/// cube's mean colour, in `relevant` list order.
pub(crate) fn relative_frequencies(
    grid: &CubeGrid,
    relevant: &[usize],
    total_pixels: u32,
) -> Vec<f64> {
    relevant
        .iter()
        .map(|&index| f64::from(grid.cube(index).reassigned) / f64::from(total_pixels))
        .collect()
}
