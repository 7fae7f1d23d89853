//! The CIELAB cube grid: partitioning strategies, the dense cube arena,
//! and pixel accumulation.

use crate::{
    colorspace::Lab,
    progress::{Cancelled, Tracker},
};

/// How cube coordinates are derived from CIELAB values.
///
/// Both strategies are pure functions of the CIELAB image; cube allocation
/// order and the pixel-to-cube mapping contain no randomness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionStrategy {
    /// Cubes have one corner touching the CIELAB origin.
    ///
    /// The coordinate is each component floor-divided by the cube size,
    /// rounding toward negative infinity for negative components.
    Offset,
    /// Cubes are centred on integer multiples of the cube size; the cube
    /// containing the origin is centred on it.
    ///
    /// The coordinate is each component divided by the cube size and rounded,
    /// with halves rounding away from zero.
    #[default]
    Centred,
}

impl PartitionStrategy {
    /// Returns the cube coordinate for a CIELAB value.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn coordinate(self, lab: Lab, cube_size: f64) -> [i32; 3] {
        let place = |v: f64| {
            let scaled = v / cube_size;
            let cell = match self {
                Self::Offset => scaled.floor(),
                Self::Centred => scaled.round(),
            };
            cell as i32
        };
        [place(lab.l), place(lab.a), place(lab.b)]
    }
}

/// A fixed-size axis-aligned region of CIELAB space holding the pixels that
/// fall within it.
#[derive(Debug, Clone)]
pub(crate) struct Cube {
    /// The pixels assigned to this cube, in raster order.
    pub(crate) pixels: Vec<Lab>,
    /// The chroma of each assigned pixel, parallel to `pixels`.
    pub(crate) chromas: Vec<f64>,
    /// The mean colour of the assigned pixels; neutral while the cube is
    /// empty or unclassified.
    pub(crate) mean: Lab,
    /// Whether the cube passed the relevancy rules.
    pub(crate) relevant: bool,
    /// How many pixels of the recoloured image use this cube's mean colour.
    pub(crate) reassigned: u32,
}

impl Cube {
    /// Creates an empty, not-relevant cube.
    fn new() -> Self {
        Self {
            pixels: Vec::new(),
            chromas: Vec::new(),
            mean: Lab::new(0.0, 0.0, 0.0),
            relevant: false,
            reassigned: 0,
        }
    }

    /// Assigns a pixel and its chroma to this cube.
    pub(crate) fn push(&mut self, pixel: Lab, chroma: f64) {
        self.pixels.push(pixel);
        self.chromas.push(chroma);
    }

    /// The number of pixels assigned to this cube.
    pub(crate) fn len(&self) -> usize {
        self.pixels.len()
    }
}

/// A dense 3-D arena of [`Cube`]s covering the coordinate range observed in
/// one image.
///
/// Cubes are stored in lexicographic `(L*, a*, b*)` coordinate order and
/// looked up by integer coordinate offset by the per-axis minimum; there is
/// no hashing, so iteration order is deterministic.
#[derive(Debug)]
pub(crate) struct CubeGrid {
    /// The smallest cube coordinate per axis.
    min: [i32; 3],
    /// The number of cubes per axis.
    dims: [usize; 3],
    /// The cubes in lexicographic coordinate order.
    cubes: Vec<Cube>,
}

impl CubeGrid {
    /// Computes the cube coordinate of every pixel and allocates the dense
    /// grid covering them, reporting progress up to `target`.
    ///
    /// The grid always contains the cube at the origin: the L* minimum is
    /// pinned to zero and the a*/b* ranges are widened to include zero even
    /// when the image's values are uniformly positive or negative.
    pub(crate) fn build(
        lab: &[Lab],
        strategy: PartitionStrategy,
        cube_size: f64,
        tracker: &mut Tracker<'_, '_>,
        target: f64,
    ) -> Result<(Self, Vec<[i32; 3]>), Cancelled> {
        let assignments: Vec<[i32; 3]> = lab
            .iter()
            .map(|&pixel| strategy.coordinate(pixel, cube_size))
            .collect();

        let (min, dims) = coordinate_bounds(&assignments);

        let layer_len = dims[1] * dims[2];
        let step = tracker.step(target, dims[0]);
        let mut cubes = Vec::with_capacity(dims[0] * layer_len);
        for layer in 0..dims[0] {
            cubes.extend(std::iter::repeat_with(Cube::new).take(layer_len));
            if layer % 8 == 7 {
                tracker.advance(8.0 * step)?;
            }
        }
        tracker.set(target)?;

        log::debug!("{} CIELAB cubes generated", cubes.len());
        Ok((Self { min, dims, cubes }, assignments))
    }

    /// Assigns every pixel (in raster order) to its cube, reporting progress
    /// every few image rows up to `target`.
    pub(crate) fn accumulate(
        &mut self,
        lab: &[Lab],
        chromas: &[f64],
        assignments: &[[i32; 3]],
        width: usize,
        tracker: &mut Tracker<'_, '_>,
        target: f64,
    ) -> Result<(), Cancelled> {
        let rows = if width == 0 { 0 } else { lab.len() / width };
        let step = tracker.step(target, rows);

        for row in 0..rows {
            let start = row * width;
            for i in start..start + width {
                let index = self.index(assignments[i]);
                self.cubes[index].push(lab[i], chromas[i]);
            }
            if row % 8 == 7 {
                tracker.advance(8.0 * step)?;
            }
        }
        tracker.set(target)
    }

    /// Returns the arena index of a cube coordinate.
    #[allow(clippy::cast_sign_loss)]
    pub(crate) fn index(&self, coordinate: [i32; 3]) -> usize {
        let l = (coordinate[0] - self.min[0]) as usize;
        let a = (coordinate[1] - self.min[1]) as usize;
        let b = (coordinate[2] - self.min[2]) as usize;
        (l * self.dims[1] + a) * self.dims[2] + b
    }

    /// The cube at the given arena index.
    pub(crate) fn cube(&self, index: usize) -> &Cube {
        &self.cubes[index]
    }

    /// The cube at the given arena index, mutably.
    pub(crate) fn cube_mut(&mut self, index: usize) -> &mut Cube {
        &mut self.cubes[index]
    }

    /// The number of cubes in the grid.
    pub(crate) fn len(&self) -> usize {
        self.cubes.len()
    }

    /// The number of L* layers.
    pub(crate) fn layer_count(&self) -> usize {
        self.dims[0]
    }

    /// The number of cubes in one L* layer.
    pub(crate) fn layer_len(&self) -> usize {
        self.dims[1] * self.dims[2]
    }

    /// The cubes of one L* layer, in lexicographic order.
    pub(crate) fn layer(&self, layer: usize) -> &[Cube] {
        let len = self.layer_len();
        &self.cubes[layer * len..(layer + 1) * len]
    }

    /// The cubes of one L* layer, mutably.
    pub(crate) fn layer_mut(&mut self, layer: usize) -> &mut [Cube] {
        let len = self.layer_len();
        &mut self.cubes[layer * len..(layer + 1) * len]
    }
}

/// Returns the per-axis minimum coordinate and axis lengths needed to cover
/// `assignments` while always including the origin cube.
fn coordinate_bounds(assignments: &[[i32; 3]]) -> ([i32; 3], [usize; 3]) {
    let mut lo = [i32::MAX; 3];
    let mut hi = [i32::MIN; 3];
    for coordinate in assignments {
        for axis in 0..3 {
            lo[axis] = lo[axis].min(coordinate[axis]);
            hi[axis] = hi[axis].max(coordinate[axis]);
        }
    }

    // L* is never negative, so its lower bound is the origin layer;
    // the a*/b* ranges must straddle zero so the zero-chroma cube exists.
    let min = [0, lo[1].min(0), lo[2].min(0)];
    let max = [hi[0], hi[1].max(0), hi[2].max(0)];

    #[allow(clippy::cast_sign_loss)]
    let dims = [
        (max[0] - min[0] + 1) as usize,
        (max[1] - min[1] + 1) as usize,
        (max[2] - min[2] + 1) as usize,
    ];
    (min, dims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ProgressMonitor;

    #[test]
    fn offset_coordinates_floor_toward_negative_infinity() {
        let strategy = PartitionStrategy::Offset;
        assert_eq!(strategy.coordinate(Lab::new(39.9, -0.1, 20.0), 20.0), [1, -1, 1]);
        assert_eq!(strategy.coordinate(Lab::new(0.0, -20.0, -39.9), 20.0), [0, -1, -2]);
        assert_eq!(strategy.coordinate(Lab::new(19.9, 0.0, 0.0), 20.0), [0, 0, 0]);
    }

    #[test]
    fn centred_coordinates_round_half_away_from_zero() {
        let strategy = PartitionStrategy::Centred;
        assert_eq!(strategy.coordinate(Lab::new(30.0, -30.0, 9.9), 20.0), [2, -2, 0]);
        assert_eq!(strategy.coordinate(Lab::new(10.0, -10.0, 0.0), 20.0), [1, -1, 0]);
        assert_eq!(strategy.coordinate(Lab::new(9.9, -9.9, 29.9), 20.0), [0, 0, 1]);
    }

    #[test]
    fn grid_always_contains_the_origin_cube() {
        // uniformly positive a*/b*: the range must still reach back to zero
        let lab = vec![Lab::new(55.0, 45.0, 25.0)];
        let mut monitor = ProgressMonitor::silent();
        let mut tracker = Tracker::new(&mut monitor);
        let (grid, assignments) =
            CubeGrid::build(&lab, PartitionStrategy::Centred, 20.0, &mut tracker, 10.0).unwrap();

        assert_eq!(assignments, vec![[3, 2, 1]]);
        assert_eq!(grid.min, [0, 0, 0]);
        assert_eq!(grid.dims, [4, 3, 2]);
        assert_eq!(grid.len(), 24);
        assert_eq!(grid.index([0, 0, 0]), 0);
        assert_eq!(grid.index([3, 2, 1]), grid.len() - 1);
    }

    #[test]
    fn grid_straddles_negative_axes() {
        let lab = vec![Lab::new(10.0, -35.0, -15.0), Lab::new(70.0, 15.0, 5.0)];
        let mut monitor = ProgressMonitor::silent();
        let mut tracker = Tracker::new(&mut monitor);
        let (grid, assignments) =
            CubeGrid::build(&lab, PartitionStrategy::Offset, 20.0, &mut tracker, 10.0).unwrap();

        assert_eq!(assignments, vec![[0, -2, -1], [3, 0, 0]]);
        assert_eq!(grid.min, [0, -2, -1]);
        assert_eq!(grid.dims, [4, 3, 2]);

        // lexicographic order: the most negative coordinate comes first
        assert_eq!(grid.index([0, -2, -1]), 0);
        assert!(grid.index([0, -2, -1]) < grid.index([0, 0, 0]));
        assert!(grid.index([0, 0, 0]) < grid.index([3, 0, 0]));
    }

    #[test]
    fn accumulation_places_pixels_in_their_cubes() {
        let lab = vec![
            Lab::new(5.0, 0.0, 0.0),
            Lab::new(45.0, 0.0, 0.0),
            Lab::new(44.0, 1.0, -1.0),
            Lab::new(5.0, 0.5, 0.5),
        ];
        let chromas: Vec<f64> = lab.iter().map(|&p| (p.a * p.a + p.b * p.b).sqrt()).collect();

        let mut monitor = ProgressMonitor::silent();
        let mut tracker = Tracker::new(&mut monitor);
        let (mut grid, assignments) =
            CubeGrid::build(&lab, PartitionStrategy::Centred, 20.0, &mut tracker, 10.0).unwrap();
        grid.accumulate(&lab, &chromas, &assignments, 2, &mut tracker, 25.0)
            .unwrap();

        let origin = grid.cube(grid.index([0, 0, 0]));
        assert_eq!(origin.len(), 2);
        let bright = grid.cube(grid.index([2, 0, 0]));
        assert_eq!(bright.len(), 2);
        assert_eq!(bright.pixels[0].l, 45.0);
        assert_eq!(bright.chromas[1], 2f64.sqrt());

        let total: usize = (0..grid.len()).map(|i| grid.cube(i).len()).sum();
        assert_eq!(total, lab.len());
    }
}
