//! Voxel-grid SDF evaluation with a mesh quality check.
//!
//! Rasterizes the estimator over a regular grid spanning the canonical cube
//! `[-1, 1]^3` and reshapes the flat result into a volume. Grid generation
//! and reshape share one x-major ordering; the two must never diverge or the
//! volume is silently transposed.

use nalgebra::Point3;
use tracing::{debug, info};

use crate::error::{SdfError, SdfResult};
use crate::query::{DEFAULT_BATCH_SIZE, SurfaceSdf};
use crate::sign::SignStrategy;

/// Sentinel value for padded cells: far outside any unit-bounded surface.
const OUTSIDE_SENTINEL: f64 = 1.0;

/// Parameters for voxel-grid evaluation.
///
/// # Example
///
/// ```
/// use cloud_sdf::{SignStrategy, VoxelizeParams};
///
/// let params = VoxelizeParams::new(64)
///     .with_strategy(SignStrategy::normal_vote())
///     .with_pad(true)
///     .with_validation(true);
/// assert_eq!(params.resolution, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelizeParams {
    /// Samples per axis. Must be at least 2.
    pub resolution: usize,

    /// Sign strategy for every grid query.
    pub strategy: SignStrategy,

    /// Query points per evaluation batch.
    pub batch_size: usize,

    /// Whether to wrap the volume in one layer of outside-sentinel cells.
    pub pad: bool,

    /// Whether to run the mesh quality heuristic on the result.
    pub validate: bool,
}

impl VoxelizeParams {
    /// Creates parameters for the given per-axis resolution, with the
    /// default sign strategy, no padding, and no validation.
    #[must_use]
    pub const fn new(resolution: usize) -> Self {
        Self {
            resolution,
            strategy: SignStrategy::normal_vote(),
            batch_size: DEFAULT_BATCH_SIZE,
            pad: false,
            validate: false,
        }
    }

    /// Sets the sign strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: SignStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets whether to pad the volume with an outside-sentinel shell.
    #[must_use]
    pub const fn with_pad(mut self, pad: bool) -> Self {
        self.pad = pad;
        self
    }

    /// Sets whether to run the quality heuristic.
    #[must_use]
    pub const fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// A cubic volume of signed distances.
///
/// Values are stored x-major: the flat index of `(x, y, z)` is
/// `(x · R + y) · R + z` for resolution `R`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoxelVolume {
    resolution: usize,
    values: Vec<f64>,
}

impl VoxelVolume {
    fn new(resolution: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), resolution.pow(3));
        Self { resolution, values }
    }

    /// Samples per axis.
    #[must_use]
    pub const fn resolution(&self) -> usize {
        self.resolution
    }

    /// Flat values in x-major order, of length `resolution³`.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The signed distance at grid coordinate `(x, y, z)`.
    ///
    /// # Panics
    ///
    /// Panics when a coordinate is out of range, like slice indexing.
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f64 {
        assert!(x < self.resolution && y < self.resolution && z < self.resolution);
        self.values[(x * self.resolution + y) * self.resolution + z]
    }

    /// Smallest signed distance in the volume.
    #[must_use]
    pub fn min_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest signed distance in the volume.
    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Returns a copy wrapped in one layer of outside-sentinel cells
    /// (`+1.0`) on every face, growing the resolution by two.
    ///
    /// The closed boundary lets marching-cubes-style consumers extract a
    /// watertight iso-surface.
    #[must_use]
    pub fn padded(&self) -> Self {
        let r = self.resolution;
        let padded_r = r + 2;
        let mut values = vec![OUTSIDE_SENTINEL; padded_r.pow(3)];
        for x in 0..r {
            for y in 0..r {
                let src = (x * r + y) * r;
                let dst = ((x + 1) * padded_r + (y + 1)) * padded_r + 1;
                values[dst..dst + r].copy_from_slice(&self.values[src..src + r]);
            }
        }
        Self::new(padded_r, values)
    }
}

/// Generates the grid sample positions for the given per-axis resolution.
///
/// Positions span the canonical cube `[-1, 1]^3` with endpoints included,
/// flattened x-major so the result reshapes into a [`VoxelVolume`] without
/// reordering.
///
/// # Errors
///
/// Returns [`SdfError::InvalidParameter`] for a resolution below 2.
pub fn grid_points(resolution: usize) -> SdfResult<Vec<Point3<f64>>> {
    if resolution < 2 {
        return Err(SdfError::InvalidParameter {
            reason: format!("voxel resolution must be at least 2, got {resolution}"),
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let coordinate = |i: usize| -1.0 + 2.0 * i as f64 / (resolution - 1) as f64;

    let mut points = Vec::with_capacity(resolution.pow(3));
    for x in 0..resolution {
        for y in 0..resolution {
            for z in 0..resolution {
                points.push(Point3::new(coordinate(x), coordinate(y), coordinate(z)));
            }
        }
    }
    Ok(points)
}

/// Coarse plausibility heuristic for a voxelized SDF.
///
/// A usable volume of a surface bounded by the unit sphere must contain both
/// interior and exterior samples, and the cube corners (at radius √3) must
/// be exterior. Anything else points at a surface too degenerate for a
/// reliable sign, for example inverted normals or a cloud that never
/// encloses any volume.
fn check_volume(volume: &VoxelVolume) -> Result<(), String> {
    if !volume.values().iter().any(|v| *v < 0.0) {
        return Err("volume has no interior samples".to_string());
    }
    if !volume.values().iter().any(|v| *v > 0.0) {
        return Err("volume has no exterior samples".to_string());
    }

    let last = volume.resolution() - 1;
    for x in [0, last] {
        for y in [0, last] {
            for z in [0, last] {
                if volume.get(x, y, z) <= 0.0 {
                    return Err(format!(
                        "cube corner ({x}, {y}, {z}) classified as interior"
                    ));
                }
            }
        }
    }
    Ok(())
}

impl SurfaceSdf {
    /// Evaluates the SDF over a regular grid spanning `[-1, 1]^3`.
    ///
    /// Runs the batched query engine over all `resolution³` grid centers and
    /// reshapes the result. With `params.validate`, the volume must pass the
    /// mesh quality heuristic; with `params.pad`, the returned volume is
    /// wrapped in one outside-sentinel layer per face (validation sees the
    /// unpadded volume).
    ///
    /// # Errors
    ///
    /// Returns [`SdfError::BadMesh`] when validation rejects the volume (the
    /// volume is discarded — no partial result), plus any error the query
    /// engine reports for the strategy or parameters.
    pub fn voxelize(&self, params: &VoxelizeParams) -> SdfResult<VoxelVolume> {
        let points = grid_points(params.resolution)?;
        info!(
            resolution = params.resolution,
            queries = points.len(),
            "voxelizing signed distance field"
        );

        let values =
            self.signed_distances_batched(&points, &params.strategy, params.batch_size)?;
        let volume = VoxelVolume::new(params.resolution, values);

        if params.validate {
            check_volume(&volume).map_err(|reason| SdfError::BadMesh { reason })?;
            debug!("voxel volume passed the quality check");
        }

        if params.pad {
            return Ok(volume.padded());
        }
        Ok(volume)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloud_scan::PointCloud;
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    /// Deterministic spiral sampling of a sphere. Normals point outward,
    /// or inward when `invert` is set.
    fn sphere_sdf(count: usize, radius: f64, invert: bool) -> SurfaceSdf {
        let golden = PI * (3.0 - 5.0_f64.sqrt());
        let (points, normals): (Vec<_>, Vec<_>) = (0..count)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
                let ring = (1.0 - z * z).sqrt();
                let phi = i as f64 * golden;
                let dir = Vector3::new(ring * phi.cos(), ring * phi.sin(), z);
                let normal = if invert { -dir } else { dir };
                (Point3::from(dir * radius), normal)
            })
            .unzip();
        let cloud = PointCloud::from_points_and_normals(points, normals).unwrap();
        SurfaceSdf::new(cloud).unwrap()
    }

    #[test]
    fn grid_points_rejects_degenerate_resolutions() {
        assert!(matches!(
            grid_points(0),
            Err(SdfError::InvalidParameter { .. })
        ));
        assert!(matches!(
            grid_points(1),
            Err(SdfError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn grid_points_span_the_canonical_cube() {
        let points = grid_points(5).unwrap();
        assert_eq!(points.len(), 125);

        assert_relative_eq!(points[0].x, -1.0);
        assert_relative_eq!(points[0].y, -1.0);
        assert_relative_eq!(points[0].z, -1.0);

        let last = points.last().unwrap();
        assert_relative_eq!(last.x, 1.0);
        assert_relative_eq!(last.y, 1.0);
        assert_relative_eq!(last.z, 1.0);
    }

    #[test]
    fn grid_order_matches_volume_indexing() {
        // The flat grid order and VoxelVolume::get must agree, otherwise the
        // volume comes out transposed with no error signal.
        let r = 4;
        let points = grid_points(r).unwrap();
        let tagged: Vec<f64> = (0..points.len()).map(|i| i as f64).collect();
        let volume = VoxelVolume::new(r, tagged);

        for x in 0..r {
            for y in 0..r {
                for z in 0..r {
                    let flat = (x * r + y) * r + z;
                    assert_eq!(volume.get(x, y, z), flat as f64);
                    let p = points[flat];
                    assert_relative_eq!(p.x, -1.0 + 2.0 * x as f64 / (r - 1) as f64);
                    assert_relative_eq!(p.y, -1.0 + 2.0 * y as f64 / (r - 1) as f64);
                    assert_relative_eq!(p.z, -1.0 + 2.0 * z as f64 / (r - 1) as f64);
                }
            }
        }
    }

    #[test]
    fn voxelize_produces_the_requested_shape() {
        let sdf = sphere_sdf(2000, 0.5, false);
        let volume = sdf.voxelize(&VoxelizeParams::new(8)).unwrap();

        assert_eq!(volume.resolution(), 8);
        assert_eq!(volume.values().len(), 512);
        assert!(volume.min_value() < 0.0);
        assert!(volume.max_value() > 0.0);
    }

    #[test]
    fn voxelize_center_is_inside_corners_are_outside() {
        let sdf = sphere_sdf(2000, 0.5, false);
        // Odd resolution puts a sample exactly at the origin.
        let volume = sdf.voxelize(&VoxelizeParams::new(9)).unwrap();

        assert!(volume.get(4, 4, 4) < 0.0);
        assert!(volume.get(0, 0, 0) > 0.0);
        assert!(volume.get(8, 8, 8) > 0.0);
    }

    #[test]
    fn padded_volume_has_a_uniform_outside_shell() {
        let sdf = sphere_sdf(2000, 0.5, false);
        let params = VoxelizeParams::new(8).with_pad(true);
        let volume = sdf.voxelize(&params).unwrap();

        assert_eq!(volume.resolution(), 10);
        assert_eq!(volume.values().len(), 1000);

        for x in 0..10 {
            for y in 0..10 {
                for z in 0..10 {
                    let on_shell = [x, y, z].iter().any(|c| *c == 0 || *c == 9);
                    if on_shell {
                        assert_eq!(volume.get(x, y, z), 1.0);
                    }
                }
            }
        }
    }

    #[test]
    fn padding_preserves_interior_values() {
        let sdf = sphere_sdf(2000, 0.5, false);
        let plain = sdf.voxelize(&VoxelizeParams::new(8)).unwrap();
        let padded = sdf
            .voxelize(&VoxelizeParams::new(8).with_pad(true))
            .unwrap();

        for x in 0..8 {
            for y in 0..8 {
                for z in 0..8 {
                    assert_eq!(plain.get(x, y, z), padded.get(x + 1, y + 1, z + 1));
                }
            }
        }
    }

    #[test]
    fn validation_accepts_a_plausible_sphere() {
        let sdf = sphere_sdf(2000, 0.5, false);
        let params = VoxelizeParams::new(9).with_validation(true);
        assert!(sdf.voxelize(&params).is_ok());
    }

    #[test]
    fn validation_rejects_inverted_normals() {
        // Inward normals invert the classification, so the cube corners
        // read as interior and the heuristic fires.
        let sdf = sphere_sdf(2000, 0.5, true);
        let params = VoxelizeParams::new(9).with_validation(true);
        assert!(matches!(
            sdf.voxelize(&params),
            Err(SdfError::BadMesh { .. })
        ));
    }

    #[test]
    fn params_builder_roundtrip() {
        let params = VoxelizeParams::new(32)
            .with_strategy(SignStrategy::visibility())
            .with_batch_size(4096)
            .with_pad(true)
            .with_validation(true);
        assert_eq!(params.resolution, 32);
        assert_eq!(params.strategy, SignStrategy::visibility());
        assert_eq!(params.batch_size, 4096);
        assert!(params.pad);
        assert!(params.validate);
    }
}
