//! Batched SDF query engine.
//!
//! [`SurfaceSdf`] owns a point cloud and a [`SpatialIndex`] built once over
//! it, and answers signed-distance queries under either sign strategy.
//! Large query sets are split into fixed-size batches that are evaluated
//! independently (each batch only reads the shared index), so peak memory
//! stays bounded and batches parallelize freely.

use cloud_scan::{PointCloud, Scan};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::error::{SdfError, SdfResult};
use crate::index::SpatialIndex;
use crate::sign::{SignStrategy, normal_vote_is_inside, visibility_is_outside};

/// Default number of query points per batch.
///
/// Bounds the k-NN working buffers and the per-neighbor direction and dot
/// product intermediates, which scale with `batch × k`.
pub const DEFAULT_BATCH_SIZE: usize = 1_000_000;

/// Signed distance estimator for a surface point cloud.
///
/// Distances are negative inside the surface and positive outside.
///
/// # Example
///
/// ```
/// use cloud_scan::PointCloud;
/// use cloud_sdf::{SignStrategy, SurfaceSdf};
/// use nalgebra::{Point3, Vector3};
///
/// // Two parallel plates with outward normals.
/// let cloud = PointCloud::from_points_and_normals(
///     vec![Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, -1.0)],
///     vec![Vector3::z(), -Vector3::z()],
/// ).unwrap();
/// let sdf = SurfaceSdf::new(cloud).unwrap();
///
/// // Between the plates, behind both tangent planes: inside.
/// let d = sdf.signed_distance(&Point3::origin(), &SignStrategy::normal_vote()).unwrap();
/// assert!((d - (-1.0)).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct SurfaceSdf {
    cloud: PointCloud,
    index: SpatialIndex,
}

/// A sign strategy resolved against a concrete cloud, with its
/// prerequisites checked once so per-point evaluation is infallible.
enum Resolved<'a> {
    NormalVote {
        neighbors: usize,
        normals: &'a [Vector3<f64>],
    },
    Visibility {
        scans: &'a [Scan],
    },
}

impl SurfaceSdf {
    /// Builds the estimator, constructing the spatial index once.
    ///
    /// # Errors
    ///
    /// Returns [`SdfError::EmptyPointCloud`] for an empty cloud.
    pub fn new(cloud: PointCloud) -> SdfResult<Self> {
        let index = SpatialIndex::build(cloud.points())?;
        Ok(Self { cloud, index })
    }

    /// The underlying point cloud.
    #[must_use]
    pub const fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    /// The nearest-neighbor index.
    #[must_use]
    pub const fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Signed distance at a single query point.
    ///
    /// # Errors
    ///
    /// Returns [`SdfError::MissingNormals`] / [`SdfError::MissingScans`] when
    /// the strategy's prerequisite data is absent, and
    /// [`SdfError::InvalidParameter`] for a zero neighbor count.
    pub fn signed_distance(
        &self,
        point: &Point3<f64>,
        strategy: &SignStrategy,
    ) -> SdfResult<f64> {
        let resolved = self.resolve(strategy)?;
        Ok(self.eval_point(point, &resolved))
    }

    /// Signed distances for a batch of query points, index-aligned with the
    /// input.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::signed_distance`].
    pub fn signed_distances(
        &self,
        points: &[Point3<f64>],
        strategy: &SignStrategy,
    ) -> SdfResult<Vec<f64>> {
        let resolved = self.resolve(strategy)?;
        Ok(self.eval_chunk(points, &resolved))
    }

    /// Signed distances for a large query set, evaluated in independent
    /// fixed-size batches.
    ///
    /// Batches are distributed across worker threads and their outputs are
    /// reassembled in input order, so the result is element-wise identical
    /// to [`Self::signed_distances`] for any batch size.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::signed_distance`], plus
    /// [`SdfError::InvalidParameter`] for a zero batch size.
    pub fn signed_distances_batched(
        &self,
        points: &[Point3<f64>],
        strategy: &SignStrategy,
        batch_size: usize,
    ) -> SdfResult<Vec<f64>> {
        if batch_size == 0 {
            return Err(SdfError::InvalidParameter {
                reason: "batch size must be at least 1".to_string(),
            });
        }
        let resolved = self.resolve(strategy)?;

        if points.len() <= batch_size {
            return Ok(self.eval_chunk(points, &resolved));
        }

        // Buffer per-batch outputs, then concatenate in input order.
        let batches: Vec<Vec<f64>> = points
            .par_chunks(batch_size)
            .map(|chunk| self.eval_chunk(chunk, &resolved))
            .collect();
        Ok(batches.into_iter().flatten().collect())
    }

    /// Checks a strategy's prerequisites against this cloud.
    fn resolve(&self, strategy: &SignStrategy) -> SdfResult<Resolved<'_>> {
        match strategy {
            SignStrategy::NormalVote { neighbors } => {
                if *neighbors == 0 {
                    return Err(SdfError::InvalidParameter {
                        reason: "neighbor count must be at least 1".to_string(),
                    });
                }
                let normals = self.cloud.normals().ok_or(SdfError::MissingNormals)?;
                Ok(Resolved::NormalVote {
                    neighbors: *neighbors,
                    normals,
                })
            }
            SignStrategy::Visibility => {
                if !self.cloud.has_scans() {
                    return Err(SdfError::MissingScans);
                }
                Ok(Resolved::Visibility {
                    scans: self.cloud.scans(),
                })
            }
        }
    }

    fn eval_chunk(&self, points: &[Point3<f64>], resolved: &Resolved<'_>) -> Vec<f64> {
        points.iter().map(|p| self.eval_point(p, resolved)).collect()
    }

    fn eval_point(&self, point: &Point3<f64>, resolved: &Resolved<'_>) -> f64 {
        match resolved {
            Resolved::NormalVote { neighbors, normals } => {
                let found = self.index.nearest_n(point, *neighbors);
                // The magnitude is always the rank-0 distance; only the sign
                // comes from the wider neighborhood.
                let magnitude = found[0].distance;
                let inside =
                    normal_vote_is_inside(point, &found, self.cloud.points(), normals);
                if inside { -magnitude } else { magnitude }
            }
            Resolved::Visibility { scans } => {
                let magnitude = self.index.nearest(point).distance;
                if visibility_is_outside(point, scans) {
                    magnitude
                } else {
                    -magnitude
                }
            }
        }
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
    use cloud_scan::{CameraPose, VisibilityOracle};
    use std::f64::consts::PI;

    /// Deterministic spiral sampling of a sphere, with outward unit normals.
    fn sphere_cloud(count: usize, radius: f64) -> PointCloud {
        let golden = PI * (3.0 - 5.0_f64.sqrt());
        let (points, normals): (Vec<_>, Vec<_>) = (0..count)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
                let ring = (1.0 - z * z).sqrt();
                let phi = i as f64 * golden;
                let dir = Vector3::new(ring * phi.cos(), ring * phi.sin(), z);
                (Point3::from(dir * radius), dir)
            })
            .unzip();
        PointCloud::from_points_and_normals(points, normals).unwrap()
    }

    fn sphere_directions(count: usize) -> Vec<Vector3<f64>> {
        let golden = PI * (3.0 - 5.0_f64.sqrt());
        (0..count)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
                let ring = (1.0 - z * z).sqrt();
                let phi = i as f64 * golden;
                Vector3::new(ring * phi.cos(), ring * phi.sin(), z)
            })
            .collect()
    }

    #[test]
    fn empty_cloud_is_rejected() {
        let result = SurfaceSdf::new(PointCloud::from_points(Vec::new()));
        assert!(matches!(result, Err(SdfError::EmptyPointCloud)));
    }

    #[test]
    fn distance_vanishes_on_the_surface() {
        let sdf = SurfaceSdf::new(sphere_cloud(1000, 1.0)).unwrap();
        let on_surface = sdf.cloud().points()[123];

        let d = sdf
            .signed_distance(&on_surface, &SignStrategy::normal_vote())
            .unwrap();
        assert_relative_eq!(d.abs(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn unit_sphere_center_and_far_point() {
        let sdf = SurfaceSdf::new(sphere_cloud(10_000, 1.0)).unwrap();
        let strategy = SignStrategy::normal_vote();

        let center = sdf.signed_distance(&Point3::origin(), &strategy).unwrap();
        assert_relative_eq!(center, -1.0, epsilon = 0.05);

        let far = sdf
            .signed_distance(&Point3::new(2.0, 0.0, 0.0), &strategy)
            .unwrap();
        assert_relative_eq!(far, 1.0, epsilon = 0.05);
    }

    #[test]
    fn sphere_sign_consistency_is_statistical() {
        let sdf = SurfaceSdf::new(sphere_cloud(10_000, 1.0)).unwrap();
        let strategy = SignStrategy::normal_vote();
        let directions = sphere_directions(200);

        let interior: Vec<Point3<f64>> =
            directions.iter().map(|d| Point3::from(d * 0.5)).collect();
        let exterior: Vec<Point3<f64>> =
            directions.iter().map(|d| Point3::from(d * 1.5)).collect();

        let inside_ok = sdf
            .signed_distances(&interior, &strategy)
            .unwrap()
            .iter()
            .filter(|d| **d < 0.0)
            .count();
        let outside_ok = sdf
            .signed_distances(&exterior, &strategy)
            .unwrap()
            .iter()
            .filter(|d| **d > 0.0)
            .count();

        assert!(inside_ok as f64 >= 0.95 * directions.len() as f64);
        assert!(outside_ok as f64 >= 0.95 * directions.len() as f64);
    }

    #[test]
    fn batching_does_not_change_results() {
        let sdf = SurfaceSdf::new(sphere_cloud(2000, 1.0)).unwrap();
        let strategy = SignStrategy::normal_vote();
        let queries: Vec<Point3<f64>> = sphere_directions(500)
            .iter()
            .enumerate()
            .map(|(i, d)| Point3::from(d * (0.3 + 0.003 * i as f64)))
            .collect();

        let whole = sdf
            .signed_distances_batched(&queries, &strategy, DEFAULT_BATCH_SIZE)
            .unwrap();
        for batch_size in [512, 64, 7, 1] {
            let chunked = sdf
                .signed_distances_batched(&queries, &strategy, batch_size)
                .unwrap();
            assert_eq!(whole, chunked);
        }
    }

    struct Beyond {
        radius: f64,
    }

    impl VisibilityOracle for Beyond {
        fn is_visible(&self, point: &Point3<f64>) -> bool {
            point.coords.norm() >= self.radius - 1e-9
        }
    }

    fn scanned_sphere_cloud(count: usize, radius: f64) -> PointCloud {
        let golden = PI * (3.0 - 5.0_f64.sqrt());
        let points: Vec<Point3<f64>> = (0..count)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
                let ring = (1.0 - z * z).sqrt();
                let phi = i as f64 * golden;
                Point3::from(Vector3::new(ring * phi.cos(), ring * phi.sin(), z) * radius)
            })
            .collect();
        let scan = Scan::new(
            CameraPose::new(0.0, 0.0),
            points,
            None,
            Box::new(Beyond { radius }),
        )
        .unwrap();
        PointCloud::from_scan_list(vec![scan]).unwrap()
    }

    #[test]
    fn visibility_sign_matches_the_convention() {
        let sdf = SurfaceSdf::new(scanned_sphere_cloud(5000, 1.0)).unwrap();
        let strategy = SignStrategy::visibility();

        // The center is occluded from every camera: inside, negative.
        let center = sdf.signed_distance(&Point3::origin(), &strategy).unwrap();
        assert_relative_eq!(center, -1.0, epsilon = 0.05);

        // A far point is visible: outside, positive.
        let far = sdf
            .signed_distance(&Point3::new(2.0, 0.0, 0.0), &strategy)
            .unwrap();
        assert_relative_eq!(far, 1.0, epsilon = 0.05);
    }

    #[test]
    fn normal_vote_requires_normals() {
        let points = sphere_cloud(100, 1.0).points().to_vec();
        let sdf = SurfaceSdf::new(PointCloud::from_points(points)).unwrap();
        assert!(matches!(
            sdf.signed_distance(&Point3::origin(), &SignStrategy::normal_vote()),
            Err(SdfError::MissingNormals)
        ));
    }

    #[test]
    fn visibility_requires_scans() {
        let sdf = SurfaceSdf::new(sphere_cloud(100, 1.0)).unwrap();
        assert!(matches!(
            sdf.signed_distance(&Point3::origin(), &SignStrategy::visibility()),
            Err(SdfError::MissingScans)
        ));
    }

    #[test]
    fn zero_neighbors_is_invalid() {
        let sdf = SurfaceSdf::new(sphere_cloud(100, 1.0)).unwrap();
        assert!(matches!(
            sdf.signed_distance(&Point3::origin(), &SignStrategy::normal_vote_with(0)),
            Err(SdfError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn zero_batch_size_is_invalid() {
        let sdf = SurfaceSdf::new(sphere_cloud(100, 1.0)).unwrap();
        assert!(matches!(
            sdf.signed_distances_batched(&[Point3::origin()], &SignStrategy::normal_vote(), 0),
            Err(SdfError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn results_stay_index_aligned() {
        let sdf = SurfaceSdf::new(sphere_cloud(1000, 1.0)).unwrap();
        let strategy = SignStrategy::normal_vote();
        let queries = vec![Point3::origin(), Point3::new(3.0, 0.0, 0.0)];

        let distances = sdf.signed_distances(&queries, &strategy).unwrap();
        assert_eq!(distances.len(), 2);
        assert!(distances[0] < 0.0);
        assert!(distances[1] > 0.0);
    }
}
