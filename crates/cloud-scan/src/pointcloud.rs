//! Surface point cloud data structure.
//!
//! A [`PointCloud`] is an ordered set of surface points with optional
//! index-aligned unit normals and an optional list of the [`Scan`] records it
//! was aggregated from. The invariants (normal count matches point count;
//! scan-built clouds are exactly the concatenation of their scans) are
//! enforced at construction, so fields are private and clouds are built only
//! through the constructors here and in [`crate::multiview`].

use nalgebra::{Point3, Vector3};
use rand::Rng;

use crate::error::{ScanError, ScanResult};
use crate::scan::Scan;
use crate::source::SurfaceSampler;

/// Axis-aligned bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

/// An ordered collection of surface points with optional normals and scans.
///
/// # Example
///
/// ```
/// use cloud_scan::PointCloud;
/// use nalgebra::Point3;
///
/// let cloud = PointCloud::from_points(vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
/// ]);
///
/// assert_eq!(cloud.len(), 2);
/// assert!(!cloud.has_normals());
/// assert!(!cloud.has_scans());
/// ```
#[derive(Debug, Default)]
pub struct PointCloud {
    points: Vec<Point3<f64>>,
    normals: Option<Vec<Vector3<f64>>>,
    scans: Vec<Scan>,
}

impl PointCloud {
    /// Creates a cloud from bare positions, without normals or scans.
    #[must_use]
    pub fn from_points(points: Vec<Point3<f64>>) -> Self {
        Self {
            points,
            normals: None,
            scans: Vec::new(),
        }
    }

    /// Creates a cloud from positions and index-aligned unit normals.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NormalCountMismatch`] if the counts differ.
    ///
    /// # Example
    ///
    /// ```
    /// use cloud_scan::PointCloud;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let cloud = PointCloud::from_points_and_normals(
    ///     vec![Point3::new(0.0, 0.0, 1.0)],
    ///     vec![Vector3::z()],
    /// ).unwrap();
    /// assert!(cloud.has_normals());
    /// ```
    pub fn from_points_and_normals(
        points: Vec<Point3<f64>>,
        normals: Vec<Vector3<f64>>,
    ) -> ScanResult<Self> {
        if normals.len() != points.len() {
            return Err(ScanError::NormalCountMismatch {
                points: points.len(),
                normals: normals.len(),
            });
        }
        Ok(Self {
            points,
            normals: Some(normals),
            scans: Vec::new(),
        })
    }

    /// Creates a cloud by sampling a surface uniformly.
    ///
    /// Delegates to the backend's [`SurfaceSampler`] capability; the
    /// resulting cloud carries no scans, so only the normal-vote sign
    /// strategy applies to it downstream.
    ///
    /// # Errors
    ///
    /// Propagates sampler errors, and rejects samples whose normal count
    /// does not match the point count.
    pub fn from_sampling<S: SurfaceSampler + ?Sized>(
        sampler: &S,
        count: usize,
        want_normals: bool,
    ) -> ScanResult<Self> {
        let sampled = sampler.sample(count, want_normals)?;
        match sampled.normals {
            Some(normals) => Self::from_points_and_normals(sampled.points, normals),
            None => Ok(Self::from_points(sampled.points)),
        }
    }

    /// Assembles a cloud from already-captured scans.
    ///
    /// Points (and normals, when every scan carries them) are concatenated
    /// in scan order, and the scan records are retained for visibility
    /// queries. Callers that capture scans concurrently must pass them here
    /// in pose order, not completion order.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::EmptyScanSet`] for an empty list, and
    /// [`ScanError::InvalidParameter`] when only some scans carry normals.
    pub fn from_scan_list(scans: Vec<Scan>) -> ScanResult<Self> {
        if scans.is_empty() {
            return Err(ScanError::EmptyScanSet);
        }

        let with_normals = scans.iter().filter(|s| s.normals().is_some()).count();
        if with_normals != 0 && with_normals != scans.len() {
            return Err(ScanError::InvalidParameter {
                reason: format!(
                    "{with_normals} of {} scans carry normals; expected all or none",
                    scans.len()
                ),
            });
        }

        let total: usize = scans.iter().map(Scan::len).sum();
        let mut points = Vec::with_capacity(total);
        let mut normals = if with_normals == scans.len() {
            Some(Vec::with_capacity(total))
        } else {
            None
        };

        for scan in &scans {
            points.extend_from_slice(scan.points());
            if let (Some(all), Some(per_scan)) = (normals.as_mut(), scan.normals()) {
                all.extend_from_slice(per_scan);
            }
        }

        Ok(Self {
            points,
            normals,
            scans,
        })
    }

    /// The surface points, in insertion (scan) order.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Unit normals index-aligned with [`Self::points`], if present.
    #[must_use]
    pub fn normals(&self) -> Option<&[Vector3<f64>]> {
        self.normals.as_deref()
    }

    /// The scan records this cloud was aggregated from. Empty for sampled
    /// clouds.
    #[must_use]
    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the cloud has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns true if every point carries a normal.
    #[must_use]
    pub const fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Returns true if the cloud retains scan records.
    #[must_use]
    pub fn has_scans(&self) -> bool {
        !self.scans.is_empty()
    }

    /// Draws `count` points from the cloud by random index choice, with
    /// replacement.
    ///
    /// Returns an empty vector for an empty cloud.
    pub fn random_surface_points<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Vec<Point3<f64>> {
        if self.points.is_empty() {
            return Vec::new();
        }
        (0..count)
            .map(|_| self.points[rng.gen_range(0..self.points.len())])
            .collect()
    }

    /// Axis-aligned bounding box, or `None` for an empty cloud.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some(Aabb { min, max })
    }

    /// Center of mass, or `None` for an empty cloud.
    #[must_use]
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = self.points.iter().map(|p| p.coords).sum();
        #[allow(clippy::cast_precision_loss)]
        let centroid = sum / self.points.len() as f64;
        Some(Point3::from(centroid))
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
    use crate::scan::{CameraPose, VisibilityOracle};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct AlwaysVisible;

    impl VisibilityOracle for AlwaysVisible {
        fn is_visible(&self, _point: &Point3<f64>) -> bool {
            true
        }
    }

    fn scan_with(points: Vec<Point3<f64>>, normals: Option<Vec<Vector3<f64>>>) -> Scan {
        Scan::new(
            CameraPose::new(0.0, 0.0),
            points,
            normals,
            Box::new(AlwaysVisible),
        )
        .unwrap()
    }

    #[test]
    fn from_points_has_no_normals_or_scans() {
        let cloud = PointCloud::from_points(vec![Point3::origin()]);
        assert_eq!(cloud.len(), 1);
        assert!(!cloud.has_normals());
        assert!(!cloud.has_scans());
    }

    #[test]
    fn from_points_and_normals_rejects_mismatch() {
        let result = PointCloud::from_points_and_normals(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![Vector3::z()],
        );
        assert!(matches!(
            result,
            Err(ScanError::NormalCountMismatch {
                points: 2,
                normals: 1
            })
        ));
    }

    #[test]
    fn from_scan_list_concatenates_in_scan_order() {
        let a = scan_with(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            None,
        );
        let b = scan_with(vec![Point3::new(2.0, 0.0, 0.0)], None);

        let cloud = PointCloud::from_scan_list(vec![a, b]).unwrap();

        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.scans().len(), 2);
        assert_relative_eq!(cloud.points()[0].x, 0.0);
        assert_relative_eq!(cloud.points()[1].x, 1.0);
        assert_relative_eq!(cloud.points()[2].x, 2.0);
    }

    #[test]
    fn from_scan_list_concatenates_normals() {
        let a = scan_with(vec![Point3::origin()], Some(vec![Vector3::x()]));
        let b = scan_with(vec![Point3::origin()], Some(vec![Vector3::y()]));

        let cloud = PointCloud::from_scan_list(vec![a, b]).unwrap();
        let normals = cloud.normals().unwrap();

        assert_eq!(normals.len(), 2);
        assert_relative_eq!(normals[0].x, 1.0);
        assert_relative_eq!(normals[1].y, 1.0);
    }

    #[test]
    fn from_scan_list_rejects_empty() {
        assert!(matches!(
            PointCloud::from_scan_list(Vec::new()),
            Err(ScanError::EmptyScanSet)
        ));
    }

    #[test]
    fn from_scan_list_rejects_mixed_normals() {
        let a = scan_with(vec![Point3::origin()], Some(vec![Vector3::z()]));
        let b = scan_with(vec![Point3::origin()], None);

        assert!(matches!(
            PointCloud::from_scan_list(vec![a, b]),
            Err(ScanError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn from_sampling_uses_the_sampler() {
        use crate::source::SampledSurface;

        struct LineSampler;

        impl SurfaceSampler for LineSampler {
            fn sample(&self, count: usize, want_normals: bool) -> ScanResult<SampledSurface> {
                let points = (0..count)
                    .map(|i| Point3::new(i as f64, 0.0, 0.0))
                    .collect();
                let normals = want_normals.then(|| vec![Vector3::z(); count]);
                Ok(SampledSurface { points, normals })
            }
        }

        let cloud = PointCloud::from_sampling(&LineSampler, 5, true).unwrap();
        assert_eq!(cloud.len(), 5);
        assert!(cloud.has_normals());

        let bare = PointCloud::from_sampling(&LineSampler, 5, false).unwrap();
        assert!(!bare.has_normals());
    }

    #[test]
    fn random_surface_points_draws_from_the_cloud() {
        let cloud = PointCloud::from_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ]);
        let mut rng = StdRng::seed_from_u64(7);

        let drawn = cloud.random_surface_points(50, &mut rng);
        assert_eq!(drawn.len(), 50);
        for p in &drawn {
            assert!(cloud.points().iter().any(|q| q == p));
        }
    }

    #[test]
    fn random_surface_points_empty_cloud() {
        let cloud = PointCloud::from_points(Vec::new());
        let mut rng = StdRng::seed_from_u64(7);
        assert!(cloud.random_surface_points(10, &mut rng).is_empty());
    }

    #[test]
    fn bounds_and_centroid() {
        let cloud = PointCloud::from_points(vec![
            Point3::new(0.0, 1.0, 2.0),
            Point3::new(4.0, 3.0, -2.0),
        ]);

        let bounds = cloud.bounds().unwrap();
        assert_relative_eq!(bounds.min.z, -2.0);
        assert_relative_eq!(bounds.max.x, 4.0);

        let centroid = cloud.centroid().unwrap();
        assert_relative_eq!(centroid.x, 2.0);
        assert_relative_eq!(centroid.y, 2.0);
        assert_relative_eq!(centroid.z, 0.0);
    }

    #[test]
    fn bounds_and_centroid_empty() {
        let cloud = PointCloud::from_points(Vec::new());
        assert!(cloud.bounds().is_none());
        assert!(cloud.centroid().is_none());
    }
}
