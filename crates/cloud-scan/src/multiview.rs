//! Multi-view scan aggregation.
//!
//! Spreads virtual cameras roughly evenly over the view sphere with a
//! deterministic low-discrepancy spiral, drives the backend's
//! [`DepthScanner`] capability at each pose, and merges the captures into a
//! single [`PointCloud`] that retains every scan's visibility oracle.

use std::f64::consts::{PI, TAU};

use tracing::{debug, info};

use crate::error::{ScanError, ScanResult};
use crate::pointcloud::PointCloud;
use crate::scan::{CameraPose, Scan};
use crate::source::DepthScanner;

/// Golden-angle azimuth increment of the camera spiral, in radians.
const SPIRAL_INCREMENT: f64 = PI * (3.0 - 2.236_067_977_499_79);

/// Parameters for multi-view capture.
///
/// # Example
///
/// ```
/// use cloud_scan::MultiViewParams;
///
/// let params = MultiViewParams::new()
///     .with_scan_count(64)
///     .with_resolution(256)
///     .with_bounding_radius(1.0);
/// assert_eq!(params.scan_count, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiViewParams {
    /// Number of camera views. Must be at least 2 (default: 100).
    pub scan_count: usize,

    /// Raster resolution of each depth capture (default: 400).
    pub resolution: u32,

    /// Viewing distance; the scanned object must fit in a sphere of this
    /// radius around the origin (default: 1.0).
    pub bounding_radius: f64,

    /// Whether captures carry per-point normals (default: true).
    pub want_normals: bool,
}

impl Default for MultiViewParams {
    fn default() -> Self {
        Self {
            scan_count: 100,
            resolution: 400,
            bounding_radius: 1.0,
            want_normals: true,
        }
    }
}

impl MultiViewParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of camera views.
    #[must_use]
    pub const fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count;
        self
    }

    /// Sets the raster resolution of each capture.
    #[must_use]
    pub const fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the viewing distance.
    #[must_use]
    pub const fn with_bounding_radius(mut self, radius: f64) -> Self {
        self.bounding_radius = radius;
        self
    }

    /// Sets whether captures carry normals.
    #[must_use]
    pub const fn with_normals(mut self, want: bool) -> Self {
        self.want_normals = want;
        self
    }
}

/// Generates `count` camera poses spread roughly evenly over the sphere.
///
/// Uses a deterministic golden-angle spiral: view `i` gets elevation
/// `asin(-1 + 2i/(count-1))` and azimuth `((i+1)·π(3−√5)) mod 2π`. The
/// result covers both poles, elevations lie in `[-π/2, π/2]` and azimuths in
/// `[0, 2π)`.
///
/// # Errors
///
/// Returns [`ScanError::InsufficientViews`] when `count < 2`; the elevation
/// formula divides by `count - 1`.
///
/// # Example
///
/// ```
/// use cloud_scan::equidistant_camera_angles;
///
/// let poses = equidistant_camera_angles(16).unwrap();
/// assert_eq!(poses.len(), 16);
/// assert!(equidistant_camera_angles(1).is_err());
/// ```
pub fn equidistant_camera_angles(count: usize) -> ScanResult<Vec<CameraPose>> {
    if count < 2 {
        return Err(ScanError::InsufficientViews {
            required: 2,
            actual: count,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let poses = (0..count)
        .map(|i| {
            let elevation = (-1.0 + 2.0 * i as f64 / (count - 1) as f64).asin();
            let azimuth = ((i + 1) as f64 * SPIRAL_INCREMENT) % TAU;
            CameraPose::new(azimuth, elevation)
        })
        .collect();
    Ok(poses)
}

/// Captures one scan per equidistant pose, in pose order.
///
/// # Errors
///
/// Fails when fewer than two views are requested or when any capture fails.
/// No partial scan list is returned.
pub fn acquire_scans<S: DepthScanner + ?Sized>(
    scanner: &S,
    params: &MultiViewParams,
) -> ScanResult<Vec<Scan>> {
    let poses = equidistant_camera_angles(params.scan_count)?;
    debug!(
        scan_count = params.scan_count,
        resolution = params.resolution,
        "capturing multi-view scans"
    );

    let mut scans = Vec::with_capacity(poses.len());
    for pose in &poses {
        let scan = scanner.capture(
            pose,
            params.bounding_radius,
            params.resolution,
            params.want_normals,
        )?;
        scans.push(scan);
    }
    Ok(scans)
}

impl PointCloud {
    /// Builds a point cloud by scanning a surface from many viewpoints.
    ///
    /// Each capture's points (and normals, when requested) are concatenated
    /// in pose order, and the scan records are retained so the visibility
    /// sign strategy can be used downstream.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InsufficientViews`] when `params.scan_count < 2`,
    /// and propagates capture failures.
    pub fn from_scans<S: DepthScanner + ?Sized>(
        scanner: &S,
        params: &MultiViewParams,
    ) -> ScanResult<Self> {
        let scans = acquire_scans(scanner, params)?;
        let cloud = Self::from_scan_list(scans)?;
        info!(
            scans = cloud.scans().len(),
            points = cloud.len(),
            "aggregated multi-view point cloud"
        );
        Ok(cloud)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::scan::VisibilityOracle;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn spiral_increment_matches_golden_angle() {
        assert_relative_eq!(
            SPIRAL_INCREMENT,
            PI * (3.0 - 5.0_f64.sqrt()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn angles_rejects_degenerate_counts() {
        assert!(matches!(
            equidistant_camera_angles(0),
            Err(ScanError::InsufficientViews {
                required: 2,
                actual: 0
            })
        ));
        assert!(matches!(
            equidistant_camera_angles(1),
            Err(ScanError::InsufficientViews {
                required: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn angles_lie_in_documented_ranges() {
        let poses = equidistant_camera_angles(100).unwrap();
        for pose in &poses {
            assert!(pose.elevation() >= -FRAC_PI_2 && pose.elevation() <= FRAC_PI_2);
            assert!(pose.azimuth() >= 0.0 && pose.azimuth() < TAU);
        }
    }

    #[test]
    fn angles_cover_both_poles() {
        let poses = equidistant_camera_angles(33).unwrap();
        assert_relative_eq!(poses[0].elevation(), -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(poses[32].elevation(), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn angles_are_pairwise_distinct() {
        let poses = equidistant_camera_angles(50).unwrap();
        for (i, a) in poses.iter().enumerate() {
            for b in &poses[i + 1..] {
                assert!(
                    (a.azimuth() - b.azimuth()).abs() > 1e-9
                        || (a.elevation() - b.elevation()).abs() > 1e-9
                );
            }
        }
    }

    /// Returns a fixed number of points on the hemisphere facing the camera.
    struct HemisphereScanner;

    struct HalfSpace {
        direction: Vector3<f64>,
    }

    impl VisibilityOracle for HalfSpace {
        fn is_visible(&self, point: &Point3<f64>) -> bool {
            point.coords.dot(&self.direction) >= 0.0
        }
    }

    impl DepthScanner for HemisphereScanner {
        fn capture(
            &self,
            pose: &CameraPose,
            bounding_radius: f64,
            resolution: u32,
            want_normals: bool,
        ) -> ScanResult<Scan> {
            let direction = pose.direction();
            let count = resolution as usize;
            let points: Vec<Point3<f64>> = (0..count)
                .map(|i| {
                    let t = i as f64 / count as f64;
                    Point3::from(direction * bounding_radius * (0.5 + 0.5 * t))
                })
                .collect();
            let normals = want_normals.then(|| points.iter().map(|_| direction).collect());
            Scan::new(*pose, points, normals, Box::new(HalfSpace { direction }))
        }
    }

    #[test]
    fn from_scans_single_view_fails() {
        let params = MultiViewParams::new().with_scan_count(1);
        assert!(matches!(
            PointCloud::from_scans(&HemisphereScanner, &params),
            Err(ScanError::InsufficientViews { .. })
        ));
    }

    #[test]
    fn from_scans_two_views_concatenate_in_order() {
        let params = MultiViewParams::new()
            .with_scan_count(2)
            .with_resolution(8)
            .with_normals(true);

        let cloud = PointCloud::from_scans(&HemisphereScanner, &params).unwrap();

        assert_eq!(cloud.scans().len(), 2);
        assert_eq!(cloud.len(), 16);
        assert!(cloud.has_normals());

        // The first eight points are exactly the first scan's points.
        let first = cloud.scans()[0].points();
        assert_eq!(&cloud.points()[..8], first);
        let second = cloud.scans()[1].points();
        assert_eq!(&cloud.points()[8..], second);
    }

    #[test]
    fn params_builder_roundtrip() {
        let params = MultiViewParams::new()
            .with_scan_count(7)
            .with_resolution(32)
            .with_bounding_radius(2.0)
            .with_normals(false);
        assert_eq!(params.scan_count, 7);
        assert_eq!(params.resolution, 32);
        assert_relative_eq!(params.bounding_radius, 2.0);
        assert!(!params.want_normals);
    }
}
