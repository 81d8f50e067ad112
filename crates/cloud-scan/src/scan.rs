//! Virtual-camera scan records.
//!
//! A [`Scan`] is one depth-camera capture of a surface: the camera pose, the
//! surface points visible from that pose (with optional normals), and a
//! visibility oracle answering "is this point unoccluded from this camera".
//! Scans are created once during multi-view capture and are immutable
//! afterwards.

use std::fmt;

use nalgebra::{Isometry3, Point3, Vector3};

use crate::error::{ScanError, ScanResult};

/// A virtual camera pose on the view sphere, given as two rotation angles.
///
/// The camera sits on a sphere around the origin, looking at the origin.
/// `azimuth` rotates around the z axis, `elevation` tilts towards the poles.
/// The viewing distance is supplied separately (the bounding radius of the
/// scanned object), so the same pose can be reused at different distances.
///
/// # Example
///
/// ```
/// use cloud_scan::CameraPose;
///
/// let pose = CameraPose::new(0.0, 0.0);
/// let eye = pose.eye(2.0);
/// assert!((eye.x - 2.0).abs() < 1e-12);
/// assert!(eye.y.abs() < 1e-12 && eye.z.abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraPose {
    /// Rotation around the z axis, in radians.
    azimuth: f64,
    /// Tilt towards the poles, in radians. `0` is the equator.
    elevation: f64,
}

impl CameraPose {
    /// Creates a pose from azimuth and elevation angles in radians.
    #[must_use]
    pub const fn new(azimuth: f64, elevation: f64) -> Self {
        Self { azimuth, elevation }
    }

    /// Rotation around the z axis, in radians.
    #[must_use]
    pub const fn azimuth(&self) -> f64 {
        self.azimuth
    }

    /// Tilt towards the poles, in radians.
    #[must_use]
    pub const fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Unit direction from the origin towards the camera.
    #[must_use]
    pub fn direction(&self) -> Vector3<f64> {
        let (sin_e, cos_e) = self.elevation.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        Vector3::new(cos_e * cos_a, cos_e * sin_a, sin_e)
    }

    /// Camera position at the given viewing distance from the origin.
    #[must_use]
    pub fn eye(&self, radius: f64) -> Point3<f64> {
        Point3::from(self.direction() * radius)
    }

    /// View transform (world to camera space) at the given viewing distance.
    ///
    /// The camera looks at the origin. Near the poles the usual z-up vector
    /// becomes collinear with the view direction, so x-up is substituted
    /// there.
    #[must_use]
    pub fn view(&self, radius: f64) -> Isometry3<f64> {
        let eye = self.eye(radius);
        let up = if self.direction().z.abs() > 1.0 - 1e-9 {
            Vector3::x()
        } else {
            Vector3::z()
        };
        Isometry3::look_at_rh(&eye, &Point3::origin(), &up)
    }
}

/// Per-scan visibility predicate.
///
/// Answers whether an arbitrary 3D point is visible (unoccluded) from the
/// scan's camera. A real scanner backs this with a depth-buffer comparison
/// against the captured depth image; tests back it with analytic stand-ins.
///
/// Oracles must be `Send + Sync` so a scan set can be shared across worker
/// threads during batched SDF evaluation.
pub trait VisibilityOracle: Send + Sync {
    /// Returns true if the point is unoccluded from this scan's camera.
    fn is_visible(&self, point: &Point3<f64>) -> bool;

    /// Evaluates the predicate over a batch of points.
    fn visible_mask(&self, points: &[Point3<f64>]) -> Vec<bool> {
        points.iter().map(|p| self.is_visible(p)).collect()
    }
}

/// One virtual-camera capture: pose, visible surface points, and the
/// visibility oracle for that viewpoint.
pub struct Scan {
    pose: CameraPose,
    points: Vec<Point3<f64>>,
    normals: Option<Vec<Vector3<f64>>>,
    oracle: Box<dyn VisibilityOracle>,
}

impl Scan {
    /// Creates a scan from a capture.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NormalCountMismatch`] if normals are present but
    /// their count differs from the point count.
    pub fn new(
        pose: CameraPose,
        points: Vec<Point3<f64>>,
        normals: Option<Vec<Vector3<f64>>>,
        oracle: Box<dyn VisibilityOracle>,
    ) -> ScanResult<Self> {
        if let Some(normals) = &normals {
            if normals.len() != points.len() {
                return Err(ScanError::NormalCountMismatch {
                    points: points.len(),
                    normals: normals.len(),
                });
            }
        }
        Ok(Self {
            pose,
            points,
            normals,
            oracle,
        })
    }

    /// The camera pose this scan was captured from.
    #[must_use]
    pub const fn pose(&self) -> &CameraPose {
        &self.pose
    }

    /// The surface points visible from this scan's camera.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Per-point normals, if they were captured.
    #[must_use]
    pub fn normals(&self) -> Option<&[Vector3<f64>]> {
        self.normals.as_deref()
    }

    /// Number of captured points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the capture saw no surface at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns true if the point is unoccluded from this scan's camera.
    #[must_use]
    pub fn is_visible(&self, point: &Point3<f64>) -> bool {
        self.oracle.is_visible(point)
    }

    /// Evaluates visibility over a batch of points.
    #[must_use]
    pub fn visible_mask(&self, points: &[Point3<f64>]) -> Vec<bool> {
        self.oracle.visible_mask(points)
    }
}

impl fmt::Debug for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("pose", &self.pose)
            .field("points", &self.points.len())
            .field("normals", &self.normals.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    struct AlwaysVisible;

    impl VisibilityOracle for AlwaysVisible {
        fn is_visible(&self, _point: &Point3<f64>) -> bool {
            true
        }
    }

    #[test]
    fn pose_direction_is_unit_length() {
        for (azimuth, elevation) in [(0.0, 0.0), (1.0, 0.5), (PI, -1.2), (4.0, FRAC_PI_2)] {
            let pose = CameraPose::new(azimuth, elevation);
            assert_relative_eq!(pose.direction().norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn pose_eye_at_requested_radius() {
        let pose = CameraPose::new(0.7, -0.3);
        assert_relative_eq!(pose.eye(2.5).coords.norm(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn view_maps_eye_to_origin_looking_down_negative_z() {
        let pose = CameraPose::new(1.3, 0.4);
        let view = pose.view(2.0);

        // The eye lands at the camera-space origin.
        let eye_cam = view.transform_point(&pose.eye(2.0));
        assert_relative_eq!(eye_cam.coords.norm(), 0.0, epsilon = 1e-9);

        // The world origin lands on the negative z axis at the view distance.
        let origin_cam = view.transform_point(&Point3::origin());
        assert_relative_eq!(origin_cam.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(origin_cam.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(origin_cam.z, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn view_is_well_defined_at_poles() {
        for elevation in [FRAC_PI_2, -FRAC_PI_2] {
            let pose = CameraPose::new(0.0, elevation);
            let origin_cam = pose.view(1.0).transform_point(&Point3::origin());
            assert_relative_eq!(origin_cam.z, -1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn scan_rejects_mismatched_normals() {
        let points = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let normals = vec![Vector3::z()];
        let result = Scan::new(
            CameraPose::new(0.0, 0.0),
            points,
            Some(normals),
            Box::new(AlwaysVisible),
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
    fn scan_accessors() {
        let scan = Scan::new(
            CameraPose::new(0.0, 0.0),
            vec![Point3::new(1.0, 2.0, 3.0)],
            None,
            Box::new(AlwaysVisible),
        )
        .unwrap();

        assert_eq!(scan.len(), 1);
        assert!(!scan.is_empty());
        assert!(scan.normals().is_none());
        assert!(scan.is_visible(&Point3::origin()));
        assert_eq!(scan.visible_mask(&[Point3::origin()]), vec![true]);
        assert_relative_eq!(scan.points()[0].y, 2.0);
    }

    #[test]
    fn scan_debug_omits_oracle() {
        let scan = Scan::new(
            CameraPose::new(0.0, 0.0),
            vec![Point3::origin()],
            None,
            Box::new(AlwaysVisible),
        )
        .unwrap();
        let repr = format!("{scan:?}");
        assert!(repr.contains("points: 1"));
    }
}
