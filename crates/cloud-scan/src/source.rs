//! Capability traits for the external mesh primitives.
//!
//! The SDF estimator never touches mesh data directly. It consumes two
//! capabilities that a mesh backend provides: uniform surface sampling and
//! virtual-camera depth scanning. Both are expressed as traits so the core
//! stays independent of any particular mesh or rendering library.

use nalgebra::{Point3, Vector3};

use crate::error::ScanResult;
use crate::scan::{CameraPose, Scan};

/// Points sampled uniformly on a surface, with optional per-point normals.
#[derive(Debug, Clone, Default)]
pub struct SampledSurface {
    /// Sampled surface positions.
    pub points: Vec<Point3<f64>>,
    /// Unit normals, index-aligned with `points`, when requested.
    pub normals: Option<Vec<Vector3<f64>>>,
}

/// Uniform surface sampling capability.
///
/// Implemented by mesh backends: "sample `count` points uniformly on the
/// surface, optionally with per-point normals".
pub trait SurfaceSampler {
    /// Samples `count` points on the surface.
    ///
    /// When `want_normals` is set, the result carries one unit normal per
    /// point, index-aligned with the points.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot produce the requested samples.
    fn sample(&self, count: usize, want_normals: bool) -> ScanResult<SampledSurface>;
}

/// Virtual depth-camera capture capability.
///
/// Implemented by rendering backends: "render the surface from the given
/// camera pose into a depth image, and convert it into a point set with a
/// per-point visibility predicate".
pub trait DepthScanner {
    /// Captures the surface from one camera pose.
    ///
    /// `bounding_radius` is the viewing distance (the scanned object is
    /// assumed to fit in a sphere of that radius around the origin) and
    /// `resolution` is the raster size of the depth image.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot render from this pose.
    fn capture(
        &self,
        pose: &CameraPose,
        bounding_radius: f64,
        resolution: u32,
        want_normals: bool,
    ) -> ScanResult<Scan>;
}
