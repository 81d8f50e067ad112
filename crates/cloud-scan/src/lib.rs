//! Surface point cloud capture for SDF estimation.
//!
//! This crate provides the data model and capture pipeline that feed the
//! `cloud-sdf` query engine:
//!
//! - **Point Cloud** - ordered surface points with optional normals and scans
//! - **Scan** - one virtual-camera capture with its visibility oracle
//! - **Multi-view** - deterministic equidistant camera placement and
//!   aggregation of many captures into one cloud
//! - **Capability traits** - the external mesh sampling and depth scanning
//!   primitives, expressed as traits so no mesh or rendering library leaks in
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with zero rendering dependencies. The actual
//! depth-buffer rasterization lives behind the [`DepthScanner`] trait.
//!
//! # Quick Start
//!
//! ```
//! use cloud_scan::PointCloud;
//! use nalgebra::{Point3, Vector3};
//!
//! // A minimal cloud built directly from points and normals.
//! let cloud = PointCloud::from_points_and_normals(
//!     vec![Point3::new(1.0, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)],
//!     vec![Vector3::x(), -Vector3::x()],
//! ).unwrap();
//!
//! assert_eq!(cloud.len(), 2);
//! assert!(cloud.has_normals());
//! ```
//!
//! Clouds built from multi-view scanning additionally retain one [`Scan`]
//! record per camera, whose visibility oracles drive the depth-buffer sign
//! strategy downstream:
//!
//! ```no_run
//! use cloud_scan::{DepthScanner, MultiViewParams, PointCloud};
//!
//! fn capture(scanner: &dyn DepthScanner) -> PointCloud {
//!     let params = MultiViewParams::new().with_scan_count(100);
//!     PointCloud::from_scans(scanner, &params).unwrap()
//! }
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod multiview;
mod pointcloud;
mod scan;
mod source;

pub use error::{ScanError, ScanResult};
pub use multiview::{MultiViewParams, acquire_scans, equidistant_camera_angles};
pub use pointcloud::{Aabb, PointCloud};
pub use scan::{CameraPose, Scan, VisibilityOracle};
pub use source::{DepthScanner, SampledSurface, SurfaceSampler};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
