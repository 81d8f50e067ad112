//! Signed distance field estimation from surface point clouds.
//!
//! This crate estimates an SDF for an arbitrary 3D surface represented as a
//! dense point cloud, without requiring a watertight or well-oriented mesh:
//!
//! - [`SpatialIndex`] - read-only k-nearest-neighbor index over the cloud
//! - [`SignStrategy`] - inside/outside via normal-vote consensus or
//!   multi-view depth-buffer visibility
//! - [`SurfaceSdf`] - batched signed-distance queries
//! - [`VoxelVolume`] - regular-grid evaluation with a mesh quality check
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with zero rendering dependencies; the point cloud
//! and scan inputs come from `cloud-scan`.
//!
//! # Example
//!
//! ```
//! use cloud_scan::PointCloud;
//! use cloud_sdf::{SignStrategy, SurfaceSdf, VoxelizeParams};
//! use nalgebra::{Point3, Vector3};
//! use std::f64::consts::PI;
//!
//! // A sphere of radius 0.5, sampled on a deterministic spiral.
//! let golden = PI * (3.0 - 5.0_f64.sqrt());
//! let (points, normals): (Vec<_>, Vec<_>) = (0..2000)
//!     .map(|i| {
//!         let z = 1.0 - 2.0 * (i as f64 + 0.5) / 2000.0;
//!         let ring = (1.0 - z * z).sqrt();
//!         let phi = i as f64 * golden;
//!         let dir = Vector3::new(ring * phi.cos(), ring * phi.sin(), z);
//!         (Point3::from(dir * 0.5), dir)
//!     })
//!     .unzip();
//! let cloud = PointCloud::from_points_and_normals(points, normals).unwrap();
//!
//! let sdf = SurfaceSdf::new(cloud).unwrap();
//!
//! // Point queries: negative inside, positive outside.
//! let strategy = SignStrategy::normal_vote();
//! assert!(sdf.signed_distance(&Point3::origin(), &strategy).unwrap() < 0.0);
//! assert!(sdf.signed_distance(&Point3::new(1.0, 0.0, 0.0), &strategy).unwrap() > 0.0);
//!
//! // Voxelize into a validated, padded volume for iso-surface extraction.
//! let params = VoxelizeParams::new(16).with_pad(true).with_validation(true);
//! let volume = sdf.voxelize(&params).unwrap();
//! assert_eq!(volume.resolution(), 18);
//! ```
//!
//! # Use Cases
//!
//! - **Training data generation**: voxel SDF volumes for learned shape models
//! - **Collision volumes**: quick inside/outside tests against scanned geometry
//! - **Iso-surface extraction**: padded volumes feed marching-cubes consumers

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod index;
mod query;
mod sign;
mod voxel;

pub use error::{SdfError, SdfResult};
pub use index::{Neighbor, SpatialIndex};
pub use query::{DEFAULT_BATCH_SIZE, SurfaceSdf};
pub use sign::{DEFAULT_NEIGHBOR_VOTES, SignStrategy};
pub use voxel::{VoxelVolume, VoxelizeParams, grid_points};

// Re-export the capture-side types callers hold alongside the estimator
pub use cloud_scan::{PointCloud, Scan};
