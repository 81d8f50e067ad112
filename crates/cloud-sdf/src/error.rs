//! Error types for SDF estimation.

use thiserror::Error;

/// Result type for SDF estimation.
pub type SdfResult<T> = Result<T, SdfError>;

/// Errors that can occur during SDF estimation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SdfError {
    /// A spatial index was requested for an empty point cloud.
    #[error("point cloud is empty")]
    EmptyPointCloud,

    /// The normal-vote sign strategy needs per-point normals.
    #[error("point cloud has no normals; normal-vote sign needs them")]
    MissingNormals,

    /// The visibility sign strategy needs scan records.
    #[error("point cloud has no scans; visibility sign needs them")]
    MissingScans,

    /// Invalid parameter value.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// The voxelized volume failed the mesh quality heuristic.
    ///
    /// The surface is likely too degenerate for a reliable SDF. The entire
    /// volume is discarded; callers may retry with different parameters or a
    /// different sign strategy.
    #[error("mesh quality check failed: {reason}")]
    BadMesh {
        /// What the heuristic rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_point_cloud_display() {
        assert_eq!(format!("{}", SdfError::EmptyPointCloud), "point cloud is empty");
    }

    #[test]
    fn missing_normals_display() {
        assert_eq!(
            format!("{}", SdfError::MissingNormals),
            "point cloud has no normals; normal-vote sign needs them"
        );
    }

    #[test]
    fn bad_mesh_display() {
        let err = SdfError::BadMesh {
            reason: "volume has no interior samples".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "mesh quality check failed: volume has no interior samples"
        );
    }
}
