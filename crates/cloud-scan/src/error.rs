//! Error types for point cloud capture operations.

use thiserror::Error;

/// Result type for point cloud capture operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while building or aggregating point clouds.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScanError {
    /// Too few camera views requested for multi-view aggregation.
    ///
    /// The equidistant camera spiral divides by `count - 1` and therefore
    /// needs at least two views.
    #[error("multi-view capture needs at least {required} views, got {actual}")]
    InsufficientViews {
        /// Minimum number of views required.
        required: usize,
        /// Number of views that was requested.
        actual: usize,
    },

    /// Normal count does not match point count.
    #[error("normal count mismatch: {points} points but {normals} normals")]
    NormalCountMismatch {
        /// Number of points.
        points: usize,
        /// Number of normals.
        normals: usize,
    },

    /// A point cloud was assembled from an empty scan list.
    #[error("scan list is empty")]
    EmptyScanSet,

    /// Invalid parameter value.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of why the parameter is invalid.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_views_display() {
        let err = ScanError::InsufficientViews {
            required: 2,
            actual: 1,
        };
        assert_eq!(
            format!("{err}"),
            "multi-view capture needs at least 2 views, got 1"
        );
    }

    #[test]
    fn normal_count_mismatch_display() {
        let err = ScanError::NormalCountMismatch {
            points: 10,
            normals: 7,
        };
        assert_eq!(
            format!("{err}"),
            "normal count mismatch: 10 points but 7 normals"
        );
    }

    #[test]
    fn empty_scan_set_display() {
        let err = ScanError::EmptyScanSet;
        assert_eq!(format!("{err}"), "scan list is empty");
    }

    #[test]
    fn invalid_parameter_display() {
        let err = ScanError::InvalidParameter {
            reason: "resolution must be positive".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "invalid parameter: resolution must be positive"
        );
    }
}
