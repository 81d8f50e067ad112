//! Inside/outside sign determination.
//!
//! Two interchangeable strategies decide the sign of a query point's
//! distance. Both use the convention negative = inside, positive = outside.
//!
//! - [`SignStrategy::NormalVote`] classifies a point by a majority vote over
//!   the tangent planes of its k nearest surface points. Cheap, reuses the
//!   k-NN result that already provides the distance magnitude, and needs
//!   per-point normals.
//! - [`SignStrategy::Visibility`] classifies a point as outside when it is
//!   unoccluded from at least one scan camera. Only needs the 1-NN distance
//!   per query, but requires a pre-built multi-view scan set.

use cloud_scan::Scan;
use nalgebra::{Point3, Vector3};

use crate::index::Neighbor;

/// Default neighbor count for the normal vote. Odd, to avoid ties.
pub const DEFAULT_NEIGHBOR_VOTES: usize = 11;

/// Sign determination policy for SDF queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignStrategy {
    /// Majority vote over the normals of the k nearest surface points.
    NormalVote {
        /// Number of neighbors consulted per query. Odd values avoid ties.
        neighbors: usize,
    },

    /// A point is outside iff at least one scan camera sees it.
    Visibility,
}

impl SignStrategy {
    /// Normal vote with the default neighbor count.
    #[must_use]
    pub const fn normal_vote() -> Self {
        Self::NormalVote {
            neighbors: DEFAULT_NEIGHBOR_VOTES,
        }
    }

    /// Normal vote with an explicit neighbor count.
    #[must_use]
    pub const fn normal_vote_with(neighbors: usize) -> Self {
        Self::NormalVote { neighbors }
    }

    /// Depth-buffer visibility sign.
    #[must_use]
    pub const fn visibility() -> Self {
        Self::Visibility
    }
}

impl Default for SignStrategy {
    fn default() -> Self {
        Self::normal_vote()
    }
}

/// Classifies a query point as inside by majority vote over its neighbors'
/// tangent planes.
///
/// A neighbor votes "inside" when the vector from it to the query point
/// opposes its normal, i.e. the query lies on the back side of that
/// neighbor's tangent plane. The point is inside iff strictly more than half
/// of the returned votes say so.
#[must_use]
pub(crate) fn normal_vote_is_inside(
    query: &Point3<f64>,
    neighbors: &[Neighbor],
    points: &[Point3<f64>],
    normals: &[Vector3<f64>],
) -> bool {
    let inside_votes = neighbors
        .iter()
        .filter(|n| {
            let to_query = query - points[n.index];
            to_query.dot(&normals[n.index]) < 0.0
        })
        .count();
    2 * inside_votes > neighbors.len()
}

/// A point is outside iff it is visible from at least one scan camera.
#[must_use]
pub(crate) fn visibility_is_outside(query: &Point3<f64>, scans: &[Scan]) -> bool {
    scans.iter().any(|scan| scan.is_visible(query))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use cloud_scan::{CameraPose, VisibilityOracle};

    #[test]
    fn default_is_normal_vote_with_eleven_neighbors() {
        assert_eq!(
            SignStrategy::default(),
            SignStrategy::NormalVote { neighbors: 11 }
        );
    }

    #[test]
    fn vote_respects_strict_majority() {
        // Three surface points on the z = 0 plane with +z normals.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let normals = vec![Vector3::z(); 3];
        let neighbors: Vec<Neighbor> = (0..3).map(|i| Neighbor { distance: 1.0, index: i }).collect();

        // Above the plane: every vote says outside.
        assert!(!normal_vote_is_inside(
            &Point3::new(0.2, 0.2, 1.0),
            &neighbors,
            &points,
            &normals
        ));

        // Below the plane: every vote says inside.
        assert!(normal_vote_is_inside(
            &Point3::new(0.2, 0.2, -1.0),
            &neighbors,
            &points,
            &normals
        ));
    }

    #[test]
    fn vote_tie_counts_as_outside() {
        // Two opposing planes produce a 1-1 split; a tie is not a strict
        // majority, so the point stays outside.
        let points = vec![Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, 1.0)];
        let normals = vec![Vector3::z(), Vector3::z()];
        let neighbors = vec![
            Neighbor { distance: 1.0, index: 0 },
            Neighbor { distance: 1.0, index: 1 },
        ];

        assert!(!normal_vote_is_inside(
            &Point3::origin(),
            &neighbors,
            &points,
            &normals
        ));
    }

    struct Beyond {
        radius: f64,
    }

    impl VisibilityOracle for Beyond {
        fn is_visible(&self, point: &Point3<f64>) -> bool {
            point.coords.norm() >= self.radius
        }
    }

    fn shell_scan(radius: f64) -> Scan {
        Scan::new(
            CameraPose::new(0.0, 0.0),
            vec![Point3::new(radius, 0.0, 0.0)],
            None,
            Box::new(Beyond { radius }),
        )
        .unwrap()
    }

    #[test]
    fn visibility_is_an_or_across_scans() {
        let scans = vec![shell_scan(1.0), shell_scan(2.0)];

        // Seen by the first oracle only.
        assert!(visibility_is_outside(&Point3::new(1.5, 0.0, 0.0), &scans));
        // Seen by neither.
        assert!(!visibility_is_outside(&Point3::new(0.5, 0.0, 0.0), &scans));
        // No scans at all: nothing is visible.
        assert!(!visibility_is_outside(&Point3::origin(), &[]));
    }
}
