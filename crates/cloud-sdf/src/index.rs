//! Nearest-neighbor index over a point cloud.

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;

use crate::error::{SdfError, SdfResult};

/// One nearest-neighbor result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Euclidean distance from the query point.
    pub distance: f64,
    /// Index of the neighbor in the point array the index was built from.
    pub index: usize,
}

/// A read-only k-nearest-neighbor index over a fixed point set.
///
/// Built once at construction; there is no incremental update. Rebuilding
/// means constructing a new index.
///
/// # Example
///
/// ```
/// use cloud_sdf::SpatialIndex;
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 2.0, 0.0),
/// ];
/// let index = SpatialIndex::build(&points).unwrap();
///
/// let nearest = index.nearest(&Point3::new(0.9, 0.0, 0.0));
/// assert_eq!(nearest.index, 1);
/// assert!((nearest.distance - 0.1).abs() < 1e-9);
/// ```
pub struct SpatialIndex {
    tree: KdTree<f64, 3>,
    len: usize,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl SpatialIndex {
    /// Builds an index over the given points.
    ///
    /// # Errors
    ///
    /// Returns [`SdfError::EmptyPointCloud`] for an empty point set.
    pub fn build(points: &[Point3<f64>]) -> SdfResult<Self> {
        if points.is_empty() {
            return Err(SdfError::EmptyPointCloud);
        }

        let mut tree: KdTree<f64, 3> = KdTree::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            let coords = [point.x, point.y, point.z];
            #[allow(clippy::cast_possible_truncation)]
            let idx = i as u64;
            tree.add(&coords, idx);
        }

        Ok(Self {
            tree,
            len: points.len(),
        })
    }

    /// Number of indexed points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always false; an index cannot be built over an empty point set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the single nearest indexed point.
    #[must_use]
    pub fn nearest(&self, query: &Point3<f64>) -> Neighbor {
        let found = self
            .tree
            .nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        #[allow(clippy::cast_possible_truncation)]
        Neighbor {
            distance: found.distance.sqrt(),
            index: found.item as usize,
        }
    }

    /// Returns up to `k` nearest indexed points, ascending by distance.
    ///
    /// Fewer than `k` neighbors are returned when the index holds fewer than
    /// `k` points; `k = 1` and `k > 1` behave uniformly.
    #[must_use]
    pub fn nearest_n(&self, query: &Point3<f64>, k: usize) -> Vec<Neighbor> {
        let found = self
            .tree
            .nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], k.min(self.len));
        found
            .into_iter()
            .map(|n| {
                #[allow(clippy::cast_possible_truncation)]
                Neighbor {
                    distance: n.distance.sqrt(),
                    index: n.item as usize,
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_points(n: usize) -> Vec<Point3<f64>> {
        #[allow(clippy::cast_precision_loss)]
        (0..n)
            .map(|i| Point3::new(i as f64, 0.1 * i as f64, 0.01 * i as f64))
            .collect()
    }

    #[test]
    fn build_rejects_empty_input() {
        assert!(matches!(
            SpatialIndex::build(&[]),
            Err(SdfError::EmptyPointCloud)
        ));
    }

    #[test]
    fn nearest_finds_the_closest_point() {
        let points = line_points(10);
        let index = SpatialIndex::build(&points).unwrap();

        let nearest = index.nearest(&points[4]);
        assert_eq!(nearest.index, 4);
        assert_relative_eq!(nearest.distance, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn nearest_distance_is_euclidean() {
        let points = vec![Point3::origin(), Point3::new(3.0, 4.0, 0.0)];
        let index = SpatialIndex::build(&points).unwrap();

        let nearest = index.nearest(&Point3::new(3.0, 4.0, 12.0));
        assert_eq!(nearest.index, 1);
        assert_relative_eq!(nearest.distance, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn nearest_n_is_sorted_ascending() {
        let points = line_points(20);
        let index = SpatialIndex::build(&points).unwrap();

        let neighbors = index.nearest_n(&points[10], 5);
        assert_eq!(neighbors.len(), 5);
        assert_eq!(neighbors[0].index, 10);
        for pair in neighbors.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn nearest_n_clamps_k_to_point_count() {
        let points = line_points(3);
        let index = SpatialIndex::build(&points).unwrap();

        let neighbors = index.nearest_n(&Point3::origin(), 11);
        assert_eq!(neighbors.len(), 3);
    }

    #[test]
    fn nearest_n_with_k_one_matches_nearest() {
        let points = line_points(20);
        let index = SpatialIndex::build(&points).unwrap();
        let query = Point3::new(7.4, 0.7, 0.07);

        let one = index.nearest(&query);
        let n = index.nearest_n(&query, 1);
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].index, one.index);
        assert_relative_eq!(n[0].distance, one.distance, epsilon = 1e-12);
    }

    #[test]
    fn len_reports_indexed_points() {
        let index = SpatialIndex::build(&line_points(7)).unwrap();
        assert_eq!(index.len(), 7);
        assert!(!index.is_empty());
    }
}
