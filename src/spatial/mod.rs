//! Spatial Index Module: Neighbor Queries over Point Clouds
//!
//! Two interchangeable implementations of the same contract:
//! - `KdTreeIndex`: exact in-memory kd-tree (reference)
//! - `AcceleratedIndex`: batched calls into the accelerator kernels
//!
//! ## Contract
//!
//! - `knn(points, k)`: for every point, its k nearest *other* points,
//!   distances ascending (ties broken by neighbor index)
//! - `radius_query(points, q, r)`: every index i with ‖pᵢ - q‖ ≤ r,
//!   deduplicated and returned in ascending order
//! - `radius_queries(points, centers)`: a batch of radius queries centered
//!   on rows of the cloud; the kd-tree is built once per batch
//!
//! Both implementations compute distances as √(Σ (aᵢ - bᵢ)²) with the
//! same summation order, so radius sets are identical and knn distances
//! agree to floating-point tolerance.

mod accelerated;
mod kdtree;

pub use accelerated::AcceleratedIndex;
pub use kdtree::KdTreeIndex;

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{Result, StreamError};

/// k-nearest-neighbor table: row i holds the neighbors of point i
#[derive(Debug, Clone, PartialEq)]
pub struct KnnResult {
    /// Distances, shape (n, k), ascending per row
    pub distances: Array2<f64>,
    /// Neighbor indices, shape (n, k)
    pub indices: Array2<usize>,
}

impl KnnResult {
    pub fn n_points(&self) -> usize {
        self.distances.nrows()
    }

    pub fn k(&self) -> usize {
        self.distances.ncols()
    }

    /// Distance from each point to its k-th (farthest kept) neighbor
    pub fn kth_distances(&self) -> Vec<f64> {
        let k = self.k();
        if k == 0 {
            return Vec::new();
        }
        self.distances.column(k - 1).to_vec()
    }
}

/// Neighbor queries over a fixed point set.
pub trait SpatialIndex: Send + Sync {
    /// Short backend name, used in logs
    fn name(&self) -> &'static str;

    /// k nearest neighbors of every point, excluding the point itself.
    fn knn(&self, points: ArrayView2<'_, f64>, k: usize) -> Result<KnnResult>;

    /// Indices of all points within `radius` of `query`.
    fn radius_query(
        &self,
        points: ArrayView2<'_, f64>,
        query: ArrayView1<'_, f64>,
        radius: f64,
    ) -> Result<Vec<usize>>;

    /// One radius query per (row, radius), centered on that row of `points`.
    fn radius_queries(&self, points: ArrayView2<'_, f64>, centers: &[(usize, f64)]) -> Result<Vec<Vec<usize>>> {
        centers
            .iter()
            .map(|&(row, radius)| {
                validate_center(points, row)?;
                self.radius_query(points, points.row(row), radius)
            })
            .collect()
    }
}

/// Euclidean distance between two coordinate slices
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Row-major copy of the cloud, the layout both backends consume.
pub(crate) fn flatten(points: ArrayView2<'_, f64>) -> Vec<f64> {
    points.iter().copied().collect()
}

pub(crate) fn validate_knn(n: usize, k: usize) -> Result<()> {
    if k == 0 {
        return Err(StreamError::InvalidInput("k must be at least 1".to_string()));
    }
    if n < k + 1 {
        return Err(StreamError::InsufficientData { available: n, required: k + 1 });
    }
    Ok(())
}

pub(crate) fn validate_radius_query(
    points: ArrayView2<'_, f64>,
    query: ArrayView1<'_, f64>,
    radius: f64,
) -> Result<()> {
    if query.len() != points.ncols() {
        return Err(StreamError::InvalidInput(format!(
            "query has {} coordinates, point cloud has {}",
            query.len(),
            points.ncols()
        )));
    }
    if radius.is_nan() {
        return Err(StreamError::InvalidInput("radius is NaN".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_center(points: ArrayView2<'_, f64>, row: usize) -> Result<()> {
    if row >= points.nrows() {
        return Err(StreamError::InvalidInput(format!(
            "query center {} outside the {}-point cloud",
            row,
            points.nrows()
        )));
    }
    Ok(())
}
