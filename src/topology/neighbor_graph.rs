//! kNN Graph and Density Filtration
//!
//! Each point is joined to its k nearest neighbors. The distance to the
//! k-th neighbor gives a density estimate ρ = 1 / max(d_k, ε), and the
//! vertex filtration value is -ρ (dense points enter the filtration first).

use ndarray::{Array2, ArrayView2};
use tracing::{debug, warn};

use super::PersistenceEngine;
use crate::error::{Result, StreamError};
use crate::spatial::{KnnResult, SpatialIndex};

/// Lower bound on the k-th neighbor distance (coincident points)
pub const DENSITY_EPSILON: f64 = 1e-10;

/// Vertex filtration values from k-th neighbor distances.
///
/// filtration[i] = -1 / max(kth_distances[i], ε)
pub fn density_filtration(kth_distances: &[f64]) -> Vec<f64> {
    kth_distances
        .iter()
        .map(|&d| -1.0 / d.max(DENSITY_EPSILON))
        .collect()
}

/// Immutable kNN graph with its vertex filtration
#[derive(Debug, Clone)]
pub struct NeighborGraph {
    /// Neighbor distances (n × k), ascending per row
    pub distances: Array2<f64>,
    /// Neighbor indices (n × k)
    pub indices: Array2<usize>,
    /// Vertex filtration value f(v) = -ρ(v)
    pub filtration: Vec<f64>,
}

impl NeighborGraph {
    pub fn from_knn(knn: KnnResult, filtration: Vec<f64>) -> Result<Self> {
        if filtration.len() != knn.n_points() {
            return Err(StreamError::InvalidInput(format!(
                "{} filtration values for {} vertices",
                filtration.len(),
                knn.n_points()
            )));
        }
        Ok(Self {
            distances: knn.distances,
            indices: knn.indices,
            filtration,
        })
    }

    pub fn n_vertices(&self) -> usize {
        self.indices.nrows()
    }

    pub fn k(&self) -> usize {
        self.indices.ncols()
    }
}

/// Builds the kNN graph through a spatial index
#[derive(Debug, Clone, Copy)]
pub struct NeighborGraphBuilder {
    n_neighbors: usize,
}

impl NeighborGraphBuilder {
    pub fn new(n_neighbors: usize) -> Self {
        Self { n_neighbors }
    }

    /// k actually used for `n` points.
    ///
    /// The requested k is clamped to n - 1; fewer than two points is an error.
    pub fn effective_k(&self, n: usize) -> Result<usize> {
        if n < 2 {
            return Err(StreamError::InsufficientData { available: n, required: 2 });
        }
        if self.n_neighbors == 0 {
            return Err(StreamError::InvalidInput("n_neighbors must be at least 1".to_string()));
        }
        let k = self.n_neighbors.min(n - 1);
        if k < self.n_neighbors {
            warn!(requested = self.n_neighbors, clamped = k, n, "clamping n_neighbors to n - 1");
        }
        Ok(k)
    }

    pub fn build(
        &self,
        points: ArrayView2<'_, f64>,
        index: &dyn SpatialIndex,
        engine: &dyn PersistenceEngine,
    ) -> Result<NeighborGraph> {
        let k = self.effective_k(points.nrows())?;
        let knn = index.knn(points, k)?;
        let filtration = engine.density_filtration(&knn.kth_distances())?;
        debug!(n = points.nrows(), k, index = index.name(), "built kNN graph");
        NeighborGraph::from_knn(knn, filtration)
    }
}
