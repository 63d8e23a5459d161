//! Accelerator-backed spatial index

use ndarray::{ArrayView1, ArrayView2};

use super::{validate_knn, validate_radius_query, KnnResult, SpatialIndex};
use crate::accelerator::Accelerator;
use crate::error::Result;

/// Spatial index that forwards every query to the accelerator kernels.
#[derive(Clone)]
pub struct AcceleratedIndex {
    accelerator: Accelerator,
}

impl AcceleratedIndex {
    pub fn new(accelerator: Accelerator) -> Self {
        Self { accelerator }
    }
}

impl SpatialIndex for AcceleratedIndex {
    fn name(&self) -> &'static str {
        "accelerator"
    }

    fn knn(&self, points: ArrayView2<'_, f64>, k: usize) -> Result<KnnResult> {
        validate_knn(points.nrows(), k)?;
        self.accelerator.knn(points, k)
    }

    fn radius_query(
        &self,
        points: ArrayView2<'_, f64>,
        query: ArrayView1<'_, f64>,
        radius: f64,
    ) -> Result<Vec<usize>> {
        validate_radius_query(points, query, radius)?;
        if points.nrows() == 0 || radius < 0.0 {
            return Ok(Vec::new());
        }
        let mut hits = self.accelerator.radius_query(points, query, radius)?;
        hits.sort_unstable();
        hits.dedup();
        Ok(hits)
    }
}
