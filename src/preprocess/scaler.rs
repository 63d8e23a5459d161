//! Per-feature standardization.
//!
//! x' = (x - μ) / σ per column, with population statistics (ddof = 0).
//! A column with σ = 0 is rejected rather than silently rescaled.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};

/// Fitted standardization parameters, kept so results can be mapped
/// back to physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Per-column mean
    pub mean: Vec<f64>,
    /// Per-column standard deviation
    pub scale: Vec<f64>,
}

impl ScalerParams {
    /// Parameters that leave a `dim`-column cloud unchanged
    pub fn identity(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim],
            scale: vec![1.0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Map raw coordinates into the standardized space.
    pub fn transform(&self, points: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_dim(points)?;
        let mean = Array1::from(self.mean.clone());
        let scale = Array1::from(self.scale.clone());
        Ok((points - &mean) / &scale)
    }

    /// Map standardized coordinates back to raw units.
    pub fn inverse_transform(&self, scaled: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_dim(scaled)?;
        let mean = Array1::from(self.mean.clone());
        let scale = Array1::from(self.scale.clone());
        Ok(scaled * &scale + &mean)
    }

    fn check_dim(&self, points: &Array2<f64>) -> Result<()> {
        if points.ncols() != self.dim() {
            return Err(StreamError::InvalidInput(format!(
                "expected {} feature columns, got {}",
                self.dim(),
                points.ncols()
            )));
        }
        Ok(())
    }
}

/// Standard scaler over the columns of a point cloud
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl StandardScaler {
    pub fn new() -> Self {
        Self
    }

    /// Fit per-column mean and population standard deviation.
    ///
    /// Fails with `DegenerateFeature` on the first column whose standard
    /// deviation is zero or non-finite.
    pub fn fit(&self, points: &Array2<f64>) -> Result<ScalerParams> {
        let n = points.nrows();
        if n == 0 {
            return Err(StreamError::InsufficientData { available: 0, required: 1 });
        }

        let mut mean = Vec::with_capacity(points.ncols());
        let mut scale = Vec::with_capacity(points.ncols());

        for (column, values) in points.axis_iter(Axis(1)).enumerate() {
            let mu = values.sum() / n as f64;
            let var = values.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / n as f64;
            let sigma = var.sqrt();

            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(StreamError::DegenerateFeature { column });
            }

            mean.push(mu);
            scale.push(sigma);
        }

        Ok(ScalerParams { mean, scale })
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&self, points: &Array2<f64>) -> Result<(Array2<f64>, ScalerParams)> {
        let params = self.fit(points)?;
        let scaled = params.transform(points)?;
        Ok((scaled, params))
    }
}
