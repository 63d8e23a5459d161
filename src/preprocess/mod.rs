//! Preprocessing Module: Phase-Space Point Clouds
//!
//! Prepares astrometric rows for the topology engine:
//! - Row cleaning (drop rows with non-finite coordinates)
//! - Per-feature standardization (zero mean, unit variance)
//!
//! ## Why Standardize
//!
//! Phase-space coordinates mix units (degrees, mas/yr, mas). Without
//! standardization the Euclidean kNN density would be dominated by the
//! column with the largest numeric range.

mod phase_space;
mod scaler;

pub use phase_space::{clean_phase_space, PHASE_SPACE_COLUMNS};
pub use scaler::{ScalerParams, StandardScaler};
