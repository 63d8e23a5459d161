//! Phase-space row cleaning.

use ndarray::{Array2, Axis};

/// Catalog columns used to build phase-space coordinates, in column order.
pub const PHASE_SPACE_COLUMNS: [&str; 5] = ["ra", "dec", "pmra", "pmdec", "parallax"];

/// Drop rows containing any non-finite value.
///
/// Returns the cleaned matrix together with `clean_indices`, where
/// `clean_indices[r]` is the row of `raw` that became cleaned row `r`.
/// Keeping that mapping is the caller's job; the topology engine only
/// ever sees cleaned rows.
pub fn clean_phase_space(raw: &Array2<f64>) -> (Array2<f64>, Vec<usize>) {
    let clean_indices: Vec<usize> = raw
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| row.iter().all(|v| v.is_finite()))
        .map(|(i, _)| i)
        .collect();

    let cleaned = raw.select(Axis(0), &clean_indices);
    (cleaned, clean_indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_drops_non_finite_rows() {
        let raw = array![
            [1.0, 2.0],
            [f64::NAN, 0.0],
            [3.0, 4.0],
            [5.0, f64::INFINITY]
        ];

        let (cleaned, idx) = clean_phase_space(&raw);

        assert_eq!(idx, vec![0, 2]);
        assert_eq!(cleaned, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_all_rows_clean() {
        let raw = array![[0.0, 1.0, 2.0, 3.0, 4.0]];
        let (cleaned, idx) = clean_phase_space(&raw);
        assert_eq!(idx, vec![0]);
        assert_eq!(cleaned.ncols(), PHASE_SPACE_COLUMNS.len());
    }
}
