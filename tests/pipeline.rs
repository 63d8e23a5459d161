//! End-to-end runs of the reference pipeline on synthetic clouds.

use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use topo_streams::{
    clean_phase_space, BackendPreference, FinderConfig, PersistenceDiagram, StreamError, StreamFinder,
};

fn gaussian_cluster(rng: &mut StdRng, n: usize, center: [f64; 2]) -> Vec<[f64; 2]> {
    let normal = Normal::new(0.0, 1.0).unwrap();
    (0..n)
        .map(|_| [center[0] + normal.sample(rng), center[1] + normal.sample(rng)])
        .collect()
}

fn to_array(rows: &[[f64; 2]]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), 2), |(i, j)| rows[i][j])
}

fn gaussian_cloud(n: usize, d: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    Array2::from_shape_fn((n, d), |_| normal.sample(&mut rng))
}

fn reference_config(n_neighbors: usize, max_dim: usize, scale: bool) -> FinderConfig {
    let mut config = FinderConfig {
        n_neighbors,
        max_dim,
        scale,
        backend: BackendPreference::Reference,
        ..FinderConfig::default()
    };
    config.extraction.homology_dim = 0;
    config
}

fn field_stars(rng: &mut StdRng, n: usize) -> Vec<[f64; 2]> {
    (0..n)
        .map(|_| [rng.random_range(-5.0..15.0), rng.random_range(-5.0..15.0)])
        .collect()
}

fn max_finite_lifetime(diagram: &PersistenceDiagram) -> f64 {
    diagram.lifetimes().into_iter().fold(0.0, f64::max)
}

#[test]
fn two_clusters_stand_out_against_noise() {
    // Both over-densities sit in a sparse field, so the younger one merges
    // through low-density stars and dies at a finite value.
    let mut rng = StdRng::seed_from_u64(42);
    let mut rows = gaussian_cluster(&mut rng, 30, [0.0, 0.0]);
    rows.extend(gaussian_cluster(&mut rng, 30, [10.0, 10.0]));
    rows.extend(field_stars(&mut rng, 40));
    let clusters = to_array(&rows);
    let noise = to_array(&field_stars(&mut rng, rows.len()));

    let finder = StreamFinder::from_config(reference_config(10, 0, false)).unwrap();
    let two = finder.compute_density_filtration(&clusters).unwrap();
    let single = finder.compute_density_filtration(&noise).unwrap();

    assert_eq!(two.diagrams[0].n_essential(), 1);
    assert_eq!(single.diagrams[0].n_essential(), 1);

    let signal = max_finite_lifetime(&two.diagrams[0]);
    let floor = max_finite_lifetime(&single.diagrams[0]);
    assert!(floor > 0.0);
    assert!(signal > 2.0 * floor, "two-cluster feature {} not above noise {}", signal, floor);
}

#[test]
fn finite_pairs_have_birth_before_death() {
    let points = gaussian_cloud(80, 3, 7);
    let finder = StreamFinder::from_config(reference_config(10, 1, true)).unwrap();
    let result = finder.compute_density_filtration(&points).unwrap();

    assert_eq!(result.diagrams.len(), 2);
    for diagram in &result.diagrams {
        for pair in diagram.finite_pairs() {
            assert!(pair.birth <= pair.death, "{:?}", pair);
            assert!(pair.birth > 0.0);
        }
    }
}

#[test]
fn scaled_cloud_is_standardized() {
    let points = gaussian_cloud(100, 3, 3).mapv(|v| 5.0 * v + 20.0);
    let finder = StreamFinder::from_config(reference_config(10, 0, true)).unwrap();
    let result = finder.compute_density_filtration(&points).unwrap();

    for column in result.point_cloud.columns() {
        let mean = column.mean().unwrap();
        let var = column.mapv(|v| (v - mean).powi(2)).mean().unwrap();
        assert!(mean.abs() < 1e-10);
        assert!((var - 1.0).abs() < 1e-10);
    }
    let restored = result.scaler.inverse_transform(&result.point_cloud).unwrap();
    for (a, b) in restored.iter().zip(points.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn runs_are_deterministic() {
    let points = gaussian_cloud(120, 5, 11);
    let mut config = reference_config(12, 1, true);
    config.extraction.sigma_threshold = 1.0;
    let finder = StreamFinder::from_config(config).unwrap();

    let a = finder.run(&points).unwrap();
    let b = finder.run(&points).unwrap();
    assert_eq!(a.result.diagrams, b.result.diagrams);
    assert_eq!(a.result.vertex_filtration, b.result.vertex_filtration);
    assert_eq!(a.candidates, b.candidates);
}

#[test]
fn candidates_are_ranked_and_thin_out_with_sigma() {
    let points = gaussian_cloud(150, 2, 5);
    let mut previous = usize::MAX;
    for sigma in [0.0, 0.5, 1.0, 2.0, 4.0] {
        let mut config = reference_config(8, 0, false);
        config.extraction.sigma_threshold = sigma;
        let report = StreamFinder::from_config(config).unwrap().run(&points).unwrap();

        for pair in report.candidates.windows(2) {
            assert!(pair[0].persistence >= pair[1].persistence);
        }
        for c in &report.candidates {
            assert!(c.member_indices.windows(2).all(|w| w[0] < w[1]));
            assert!(c.member_indices.contains(&c.representative));
        }
        assert!(report.n_candidates() <= previous);
        previous = report.n_candidates();
    }
}

#[test]
fn huge_explicit_threshold_yields_no_candidates() {
    let points = gaussian_cloud(50, 3, 42);
    let mut config = reference_config(10, 0, true);
    config.extraction.persistence_threshold = Some(999.0);
    let report = StreamFinder::from_config(config).unwrap().run(&points).unwrap();
    assert!(report.candidates.is_empty());
    assert_eq!(report.candidates_json().unwrap().trim(), "[]");
}

#[test]
fn requesting_uncomputed_dimension_fails() {
    let points = gaussian_cloud(40, 2, 1);
    let mut config = reference_config(6, 1, true);
    config.extraction.homology_dim = 1;
    let finder = StreamFinder::from_config(config).unwrap();
    let mut result = finder.compute_density_filtration(&points).unwrap();
    result.diagrams.truncate(1);

    let err = finder.extract_candidates(&result).unwrap_err();
    assert!(matches!(err, StreamError::InvalidHomologyDimension { requested: 1, .. }));
}

#[test]
fn constant_column_is_degenerate() {
    let points = array![[0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [3.0, 1.0]];
    let finder = StreamFinder::from_config(reference_config(2, 0, true)).unwrap();
    assert!(matches!(
        finder.compute_density_filtration(&points),
        Err(StreamError::DegenerateFeature { column: 1 })
    ));
}

#[test]
fn oversized_k_is_clamped() {
    let points = gaussian_cloud(10, 2, 9);
    let finder = StreamFinder::from_config(reference_config(32, 1, true)).unwrap();
    let result = finder.compute_density_filtration(&points).unwrap();
    assert_eq!(result.k, 9);
}

#[test]
fn cleaned_rows_map_back_to_catalog() {
    let mut raw = gaussian_cloud(30, 5, 2);
    raw[[3, 1]] = f64::NAN;
    raw[[17, 4]] = f64::INFINITY;

    let (clean, clean_indices) = clean_phase_space(&raw);
    assert_eq!(clean.nrows(), 28);

    let mut config = reference_config(6, 0, true);
    config.extraction.persistence_threshold = Some(0.0);
    let report = StreamFinder::from_config(config).unwrap().run(&clean).unwrap();
    for c in &report.candidates {
        let original = c.original_indices(&clean_indices).unwrap();
        assert!(!original.contains(&3));
        assert!(!original.contains(&17));
    }
}
