//! Reference and accelerator backends must hand back the same diagrams and
//! candidate membership. The accelerator side runs on the host kernels,
//! whose kNN, radius and reduction code is separate from the in-process
//! kd-tree and engine.

use std::sync::Arc;

use approx::assert_relative_eq;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use topo_streams::{
    AcceleratedIndex, Accelerator, FinderConfig, HostKernels, KdTreeIndex, SpatialIndex, StreamFinder, StreamReport,
};

fn gaussian_cloud(n: usize, d: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    Array2::from_shape_fn((n, d), |_| normal.sample(&mut rng))
}

fn host_accelerator() -> Accelerator {
    Accelerator::with_kernels(Arc::new(HostKernels::new()))
}

fn run_both(config: FinderConfig, points: &Array2<f64>) -> (StreamReport, StreamReport) {
    let reference = StreamFinder::reference(config.clone()).unwrap();
    let accelerated = StreamFinder::with_accelerator(config, host_accelerator()).unwrap();
    assert_eq!(reference.backend(), "reference");
    assert_eq!(accelerated.backend(), "accelerator");
    (reference.run(points).unwrap(), accelerated.run(points).unwrap())
}

fn assert_equivalent(a: &StreamReport, b: &StreamReport) {
    assert_eq!(a.result.diagrams.len(), b.result.diagrams.len());
    assert_eq!(a.result.k, b.result.k);
    for (x, y) in a.result.vertex_filtration.iter().zip(&b.result.vertex_filtration) {
        assert_relative_eq!(*x, *y, max_relative = 1e-10);
    }

    for (da, db) in a.result.diagrams.iter().zip(&b.result.diagrams) {
        assert_eq!(da.dimension, db.dimension);
        assert_eq!(da.len(), db.len(), "H{} row count", da.dimension);
        assert_eq!(da.n_essential(), db.n_essential(), "H{} essential count", da.dimension);
        for (x, y) in da.pairs.iter().zip(&db.pairs) {
            // Infinite births compare equal before the relative check
            assert_relative_eq!(x.birth, y.birth, max_relative = 1e-10);
            assert_relative_eq!(x.death, y.death, max_relative = 1e-10);
        }
    }

    assert_eq!(a.candidates.len(), b.candidates.len());
    for (x, y) in a.candidates.iter().zip(&b.candidates) {
        assert_eq!(x.member_indices, y.member_indices);
        assert_eq!(x.representative, y.representative);
        assert_relative_eq!(x.persistence, y.persistence, max_relative = 1e-10);
    }
}

#[test]
fn h0_candidates_agree() {
    let points = gaussian_cloud(200, 5, 17);
    let mut config = FinderConfig::default();
    config.n_neighbors = 12;
    config.max_dim = 0;
    config.extraction.sigma_threshold = 1.0;

    let (a, b) = run_both(config, &points);
    assert_equivalent(&a, &b);
}

#[test]
fn h1_diagrams_agree() {
    let points = gaussian_cloud(150, 3, 23);
    let mut config = FinderConfig::default();
    config.n_neighbors = 10;
    config.max_dim = 1;
    config.extraction.homology_dim = 1;
    config.extraction.sigma_threshold = 0.5;

    let (a, b) = run_both(config, &points);
    assert_equivalent(&a, &b);
}

#[test]
fn unscaled_ring_agrees() {
    let n = 90;
    let points = Array2::from_shape_fn((n, 2), |(i, j)| {
        let theta = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
        let r = 5.0 + 0.3 * ((7 * i) % 5) as f64;
        if j == 0 { r * theta.cos() } else { r * theta.sin() }
    });
    let mut config = FinderConfig::default();
    config.n_neighbors = 6;
    config.scale = false;
    config.extraction.persistence_threshold = Some(0.0);

    let (a, b) = run_both(config, &points);
    assert_equivalent(&a, &b);
}

#[test]
fn disconnected_clusters_report_same_components() {
    // k = 5 cannot bridge the gap, so both clusters stay essential
    // Two jittered 5 x 4 grids, 50 apart
    let points = Array2::from_shape_fn((40, 2), |(i, j)| {
        let offset = if i < 20 { 0.0 } else { 50.0 };
        let c = i % 20;
        if j == 0 {
            offset + (c % 5) as f64 + 0.01 * ((c * 7) % 3) as f64
        } else {
            offset + (c / 5) as f64 + 0.01 * ((c * 5) % 4) as f64
        }
    });
    let mut config = FinderConfig::default();
    config.n_neighbors = 5;
    config.scale = false;

    let (a, b) = run_both(config, &points);
    assert_eq!(a.result.diagrams[0].n_essential(), 2);
    assert_eq!(a.result.diagrams, b.result.diagrams);
    assert_equivalent(&a, &b);
}

#[test]
fn spatial_backends_agree() {
    let points = gaussian_cloud(300, 4, 31);
    let kd = KdTreeIndex::new();
    let acc = AcceleratedIndex::new(host_accelerator());

    let a = kd.knn(points.view(), 7).unwrap();
    let b = acc.knn(points.view(), 7).unwrap();
    assert_eq!(a.indices, b.indices);
    for (x, y) in a.distances.iter().zip(b.distances.iter()) {
        assert_relative_eq!(*x, *y, max_relative = 1e-10);
    }

    for (q, radius) in [(0usize, 0.5), (10, 1.0), (299, 2.5)] {
        let query = points.row(q);
        assert_eq!(
            kd.radius_query(points.view(), query, radius).unwrap(),
            acc.radius_query(points.view(), query, radius).unwrap()
        );
    }
}

#[test]
fn concurrent_runs_share_one_device() {
    let accelerator = host_accelerator();
    let points = gaussian_cloud(120, 3, 5);
    let mut config = FinderConfig::default();
    config.n_neighbors = 8;

    let expected = StreamFinder::with_accelerator(config.clone(), accelerator.clone())
        .unwrap()
        .run(&points)
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let finder = StreamFinder::with_accelerator(config.clone(), accelerator.clone()).unwrap();
            let points = points.clone();
            std::thread::spawn(move || finder.run(&points).unwrap())
        })
        .collect();

    for handle in handles {
        let report = handle.join().unwrap();
        assert_eq!(report.result.diagrams, expected.result.diagrams);
        assert_eq!(report.candidates, expected.candidates);
    }
}
