//! Two-Cluster Recovery: Density Filtration on a Synthetic Field
//!
//! Two Gaussian over-densities embedded in a uniform background, the
//! simplest stand-in for a stream crossing a field population.
//!
//! ## Protocol
//!
//! 1. Sample two 30-point clusters at (0,0) and (10,10) plus 40 field stars
//! 2. Build the kNN density filtration (no standardization)
//! 3. Compute H0/H1 persistence with the reference backend
//! 4. Report the most persistent components and the extracted candidates

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use topo_streams::streams::representative_vertex;
use topo_streams::{BackendPreference, FinderConfig, Result, StreamError, StreamFinder};

fn synthetic_field(seed: u64) -> Result<Array2<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| StreamError::InvalidInput(e.to_string()))?;

    let mut rows: Vec<[f64; 2]> = Vec::new();
    for center in [[0.0, 0.0], [10.0, 10.0]] {
        for _ in 0..30 {
            rows.push([
                center[0] + normal.sample(&mut rng),
                center[1] + normal.sample(&mut rng),
            ]);
        }
    }
    for _ in 0..40 {
        rows.push([rng.random_range(-5.0..15.0), rng.random_range(-5.0..15.0)]);
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), 2), flat).map_err(|e| StreamError::InvalidInput(e.to_string()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("═══════════════════════════════════════════════════════════════");
    println!("  Density-Filtration Persistence: Two-Cluster Recovery");
    println!("  Francisco Molina-Burgos");
    println!("═══════════════════════════════════════════════════════════════\n");

    let mut config = FinderConfig::from_env()?;
    config.scale = false;
    config.backend = BackendPreference::Reference;
    config.n_neighbors = config.n_neighbors.min(8);
    config.extraction.sigma_threshold = 2.0;

    let points = synthetic_field(42)?;
    println!("Field Parameters:");
    println!("  N = {} stars (2 × 30 cluster + 40 field)", points.nrows());
    println!("  k = {}", config.n_neighbors);
    println!("  σ threshold = {:.1}", config.extraction.sigma_threshold);
    println!();

    let finder = StreamFinder::from_config(config)?;
    let report = finder.run(&points)?;

    println!("Persistence Diagrams:");
    for diagram in &report.result.diagrams {
        println!(
            "  H{}: {} pairs ({} essential), max finite lifetime = {:.4}",
            diagram.dimension,
            diagram.len(),
            diagram.n_essential(),
            diagram.max_persistence()
        );
    }

    let h0 = report.result.diagram(0)?;
    let mut components: Vec<(f64, usize)> = h0
        .pairs
        .iter()
        .filter(|p| !p.birth.is_finite())
        .filter_map(|p| representative_vertex(&report.result.vertex_filtration, -p.death).map(|v| (p.death, v)))
        .collect();
    components.sort_by(|a, b| b.0.total_cmp(&a.0));

    println!("\nSurviving Components (peak density, peak position):");
    for (density, peak) in &components {
        let row = report.result.point_cloud.row(*peak);
        println!("  ρ = {:8.4} at ({:6.2}, {:6.2})", density, row[0], row[1]);
    }

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  Stream Candidates");
    println!("═══════════════════════════════════════════════════════════════\n");

    if report.candidates.is_empty() {
        println!("No finite feature above threshold.");
    } else {
        println!("Rank  H   birth      death      lifetime   members");
        println!("------|---|----------|----------|----------|--------");
        for (rank, c) in report.candidates.iter().enumerate() {
            println!(
                "{:4}  {}   {:8.4}   {:8.4}   {:8.4}   {:5}",
                rank + 1,
                c.homology_dim,
                c.birth,
                c.death,
                c.persistence,
                c.n_members()
            );
        }
    }

    println!("\nJSON summary:");
    println!("{}", report.candidates_json()?);

    if components.len() >= 2 {
        println!("\n✓ Both over-densities survive as separate components");
    } else if !report.candidates.is_empty() {
        println!("\n✓ Over-densities joined through the field, recovered as finite H0 features");
    } else {
        println!("\n⚠ No over-density stands out at this threshold");
    }

    Ok(())
}
