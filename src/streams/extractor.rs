//! Significance thresholding and membership queries.
//!
//! ## Threshold
//!
//! Over the finite lifetimes ℓ of the selected diagram:
//!
//!   τ = mean(ℓ) + σ · std(ℓ)     (population std)
//!
//! unless a fixed threshold is configured. Features with ℓ > τ are kept.
//!
//! ## Members
//!
//! Each kept feature is anchored at its representative vertex: the vertex
//! whose filtration value equals the feature's negated-space birth (-death
//! in canonical terms), lowest index on ties. For H0 that is the peak of
//! the dying component; for H1 the lower-density endpoint of the edge that
//! opened the loop. Members are the points within `death` of that vertex
//! in the scaled cloud. Using the death value as a spatial radius mixes
//! density and distance units; it is kept as the modeling choice of the
//! stream finder.

use tracing::{debug, info};

use super::StreamCandidate;
use crate::config::ExtractionConfig;
use crate::error::{Result, StreamError};
use crate::finder::PersistenceResult;
use crate::spatial::SpatialIndex;

/// mean + sigma · population std of `lifetimes` (0 for an empty slice)
pub fn significance_threshold(lifetimes: &[f64], sigma: f64) -> f64 {
    if lifetimes.is_empty() {
        return 0.0;
    }
    let n = lifetimes.len() as f64;
    let mean = lifetimes.iter().sum::<f64>() / n;
    let variance = lifetimes.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;
    mean + sigma * variance.sqrt()
}

/// Positions of lifetimes strictly above `threshold`
pub fn select_significant(lifetimes: &[f64], threshold: f64) -> Vec<usize> {
    lifetimes
        .iter()
        .enumerate()
        .filter(|&(_, &l)| l > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Vertex whose filtration value equals `raw_birth`.
///
/// Lowest index on ties; if no value matches exactly, the nearest one.
pub fn representative_vertex(vertex_filtration: &[f64], raw_birth: f64) -> Option<usize> {
    if let Some(i) = vertex_filtration.iter().position(|&f| f == raw_birth) {
        return Some(i);
    }
    vertex_filtration
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_finite())
        .min_by(|(i, a), (j, b)| {
            (*a - raw_birth)
                .abs()
                .total_cmp(&(*b - raw_birth).abs())
                .then(i.cmp(j))
        })
        .map(|(i, _)| i)
}

/// Turns a persistence result into ranked stream candidates
#[derive(Debug, Clone, Default)]
pub struct CandidateExtractor {
    config: ExtractionConfig,
}

impl CandidateExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn extract(&self, result: &PersistenceResult, index: &dyn SpatialIndex) -> Result<Vec<StreamCandidate>> {
        let homology_dim = self.config.homology_dim;
        let diagram = result.diagram(homology_dim)?;

        let finite = diagram.finite_pairs();
        if finite.is_empty() {
            debug!(homology_dim, "no finite pairs, no candidates");
            return Ok(Vec::new());
        }

        let lifetimes: Vec<f64> = finite.iter().map(|p| p.persistence()).collect();
        let threshold = match self.config.persistence_threshold {
            Some(t) => t,
            None => significance_threshold(&lifetimes, self.config.sigma_threshold),
        };
        let significant = select_significant(&lifetimes, threshold);
        debug!(
            homology_dim,
            finite = finite.len(),
            threshold,
            significant = significant.len(),
            "applied significance threshold"
        );

        let points = result.point_cloud.view();
        let mut centers = Vec::with_capacity(significant.len());
        for &i in &significant {
            let pair = finite[i];
            let representative = representative_vertex(&result.vertex_filtration, -pair.death).ok_or_else(|| {
                StreamError::InvalidInput("persistence result has no vertex filtration".to_string())
            })?;
            if representative >= points.nrows() {
                return Err(StreamError::InvalidInput(format!(
                    "representative vertex {} outside the {}-point cloud",
                    representative,
                    points.nrows()
                )));
            }
            centers.push((representative, pair.death));
        }

        let members = index.radius_queries(points, &centers)?;
        let mut candidates: Vec<StreamCandidate> = significant
            .iter()
            .zip(centers)
            .zip(members)
            .map(|((&i, (representative, _)), member_indices)| StreamCandidate {
                member_indices,
                persistence: lifetimes[i],
                birth: finite[i].birth,
                death: finite[i].death,
                homology_dim,
                representative,
            })
            .collect();

        candidates.sort_by(|a, b| b.persistence.total_cmp(&a.persistence));
        info!(homology_dim, candidates = candidates.len(), "extracted stream candidates");
        Ok(candidates)
    }
}
