//! Stream Finder: the full pipeline.
//!
//! ```text
//! raw cloud → scale → kNN graph + density → complex → persistence
//!           → canonical diagrams → candidates
//! ```
//!
//! The spatial index and persistence engine are chosen once, when the
//! finder is built, and used for every stage of every run.

use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::accelerator::Accelerator;
use crate::config::{BackendPreference, FinderConfig};
use crate::error::{Result, StreamError};
use crate::preprocess::{ScalerParams, StandardScaler};
use crate::spatial::{AcceleratedIndex, KdTreeIndex, SpatialIndex};
use crate::streams::{serialize_candidates, CandidateExtractor, StreamCandidate};
use crate::topology::{
    to_canonical, AcceleratedEngine, NeighborGraphBuilder, PersistenceDiagram, PersistenceEngine, ReferenceEngine,
    SimplicialComplexBuilder,
};

/// Output of the topology stages
#[derive(Debug, Clone)]
pub struct PersistenceResult {
    /// Canonical diagrams, index = homology dimension
    pub diagrams: Vec<PersistenceDiagram>,
    /// The cloud the graph was built on (scaled if scaling is on)
    pub point_cloud: Array2<f64>,
    /// Maps `point_cloud` back to input units
    pub scaler: ScalerParams,
    /// f(v) = -ρ(v) per point
    pub vertex_filtration: Vec<f64>,
    /// Effective number of neighbors
    pub k: usize,
    /// Engine that produced the diagrams
    pub backend: String,
}

impl PersistenceResult {
    /// Highest computed dimension, if any
    pub fn max_dim(&self) -> Option<usize> {
        self.diagrams.len().checked_sub(1)
    }

    pub fn diagram(&self, dim: usize) -> Result<&PersistenceDiagram> {
        self.diagrams.get(dim).ok_or(StreamError::InvalidHomologyDimension {
            requested: dim,
            max_computed: self.max_dim(),
        })
    }
}

/// Diagrams plus ranked candidates of one run
#[derive(Debug, Clone)]
pub struct StreamReport {
    pub result: PersistenceResult,
    pub candidates: Vec<StreamCandidate>,
}

impl StreamReport {
    pub fn n_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Candidate summaries as JSON
    pub fn candidates_json(&self) -> Result<String> {
        serialize_candidates(&self.candidates)
    }
}

/// Configured pipeline with its backends injected
pub struct StreamFinder {
    config: FinderConfig,
    spatial: Box<dyn SpatialIndex>,
    engine: Box<dyn PersistenceEngine>,
}

impl std::fmt::Debug for StreamFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamFinder")
            .field("config", &self.config)
            .field("spatial", &self.spatial.name())
            .field("engine", &self.engine.name())
            .finish()
    }
}

fn reference_backends() -> (Box<dyn SpatialIndex>, Box<dyn PersistenceEngine>) {
    (Box::new(KdTreeIndex::new()), Box::new(ReferenceEngine::new()))
}

fn accelerated_backends(accelerator: Accelerator) -> (Box<dyn SpatialIndex>, Box<dyn PersistenceEngine>) {
    (
        Box::new(AcceleratedIndex::new(accelerator.clone())),
        Box::new(AcceleratedEngine::new(accelerator)),
    )
}

impl StreamFinder {
    /// Resolve the backend preference and build the finder.
    ///
    /// `Auto` falls back to the reference backend when no device answers;
    /// `Accelerator` fails instead.
    pub fn from_config(config: FinderConfig) -> Result<Self> {
        let (spatial, engine) = match config.backend {
            BackendPreference::Reference => reference_backends(),
            BackendPreference::Accelerator => accelerated_backends(Accelerator::probe()?),
            BackendPreference::Auto => match Accelerator::probe() {
                Ok(accelerator) => accelerated_backends(accelerator),
                Err(e) => {
                    warn!(error = %e, "accelerator unavailable, using reference backend");
                    reference_backends()
                }
            },
        };
        Self::with_backends(config, spatial, engine)
    }

    /// Use an explicit accelerator handle for both backends.
    pub fn with_accelerator(config: FinderConfig, accelerator: Accelerator) -> Result<Self> {
        let (spatial, engine) = accelerated_backends(accelerator);
        Self::with_backends(config, spatial, engine)
    }

    /// Inject arbitrary backends.
    pub fn with_backends(
        config: FinderConfig,
        spatial: Box<dyn SpatialIndex>,
        engine: Box<dyn PersistenceEngine>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            spatial = spatial.name(),
            engine = engine.name(),
            n_neighbors = config.n_neighbors,
            max_dim = config.max_dim,
            "stream finder ready"
        );
        Ok(Self { config, spatial, engine })
    }

    /// Finder on the kd-tree and reference engine, whatever `config.backend` says.
    pub fn reference(config: FinderConfig) -> Result<Self> {
        let (spatial, engine) = reference_backends();
        Self::with_backends(config, spatial, engine)
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Name of the persistence engine in use
    pub fn backend(&self) -> &'static str {
        self.engine.name()
    }

    /// Scale, build the density filtration and compute its diagrams.
    pub fn compute_density_filtration(&self, points: &Array2<f64>) -> Result<PersistenceResult> {
        let (n, d) = points.dim();
        if n < 2 {
            return Err(StreamError::InsufficientData { available: n, required: 2 });
        }
        if let Some(pos) = points.iter().position(|v| !v.is_finite()) {
            return Err(StreamError::InvalidInput(format!(
                "non-finite coordinate at row {}, clean the cloud first",
                pos / d.max(1)
            )));
        }

        let (cloud, scaler) = if self.config.scale {
            StandardScaler::new().fit_transform(points)?
        } else {
            (points.clone(), ScalerParams::identity(d))
        };
        info!(n, d, scale = self.config.scale, backend = self.backend(), "computing density filtration");

        let graph = NeighborGraphBuilder::new(self.config.n_neighbors).build(
            cloud.view(),
            self.spatial.as_ref(),
            self.engine.as_ref(),
        )?;
        let k = graph.k();
        let complex = SimplicialComplexBuilder::new(self.config.max_dim).build(&graph);
        let raw = self.engine.compute(&complex, self.config.max_dim)?;
        let diagrams: Vec<PersistenceDiagram> = raw.iter().map(to_canonical).collect();

        for diagram in &diagrams {
            debug!(
                dimension = diagram.dimension,
                pairs = diagram.len(),
                essential = diagram.n_essential(),
                max_persistence = diagram.max_persistence(),
                "canonical diagram"
            );
        }

        Ok(PersistenceResult {
            diagrams,
            point_cloud: cloud,
            scaler,
            vertex_filtration: graph.filtration,
            k,
            backend: self.engine.name().to_string(),
        })
    }

    /// Ranked candidates from a result, using this finder's spatial index.
    pub fn extract_candidates(&self, result: &PersistenceResult) -> Result<Vec<StreamCandidate>> {
        CandidateExtractor::new(self.config.extraction.clone()).extract(result, self.spatial.as_ref())
    }

    pub fn run(&self, points: &Array2<f64>) -> Result<StreamReport> {
        let result = self.compute_density_filtration(points)?;
        let candidates = self.extract_candidates(&result)?;
        Ok(StreamReport { result, candidates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn reference_config(n_neighbors: usize) -> FinderConfig {
        FinderConfig {
            n_neighbors,
            backend: BackendPreference::Reference,
            ..FinderConfig::default()
        }
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let finder = StreamFinder::from_config(reference_config(4)).unwrap();
        let err = finder.compute_density_filtration(&array![[1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, StreamError::InsufficientData { available: 1, .. }));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let finder = StreamFinder::from_config(reference_config(1)).unwrap();
        let points = array![[0.0, 0.0], [1.0, f64::NAN], [2.0, 0.0]];
        assert!(matches!(
            finder.compute_density_filtration(&points),
            Err(StreamError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_square_unit_cloud() {
        let mut config = reference_config(2);
        config.scale = false;
        let finder = StreamFinder::from_config(config).unwrap();
        let points = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let result = finder.compute_density_filtration(&points).unwrap();

        assert_eq!(result.k, 2);
        assert_eq!(result.diagrams.len(), 2);
        assert!(result.vertex_filtration.iter().all(|&f| f == -1.0));
        assert_eq!(result.backend, "reference");
        assert_eq!(result.scaler, ScalerParams::identity(2));
    }

    #[test]
    fn test_auto_without_device_falls_back() {
        let finder = StreamFinder::from_config(FinderConfig::default()).unwrap();
        if !cfg!(feature = "cuda") {
            assert_eq!(finder.backend(), "reference");
        }
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_explicit_accelerator_without_device_fails() {
        let config = FinderConfig {
            backend: BackendPreference::Accelerator,
            ..FinderConfig::default()
        };
        assert!(matches!(
            StreamFinder::from_config(config),
            Err(StreamError::AcceleratorUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_dimension_in_result() {
        let mut config = reference_config(2);
        config.max_dim = 0;
        let finder = StreamFinder::from_config(config).unwrap();
        let points = array![[0.0, 0.0], [1.0, 0.0], [0.0, 2.0], [3.0, 1.0]];
        let result = finder.compute_density_filtration(&points).unwrap();

        assert_eq!(result.max_dim(), Some(0));
        assert!(matches!(
            result.diagram(1),
            Err(StreamError::InvalidHomologyDimension { requested: 1, max_computed: Some(0) })
        ));
    }

    #[test]
    fn test_uncomputed_dimension_rejected_at_construction() {
        let mut config = reference_config(4);
        config.max_dim = 0;
        config.extraction.homology_dim = 1;
        assert!(matches!(
            StreamFinder::from_config(config),
            Err(StreamError::InvalidHomologyDimension { requested: 1, max_computed: Some(0) })
        ));

        let mut config = reference_config(4);
        config.max_dim = 2;
        assert!(matches!(
            StreamFinder::from_config(config),
            Err(StreamError::InvalidHomologyDimension { requested: 2, max_computed: Some(1) })
        ));
    }
}
