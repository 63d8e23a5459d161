//! # topo-streams
//!
//! Stellar Stream Detection via Density-Filtration Persistent Homology
//!
//! ## Theoretical Framework
//!
//! Tidal streams are thin, kinematically coherent over-densities in the
//! five-dimensional astrometric phase space (ra, dec, pmra, pmdec,
//! parallax). Against a smooth field population they appear as regions of
//! elevated local density that stay connected over a wide range of
//! density levels.
//!
//! ### Methodology
//!
//! 1. **Density Filtration**: kNN density ρ(x) = 1 / d_k(x), swept from
//!    high to low density (sublevel sets of f = -ρ)
//!
//! 2. **Persistent Homology**: H0 (components) by union-find with the
//!    elder rule, H1 (loops) by boundary-matrix reduction over Z/2
//!
//! 3. **Candidate Extraction**: features whose lifetime exceeds
//!    mean + σ·std of the diagram become stream candidates; members are
//!    found by a radius query around the feature's peak vertex
//!
//! ## Backends
//!
//! Spatial queries and persistence run either in-process (kd-tree,
//! reference engine) or through the accelerator kernels of
//! `libtopostreams` (feature `cuda`). The choice is made once per
//! [`StreamFinder`] and both backends produce the same diagrams.
//!
//! ## References
//!
//! - Edelsbrunner & Harer, "Computational Topology" (2010)
//! - Chazal, Guibas, Oudot, Skraba, "Persistence-Based Clustering in
//!   Riemannian Manifolds", J. ACM 60 (2013)
//!
//! ## Author
//!
//! Francisco Molina-Burgos

pub mod accelerator;
pub mod config;
pub mod error;
pub mod finder;
pub mod preprocess;
pub mod spatial;
pub mod streams;
pub mod topology;

pub use error::{Result, StreamError};

pub use config::{BackendPreference, ExtractionConfig, FinderConfig};

pub use finder::{PersistenceResult, StreamFinder, StreamReport};

// Re-exports from accelerator
pub use accelerator::{Accelerator, AcceleratorKernels, HostKernels, KernelStatus};

// Re-exports from preprocess
pub use preprocess::{clean_phase_space, ScalerParams, StandardScaler, PHASE_SPACE_COLUMNS};

// Re-exports from spatial
pub use spatial::{AcceleratedIndex, KdTreeIndex, KnnResult, SpatialIndex};

// Re-exports from topology
pub use topology::{
    // Graph and complex
    NeighborGraph,
    NeighborGraphBuilder,
    SimplicialComplex,
    SimplicialComplexBuilder,
    // Persistence
    AcceleratedEngine,
    PersistenceEngine,
    ReferenceEngine,
    // Diagrams
    PersistenceDiagram,
    PersistencePair,
    RawDiagram,
    to_canonical,
};

// Re-exports from streams
pub use streams::{serialize_candidates, CandidateExtractor, CandidateSummary, StreamCandidate};
