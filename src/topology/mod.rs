//! Topology Module: Density Filtration and Persistent Homology
//!
//! Implements the topology engine of the stream finder:
//! - kNN graph and density filtration
//! - Simplicial complex assembly (edges, triangles)
//! - Persistent homology in dimensions 0 and 1
//! - Conversion to canonical (birth ≤ death) diagrams
//!
//! ## Mathematical Background
//!
//! For a point cloud X we estimate the local density ρ(x) = 1 / d_k(x),
//! where d_k is the distance to the k-th nearest neighbor. Streams are
//! over-densities, so the natural filtration is the *superlevel* set
//! {x : ρ(x) ≥ t} swept from high to low density. The reduction works on
//! *sublevel* sets, so every vertex carries f(x) = -ρ(x) and every edge or
//! triangle carries the max over its vertices:
//!
//!   f(σ) = max_{v ∈ σ} f(v)
//!
//! This makes the filtration monotone (faces never exceed their cofaces).
//! `diagram::to_canonical` undoes the negation afterwards.
//!
//! ## Two Engines
//!
//! - `ReferenceEngine`: union-find for H0, Z/2 column reduction for H1
//! - `AcceleratedEngine`: the accelerator kernels, plus a host pass for
//!   components that never merge

mod complex;
mod diagram;
mod neighbor_graph;
mod persistence;

pub use complex::{build_edges, find_triangles, Edge, SimplicialComplex, SimplicialComplexBuilder, Triangle};
pub use diagram::{lifetimes, to_canonical, PersistenceDiagram, PersistencePair, RawDiagram};
pub use neighbor_graph::{density_filtration, NeighborGraph, NeighborGraphBuilder, DENSITY_EPSILON};
pub use persistence::{AcceleratedEngine, PersistenceEngine, ReferenceEngine};

pub(crate) use persistence::MAX_HOMOLOGY_DIM;
