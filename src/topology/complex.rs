//! Simplicial Complex from the kNN Graph
//!
//! - 0-simplices: every point, f(v) = -ρ(v)
//! - 1-simplices: every kNN pair {i, j}, stored once as (min, max)
//! - 2-simplices: triples i < j < c with j ∈ N(i) and c ∈ N(i) ∩ N(j)
//!
//! Each simplex takes the max filtration of its vertices. The i < j < c
//! constraint enumerates every triangle exactly once; the cost is
//! O(n·k²), fine for k in the tens.

use std::collections::{BTreeSet, HashSet};

use ndarray::Array2;
use tracing::debug;

use super::NeighborGraph;

/// Edge with i < j
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub u: usize,
    pub v: usize,
    pub filtration: f64,
}

/// Triangle with sorted vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [usize; 3],
    pub filtration: f64,
}

/// Filtered complex in insertion order (the stable tie-break)
#[derive(Debug, Clone)]
pub struct SimplicialComplex {
    pub vertex_filtration: Vec<f64>,
    pub edges: Vec<Edge>,
    pub triangles: Vec<Triangle>,
}

impl SimplicialComplex {
    pub fn n_vertices(&self) -> usize {
        self.vertex_filtration.len()
    }

    /// Total number of simplices
    pub fn size(&self) -> usize {
        self.vertex_filtration.len() + self.edges.len() + self.triangles.len()
    }
}

/// Deduplicated edge list from kNN indices.
///
/// Edges appear in the order first encountered scanning vertex by vertex,
/// neighbor list by neighbor list.
pub fn build_edges(indices: &Array2<usize>, filtration: &[f64]) -> Vec<Edge> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut edges = Vec::new();

    for (i, row) in indices.outer_iter().enumerate() {
        for &j in row {
            if i == j {
                continue;
            }
            let key = (i.min(j), i.max(j));
            if seen.insert(key) {
                edges.push(Edge {
                    u: key.0,
                    v: key.1,
                    filtration: filtration[i].max(filtration[j]),
                });
            }
        }
    }

    edges
}

/// Triangles of the kNN graph.
pub fn find_triangles(indices: &Array2<usize>, filtration: &[f64]) -> Vec<Triangle> {
    let neighbor_sets: Vec<BTreeSet<usize>> = indices
        .outer_iter()
        .map(|row| row.iter().copied().collect())
        .collect();

    let mut triangles = Vec::new();
    for (i, ni) in neighbor_sets.iter().enumerate() {
        for &j in ni.range(i + 1..) {
            for &c in ni.intersection(&neighbor_sets[j]) {
                if c <= j {
                    continue;
                }
                triangles.push(Triangle {
                    vertices: [i, j, c],
                    filtration: filtration[i].max(filtration[j]).max(filtration[c]),
                });
            }
        }
    }

    triangles
}

/// Assembles the filtered complex from a kNN graph
#[derive(Debug, Clone, Copy)]
pub struct SimplicialComplexBuilder {
    with_triangles: bool,
}

impl SimplicialComplexBuilder {
    /// Triangles are only needed when H1 is requested (`max_dim >= 1`).
    pub fn new(max_dim: usize) -> Self {
        Self { with_triangles: max_dim >= 1 }
    }

    pub fn build(&self, graph: &NeighborGraph) -> SimplicialComplex {
        let edges = build_edges(&graph.indices, &graph.filtration);
        let triangles = if self.with_triangles {
            find_triangles(&graph.indices, &graph.filtration)
        } else {
            Vec::new()
        };

        debug!(
            vertices = graph.n_vertices(),
            edges = edges.len(),
            triangles = triangles.len(),
            "assembled simplicial complex"
        );

        SimplicialComplex {
            vertex_filtration: graph.filtration.clone(),
            edges,
            triangles,
        }
    }
}
