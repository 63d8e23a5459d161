//! Persistent Homology of the Density Filtration
//!
//! ## Simplex Order
//!
//! Simplices are processed by increasing filtration value, ties broken by
//! dimension (vertices, then edges, then triangles) and then by insertion
//! order. Stable sorts on `total_cmp` give exactly this order.
//!
//! ## H0: Union-Find with the Elder Rule
//!
//! Every vertex starts its own component. An edge joining two components
//! kills the younger one (later in vertex order) and records
//! (birth of the younger component, edge value). Components still alive
//! at the end are essential: (birth, +∞). Both engines report them; the
//! accelerated engine recovers them with a host-side connectivity pass.
//!
//! ## H1: Boundary-Matrix Reduction over Z/2
//!
//! Rows are edges in filtration order, columns are triangles in filtration
//! order; each column holds the three boundary edges. Columns are reduced
//! left to right against the pivot table (low → column). A reduced nonzero
//! column pairs its pivot edge with the triangle. Cycles never filled by a
//! triangle are not reported; only finite pairs enter the H1 diagram.
//!
//! ## Reference
//!
//! Edelsbrunner, Letscher, Zomorodian (2002). "Topological Persistence
//! and Simplification". Discrete & Computational Geometry.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{density_filtration, Edge, RawDiagram, SimplicialComplex, Triangle};
use crate::accelerator::Accelerator;
use crate::error::{Result, StreamError};

/// Highest homology dimension either engine computes
pub const MAX_HOMOLOGY_DIM: usize = 1;

/// Computes raw persistence diagrams of a filtered complex.
pub trait PersistenceEngine: Send + Sync {
    /// Short backend name, used in logs
    fn name(&self) -> &'static str;

    /// Vertex filtration from k-th neighbor distances.
    fn density_filtration(&self, kth_distances: &[f64]) -> Result<Vec<f64>>;

    /// Dimension-0 raw diagram.
    fn persistence_h0(&self, complex: &SimplicialComplex) -> Result<RawDiagram>;

    /// Dimension-1 raw diagram.
    fn persistence_h1(&self, complex: &SimplicialComplex) -> Result<RawDiagram>;

    /// Raw diagrams for dimensions 0..=max_dim.
    fn compute(&self, complex: &SimplicialComplex, max_dim: usize) -> Result<Vec<RawDiagram>> {
        if max_dim > MAX_HOMOLOGY_DIM {
            return Err(StreamError::InvalidHomologyDimension {
                requested: max_dim,
                max_computed: Some(MAX_HOMOLOGY_DIM),
            });
        }

        let mut diagrams = vec![self.persistence_h0(complex)?];
        if max_dim >= 1 {
            diagrams.push(self.persistence_h1(complex)?);
        }

        for diagram in &diagrams {
            debug!(
                engine = self.name(),
                dimension = diagram.dimension,
                pairs = diagram.len(),
                "computed persistence"
            );
        }
        Ok(diagrams)
    }
}

/// In-process engine
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

impl ReferenceEngine {
    pub fn new() -> Self {
        Self
    }
}

impl PersistenceEngine for ReferenceEngine {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn density_filtration(&self, kth_distances: &[f64]) -> Result<Vec<f64>> {
        Ok(density_filtration(kth_distances))
    }

    fn persistence_h0(&self, complex: &SimplicialComplex) -> Result<RawDiagram> {
        let reduction = reduce_h0(&complex.vertex_filtration, &complex.edges)?;
        Ok(reduction.into_diagram(0))
    }

    fn persistence_h1(&self, complex: &SimplicialComplex) -> Result<RawDiagram> {
        let pairs = reduce_h1(&complex.edges, &complex.triangles)?;
        Ok(RawDiagram::new(1, pairs))
    }
}

/// Engine backed by the accelerator kernels
#[derive(Debug, Clone)]
pub struct AcceleratedEngine {
    accelerator: Accelerator,
}

impl AcceleratedEngine {
    pub fn new(accelerator: Accelerator) -> Self {
        Self { accelerator }
    }
}

impl PersistenceEngine for AcceleratedEngine {
    fn name(&self) -> &'static str {
        "accelerator"
    }

    fn density_filtration(&self, kth_distances: &[f64]) -> Result<Vec<f64>> {
        self.accelerator.density_filtration(kth_distances)
    }

    fn persistence_h0(&self, complex: &SimplicialComplex) -> Result<RawDiagram> {
        let pairs = self
            .accelerator
            .persistence_h0(&complex.vertex_filtration, &complex.edges)?;
        let essential = essential_components(&complex.vertex_filtration, &complex.edges)?;
        Ok(Reduction { pairs, essential }.into_diagram(0))
    }

    fn persistence_h1(&self, complex: &SimplicialComplex) -> Result<RawDiagram> {
        if complex.triangles.is_empty() {
            return Ok(RawDiagram::new(1, Vec::new()));
        }
        let pairs = self
            .accelerator
            .persistence_h1(&complex.edges, &complex.triangles)?;
        Ok(RawDiagram::new(1, pairs))
    }
}

/// Finite pairs plus the birth values of essential classes
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reduction {
    pub pairs: Vec<(f64, f64)>,
    pub essential: Vec<f64>,
}

impl Reduction {
    fn into_diagram(self, dimension: usize) -> RawDiagram {
        let mut pairs = self.pairs;
        pairs.extend(self.essential.into_iter().map(|a| (a, f64::INFINITY)));
        RawDiagram::new(dimension, pairs)
    }
}

/// Union-find whose roots remember the oldest vertex of their component
struct ElderUnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
    oldest: Vec<usize>,
}

impl ElderUnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            oldest: (0..n).collect(),
        }
    }

    /// Birth values of the oldest vertex of every remaining component,
    /// oldest first.
    fn survivors(&mut self, vertex_filtration: &[f64]) -> Vec<f64> {
        let n = self.parent.len();
        let roots: Vec<usize> = (0..n).filter(|&i| self.find(i) == i).collect();
        let mut oldest: Vec<usize> = roots.into_iter().map(|root| self.oldest[root]).collect();
        oldest.sort_by(|&a, &b| vertex_filtration[a].total_cmp(&vertex_filtration[b]).then(a.cmp(&b)));
        oldest.into_iter().map(|v| vertex_filtration[v]).collect()
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    /// Link two distinct roots; `oldest` is the elder vertex of the union.
    fn link(&mut self, rx: usize, ry: usize, oldest: usize) {
        let root = match self.rank[rx].cmp(&self.rank[ry]) {
            Ordering::Less => {
                self.parent[rx] = ry;
                ry
            }
            Ordering::Greater => {
                self.parent[ry] = rx;
                rx
            }
            Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
                rx
            }
        };
        self.oldest[root] = oldest;
    }
}

/// Indices of `values` sorted by value, ties kept in index order.
fn filtration_order(values: impl Iterator<Item = f64>) -> Vec<usize> {
    let values: Vec<f64> = values.collect();
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

/// Vertex u is older than v if it enters the filtration first
fn is_older(vertex_filtration: &[f64], u: usize, v: usize) -> bool {
    vertex_filtration[u]
        .total_cmp(&vertex_filtration[v])
        .then(u.cmp(&v))
        == Ordering::Less
}

fn check_edges(n: usize, edges: &[Edge]) -> Result<()> {
    for edge in edges {
        if edge.u >= n || edge.v >= n || edge.u == edge.v {
            return Err(StreamError::InvalidInput(format!(
                "edge ({}, {}) is not valid for {} vertices",
                edge.u, edge.v, n
            )));
        }
    }
    Ok(())
}

/// H0 reduction over the vertex and edge filtration.
pub(crate) fn reduce_h0(vertex_filtration: &[f64], edges: &[Edge]) -> Result<Reduction> {
    let n = vertex_filtration.len();
    check_edges(n, edges)?;

    let mut uf = ElderUnionFind::new(n);
    let mut pairs = Vec::new();

    for e in filtration_order(edges.iter().map(|e| e.filtration)) {
        let edge = &edges[e];
        let ru = uf.find(edge.u);
        let rv = uf.find(edge.v);
        if ru == rv {
            continue;
        }

        let (ou, ov) = (uf.oldest[ru], uf.oldest[rv]);
        let (elder, younger) = if is_older(vertex_filtration, ou, ov) { (ou, ov) } else { (ov, ou) };
        pairs.push((vertex_filtration[younger], edge.filtration));
        uf.link(ru, rv, elder);
    }

    let essential = uf.survivors(vertex_filtration);
    Ok(Reduction { pairs, essential })
}

/// Birth values of the components that never merge, oldest first.
///
/// Connectivity does not depend on edge order, so edges are taken as given.
pub(crate) fn essential_components(vertex_filtration: &[f64], edges: &[Edge]) -> Result<Vec<f64>> {
    check_edges(vertex_filtration.len(), edges)?;

    let mut uf = ElderUnionFind::new(vertex_filtration.len());
    for edge in edges {
        let ru = uf.find(edge.u);
        let rv = uf.find(edge.v);
        if ru != rv {
            let (ou, ov) = (uf.oldest[ru], uf.oldest[rv]);
            let elder = if is_older(vertex_filtration, ou, ov) { ou } else { ov };
            uf.link(ru, rv, elder);
        }
    }
    Ok(uf.survivors(vertex_filtration))
}

/// Sparse Z/2 column of the boundary matrix
#[derive(Debug, Clone, Default)]
struct SparseColumn {
    rows: BTreeSet<usize>,
}

impl SparseColumn {
    fn from_rows(rows: impl IntoIterator<Item = usize>) -> Self {
        let mut column = Self::default();
        for row in rows {
            column.toggle(row);
        }
        column
    }

    fn toggle(&mut self, row: usize) {
        if !self.rows.remove(&row) {
            self.rows.insert(row);
        }
    }

    /// Lowest (maximum) nonzero row
    fn low(&self) -> Option<usize> {
        self.rows.iter().next_back().copied()
    }

    /// Column addition over Z/2 (symmetric difference)
    fn add_assign(&mut self, other: &SparseColumn) {
        for &row in &other.rows {
            self.toggle(row);
        }
    }
}

/// Finite H1 pairs of the edge and triangle filtration.
pub(crate) fn reduce_h1(edges: &[Edge], triangles: &[Triangle]) -> Result<Vec<(f64, f64)>> {
    // Row position of every edge in filtration order
    let edge_order = filtration_order(edges.iter().map(|e| e.filtration));
    let mut row_of_edge = vec![0usize; edges.len()];
    for (row, &e) in edge_order.iter().enumerate() {
        row_of_edge[e] = row;
    }

    let edge_lookup: HashMap<(usize, usize), usize> = edges
        .iter()
        .enumerate()
        .map(|(i, e)| ((e.u.min(e.v), e.u.max(e.v)), i))
        .collect();

    let mut columns: Vec<SparseColumn> = Vec::with_capacity(triangles.len());
    let mut low_to_col: HashMap<usize, usize> = HashMap::new();
    let mut pairs = Vec::new();

    for t in filtration_order(triangles.iter().map(|t| t.filtration)) {
        let triangle = &triangles[t];
        let mut vs = triangle.vertices;
        vs.sort_unstable();
        let [a, b, c] = vs;

        let mut faces = [0usize; 3];
        for (slot, key) in faces.iter_mut().zip([(a, b), (a, c), (b, c)]) {
            let e = edge_lookup.get(&key).ok_or_else(|| {
                StreamError::InvalidInput(format!(
                    "triangle {:?} has no edge ({}, {})",
                    triangle.vertices, key.0, key.1
                ))
            })?;
            *slot = row_of_edge[*e];
        }

        let mut column = SparseColumn::from_rows(faces);
        while let Some(low) = column.low() {
            match low_to_col.get(&low) {
                Some(&pivot) => column.add_assign(&columns[pivot]),
                None => break,
            }
        }

        if let Some(low) = column.low() {
            low_to_col.insert(low, columns.len());
            pairs.push((edges[edge_order[low]].filtration, triangle.filtration));
        }
        columns.push(column);
    }

    debug!(
        edges = edges.len(),
        triangles = triangles.len(),
        pivots = low_to_col.len(),
        "reduced H1 boundary matrix"
    );

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerator::{Accelerator, HostKernels};
    use std::sync::Arc;

    fn edge(u: usize, v: usize, filtration: f64) -> Edge {
        Edge { u, v, filtration }
    }

    fn triangle(vertices: [usize; 3], filtration: f64) -> Triangle {
        Triangle { vertices, filtration }
    }

    /// Square 0-1-2-3 closed at -4, diagonal 0-2 at -2, filled at -1
    fn square() -> SimplicialComplex {
        SimplicialComplex {
            vertex_filtration: vec![-10.0; 4],
            edges: vec![
                edge(0, 1, -5.0),
                edge(1, 2, -5.0),
                edge(2, 3, -5.0),
                edge(0, 3, -4.0),
                edge(0, 2, -2.0),
            ],
            triangles: vec![triangle([0, 1, 2], -1.0), triangle([0, 2, 3], -1.0)],
        }
    }

    #[test]
    fn test_two_points() {
        let complex = SimplicialComplex {
            vertex_filtration: vec![-2.0, -1.0],
            edges: vec![edge(0, 1, -1.0)],
            triangles: vec![],
        };
        let h0 = ReferenceEngine::new().persistence_h0(&complex).unwrap();

        // The younger vertex dies the moment it appears
        assert_eq!(h0.pairs, vec![(-2.0, f64::INFINITY)]);
    }

    #[test]
    fn test_elder_rule_two_peaks() {
        // Peaks at 0 (-3) and 2 (-2), saddle at 1 (-1)
        let vertex_filtration = vec![-3.0, -1.0, -2.0];
        let edges = vec![edge(0, 1, -1.0), edge(1, 2, -1.0)];
        let reduction = reduce_h0(&vertex_filtration, &edges).unwrap();

        assert_eq!(reduction.pairs, vec![(-1.0, -1.0), (-2.0, -1.0)]);
        assert_eq!(reduction.essential, vec![-3.0]);

        let diagram = reduction.into_diagram(0);
        assert_eq!(diagram.pairs, vec![(-2.0, -1.0), (-3.0, f64::INFINITY)]);
    }

    #[test]
    fn test_disconnected_components_are_essential() {
        let vertex_filtration = vec![-1.0, -4.0, -2.0, -3.0];
        let edges = vec![edge(0, 1, -1.0)];
        let reduction = reduce_h0(&vertex_filtration, &edges).unwrap();

        assert_eq!(reduction.pairs, vec![(-1.0, -1.0)]);
        // Oldest first
        assert_eq!(reduction.essential, vec![-4.0, -3.0, -2.0]);
    }

    #[test]
    fn test_square_cycle_is_filled() {
        let complex = square();
        let pairs = reduce_h1(&complex.edges, &complex.triangles).unwrap();
        assert_eq!(pairs, vec![(-2.0, -1.0), (-4.0, -1.0)]);
    }

    #[test]
    fn test_unfilled_cycles_are_not_reported() {
        let complex = square();
        assert!(reduce_h1(&complex.edges, &[]).unwrap().is_empty());

        let mut open = square();
        open.triangles.clear();
        assert!(ReferenceEngine::new().persistence_h1(&open).unwrap().is_empty());
    }

    #[test]
    fn test_essential_components_ignore_edge_order() {
        let vertex_filtration = vec![-1.0, -4.0, -2.0, -3.0, -5.0];
        let mut edges = vec![edge(0, 1, -1.0), edge(2, 3, -2.0), edge(1, 2, -1.0)];
        let expected = reduce_h0(&vertex_filtration, &edges).unwrap().essential;
        assert_eq!(expected, vec![-5.0, -4.0]);

        edges.reverse();
        assert_eq!(essential_components(&vertex_filtration, &edges).unwrap(), expected);
    }

    #[test]
    fn test_missing_face_is_rejected() {
        let edges = vec![edge(0, 1, -1.0), edge(0, 2, -1.0)];
        let triangles = vec![triangle([0, 1, 2], -1.0)];
        assert!(matches!(
            reduce_h1(&edges, &triangles),
            Err(StreamError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_out_of_range_edge_is_rejected() {
        assert!(reduce_h0(&[-1.0, -1.0], &[edge(0, 5, -1.0)]).is_err());
    }

    #[test]
    fn test_engines_report_identical_diagrams() {
        let complex = square();
        let reference = ReferenceEngine::new();
        let accelerated = AcceleratedEngine::new(Accelerator::with_kernels(Arc::new(HostKernels::new())));

        let a = reference.compute(&complex, 1).unwrap();
        let b = accelerated.compute(&complex, 1).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
        assert_eq!(a, b);
        assert_eq!(a[0].pairs.last(), Some(&(-10.0, f64::INFINITY)));
        assert_eq!(b[0].pairs.last(), Some(&(-10.0, f64::INFINITY)));
    }

    #[test]
    fn test_engines_agree_on_disconnected_complex() {
        let complex = SimplicialComplex {
            vertex_filtration: vec![-1.0, -4.0, -2.0, -3.0],
            edges: vec![edge(0, 1, -1.0), edge(2, 3, -2.0)],
            triangles: vec![],
        };
        let accelerated = AcceleratedEngine::new(Accelerator::with_kernels(Arc::new(HostKernels::new())));
        let a = ReferenceEngine::new().compute(&complex, 1).unwrap();
        let b = accelerated.compute(&complex, 1).unwrap();

        assert_eq!(a, b);
        // Both merges have zero persistence; two components never meet
        assert_eq!(b[0].pairs, vec![(-4.0, f64::INFINITY), (-3.0, f64::INFINITY)]);
        assert!(b[1].is_empty());
    }

    #[test]
    fn test_accelerated_h1_without_triangles() {
        let mut complex = square();
        complex.triangles.clear();
        let engine = AcceleratedEngine::new(Accelerator::with_kernels(Arc::new(HostKernels::new())));
        assert!(engine.persistence_h1(&complex).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_two_not_supported() {
        assert!(matches!(
            ReferenceEngine::new().compute(&square(), 2),
            Err(StreamError::InvalidHomologyDimension { requested: 2, max_computed: Some(1) })
        ));
    }
}
