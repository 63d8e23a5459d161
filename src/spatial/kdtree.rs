//! Exact kd-tree (reference spatial index)
//!
//! Points are partitioned recursively along the axis of largest spread,
//! splitting at the median. Leaves hold up to `LEAF_SIZE` points and are
//! scanned linearly.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array2, ArrayView1, ArrayView2};

use super::{
    euclidean_distance, flatten, squared_distance, validate_center, validate_knn, validate_radius_query,
    KnnResult, SpatialIndex,
};
use crate::error::Result;

const LEAF_SIZE: usize = 16;

/// Reference spatial index backed by a kd-tree built per query batch
#[derive(Debug, Clone, Copy, Default)]
pub struct KdTreeIndex;

impl KdTreeIndex {
    pub fn new() -> Self {
        Self
    }
}

impl SpatialIndex for KdTreeIndex {
    fn name(&self) -> &'static str {
        "kd-tree"
    }

    fn knn(&self, points: ArrayView2<'_, f64>, k: usize) -> Result<KnnResult> {
        let (n, dim) = points.dim();
        validate_knn(n, k)?;

        let coords = flatten(points);
        let tree = KdTree::build(&coords, dim);

        let mut distances = Array2::<f64>::zeros((n, k));
        let mut indices = Array2::<usize>::zeros((n, k));

        for i in 0..n {
            let neighbors = tree.nearest(tree.point(i), k, Some(i));
            for (slot, (sq, j)) in neighbors.into_iter().enumerate() {
                distances[[i, slot]] = sq.sqrt();
                indices[[i, slot]] = j;
            }
        }

        Ok(KnnResult { distances, indices })
    }

    fn radius_query(
        &self,
        points: ArrayView2<'_, f64>,
        query: ArrayView1<'_, f64>,
        radius: f64,
    ) -> Result<Vec<usize>> {
        validate_radius_query(points, query, radius)?;
        if points.nrows() == 0 || radius < 0.0 {
            return Ok(Vec::new());
        }

        let coords = flatten(points);
        let tree = KdTree::build(&coords, points.ncols());
        let q: Vec<f64> = query.to_vec();
        Ok(tree.within(&q, radius))
    }

    fn radius_queries(&self, points: ArrayView2<'_, f64>, centers: &[(usize, f64)]) -> Result<Vec<Vec<usize>>> {
        for &(row, radius) in centers {
            validate_center(points, row)?;
            validate_radius_query(points, points.row(row), radius)?;
        }
        if centers.is_empty() {
            return Ok(Vec::new());
        }

        let coords = flatten(points);
        let tree = KdTree::build(&coords, points.ncols());
        Ok(centers
            .iter()
            .map(|&(row, radius)| {
                if radius < 0.0 {
                    Vec::new()
                } else {
                    tree.within(tree.point(row), radius)
                }
            })
            .collect())
    }
}

#[derive(Debug)]
enum Node {
    Leaf { start: usize, end: usize },
    Split { axis: usize, value: f64, left: usize, right: usize },
}

struct KdTree<'a> {
    coords: &'a [f64],
    dim: usize,
    /// Point ids permuted so every leaf covers a contiguous range
    order: Vec<usize>,
    nodes: Vec<Node>,
    root: usize,
}

/// Max-heap entry ordered by (squared distance, index)
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    sq: f64,
    index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sq.total_cmp(&other.sq).then(self.index.cmp(&other.index))
    }
}

impl<'a> KdTree<'a> {
    fn build(coords: &'a [f64], dim: usize) -> Self {
        let n = if dim == 0 { 0 } else { coords.len() / dim };
        let mut tree = Self {
            coords,
            dim,
            order: (0..n).collect(),
            nodes: Vec::new(),
            root: 0,
        };
        tree.root = tree.build_node(0, n);
        tree
    }

    fn point(&self, i: usize) -> &'a [f64] {
        &self.coords[i * self.dim..(i + 1) * self.dim]
    }

    fn build_node(&mut self, start: usize, end: usize) -> usize {
        if end - start <= LEAF_SIZE || self.dim == 0 {
            self.nodes.push(Node::Leaf { start, end });
            return self.nodes.len() - 1;
        }

        let axis = self.widest_axis(start, end);
        let mid = start + (end - start) / 2;
        let coords = self.coords;
        let dim = self.dim;
        self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            coords[a * dim + axis].total_cmp(&coords[b * dim + axis])
        });
        let value = coords[self.order[mid] * dim + axis];

        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        self.nodes.push(Node::Split { axis, value, left, right });
        self.nodes.len() - 1
    }

    fn widest_axis(&self, start: usize, end: usize) -> usize {
        let mut best_axis = 0;
        let mut best_spread = f64::NEG_INFINITY;
        for axis in 0..self.dim {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &i in &self.order[start..end] {
                let v = self.coords[i * self.dim + axis];
                lo = lo.min(v);
                hi = hi.max(v);
            }
            if hi - lo > best_spread {
                best_spread = hi - lo;
                best_axis = axis;
            }
        }
        best_axis
    }

    /// The `k` nearest points to `q` as (squared distance, index), ascending.
    fn nearest(&self, q: &[f64], k: usize, exclude: Option<usize>) -> Vec<(f64, usize)> {
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);
        self.nearest_in(self.root, q, k, exclude, &mut heap);

        let mut found: Vec<(f64, usize)> = heap.into_iter().map(|e| (e.sq, e.index)).collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found
    }

    fn nearest_in(
        &self,
        node: usize,
        q: &[f64],
        k: usize,
        exclude: Option<usize>,
        heap: &mut BinaryHeap<HeapEntry>,
    ) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    if Some(i) == exclude {
                        continue;
                    }
                    let entry = HeapEntry { sq: squared_distance(q, self.point(i)), index: i };
                    if heap.len() < k {
                        heap.push(entry);
                    } else if heap.peek().is_some_and(|worst| entry < *worst) {
                        heap.pop();
                        heap.push(entry);
                    }
                }
            }
            Node::Split { axis, value, left, right } => {
                let diff = q[axis] - value;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.nearest_in(near, q, k, exclude, heap);

                // Equal distances must still be visited: ties are broken by index.
                let visit_far = heap.len() < k
                    || heap.peek().is_some_and(|worst| diff * diff <= worst.sq);
                if visit_far {
                    self.nearest_in(far, q, k, exclude, heap);
                }
            }
        }
    }

    /// Every index within `radius` of `q`, ascending.
    fn within(&self, q: &[f64], radius: f64) -> Vec<usize> {
        // Slack keeps pruning conservative under rounding; the inclusion
        // test itself is exact.
        let prune = radius + radius.abs() * 1e-9;
        let mut hits = Vec::new();
        let mut stack = vec![self.root];

        while let Some(node) = stack.pop() {
            match self.nodes[node] {
                Node::Leaf { start, end } => {
                    for &i in &self.order[start..end] {
                        if euclidean_distance(q, self.point(i)) <= radius {
                            hits.push(i);
                        }
                    }
                }
                Node::Split { axis, value, left, right } => {
                    let diff = q[axis] - value;
                    if diff <= prune {
                        stack.push(left);
                    }
                    if -diff <= prune {
                        stack.push(right);
                    }
                }
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn grid(side: usize) -> Array2<f64> {
        Array2::from_shape_fn((side * side, 2), |(i, d)| {
            if d == 0 { (i % side) as f64 } else { (i / side) as f64 }
        })
    }

    fn brute_force(points: &Array2<f64>, i: usize, k: usize) -> Vec<(f64, usize)> {
        let coords = flatten(points.view());
        let dim = points.ncols();
        let q = &coords[i * dim..(i + 1) * dim];
        let mut all: Vec<(f64, usize)> = (0..points.nrows())
            .filter(|&j| j != i)
            .map(|j| (squared_distance(q, &coords[j * dim..(j + 1) * dim]), j))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        all.truncate(k);
        all
    }

    #[test]
    fn test_matches_brute_force_with_ties() {
        // Integer grid: many equidistant neighbors, exercises the tie-break
        let points = grid(12);
        let index = KdTreeIndex::new();
        let knn = index.knn(points.view(), 6).unwrap();

        for i in 0..points.nrows() {
            let expected = brute_force(&points, i, 6);
            let got: Vec<usize> = knn.indices.row(i).to_vec();
            let want: Vec<usize> = expected.iter().map(|e| e.1).collect();
            assert_eq!(got, want, "row {}", i);
        }
    }

    #[test]
    fn test_coincident_points_exclude_self() {
        let points = Array2::<f64>::zeros((5, 3));
        let knn = KdTreeIndex::new().knn(points.view(), 4).unwrap();
        for i in 0..5 {
            assert!(knn.indices.row(i).iter().all(|&j| j != i));
            assert!(knn.distances.row(i).iter().all(|&d| d == 0.0));
        }
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        let points = grid(5);
        let query = points.row(12).to_owned(); // (2, 2)
        let hits = KdTreeIndex::new()
            .radius_query(points.view(), query.view(), 1.0)
            .unwrap();
        // Center plus its four axis neighbors
        assert_eq!(hits, vec![7, 11, 12, 13, 17]);
    }

    #[test]
    fn test_batched_queries_match_single_queries() {
        let points = grid(6);
        let index = KdTreeIndex::new();
        let centers = [(0, 1.0), (14, 1.5), (35, 0.0), (20, -1.0), (7, 10.0)];

        let batch = index.radius_queries(points.view(), &centers).unwrap();
        assert_eq!(batch.len(), centers.len());
        for (&(row, radius), hits) in centers.iter().zip(&batch) {
            let single = index.radius_query(points.view(), points.row(row), radius).unwrap();
            assert_eq!(hits, &single, "center {}", row);
        }
        assert_eq!(batch[2], vec![35]);
        assert!(batch[3].is_empty());
        assert_eq!(batch[4].len(), 36);
    }

    #[test]
    fn test_batched_query_center_out_of_range() {
        let points = grid(3);
        assert!(KdTreeIndex::new().radius_queries(points.view(), &[(9, 1.0)]).is_err());
    }

    #[test]
    fn test_negative_radius_is_empty() {
        let points = grid(3);
        let query = points.row(0).to_owned();
        let hits = KdTreeIndex::new()
            .radius_query(points.view(), query.view(), -1.0)
            .unwrap();
        assert!(hits.is_empty());
    }
}
