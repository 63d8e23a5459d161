//! CPU implementations that mirror the accelerator kernels.
//!
//! Same buffer layouts, same status codes, same algorithms as the native
//! library. They let the accelerated spatial index and persistence engine
//! run (and be tested) on machines without a device.
//!
//! The reductions are written independently of the in-process engine:
//! H0 keeps the oldest vertex as the component root (path halving, no
//! ranks) and H1 reduces sorted row vectors by merging instead of set
//! toggling. Agreement between the two backends is therefore a real check.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::{AcceleratorKernels, EdgeBuffers, KernelStatus, PairBuffers, TriangleBuffers};
use crate::spatial::{euclidean_distance, squared_distance};
use crate::topology::{density_filtration, Edge, Triangle};

const OK: i32 = 0;
const INVALID: i32 = 1;

/// Host-side kernel implementations
#[derive(Debug, Clone, Copy, Default)]
pub struct HostKernels;

impl HostKernels {
    pub fn new() -> Self {
        Self
    }
}

fn vertex(i: i32) -> Option<usize> {
    usize::try_from(i).ok()
}

fn unpack_edges(edges: &EdgeBuffers<'_>) -> Option<Vec<Edge>> {
    let m = edges.len();
    if edges.dst.len() != m || edges.filtration.len() != m {
        return None;
    }
    (0..m)
        .map(|i| {
            Some(Edge {
                u: vertex(edges.src[i])?,
                v: vertex(edges.dst[i])?,
                filtration: edges.filtration[i],
            })
        })
        .collect()
}

fn unpack_triangles(triangles: &TriangleBuffers<'_>) -> Option<Vec<Triangle>> {
    let t = triangles.len();
    if triangles.v1.len() != t || triangles.v2.len() != t || triangles.filtration.len() != t {
        return None;
    }
    (0..t)
        .map(|i| {
            Some(Triangle {
                vertices: [
                    vertex(triangles.v0[i])?,
                    vertex(triangles.v1[i])?,
                    vertex(triangles.v2[i])?,
                ],
                filtration: triangles.filtration[i],
            })
        })
        .collect()
}

/// Positions of `values` by (value, position)
fn sweep_order(values: impl Iterator<Item = f64>) -> Vec<usize> {
    let values: Vec<f64> = values.collect();
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_unstable_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
    order
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Elder-rule merges in edge sweep order; every root is the oldest vertex
/// of its component.
fn host_h0(vertex_filtration: &[f64], edges: &[Edge]) -> Option<Vec<(f64, f64)>> {
    let n = vertex_filtration.len();
    if edges.iter().any(|e| e.u >= n || e.v >= n || e.u == e.v) {
        return None;
    }

    let mut parent: Vec<usize> = (0..n).collect();
    let mut pairs = Vec::new();
    for e in sweep_order(edges.iter().map(|e| e.filtration)) {
        let edge = &edges[e];
        let ru = find_root(&mut parent, edge.u);
        let rv = find_root(&mut parent, edge.v);
        if ru == rv {
            continue;
        }
        let u_first = vertex_filtration[ru].total_cmp(&vertex_filtration[rv]).then(ru.cmp(&rv)) == Ordering::Less;
        let (elder, younger) = if u_first { (ru, rv) } else { (rv, ru) };
        parent[younger] = elder;
        pairs.push((vertex_filtration[younger], edge.filtration));
    }
    Some(pairs)
}

/// Symmetric difference of two ascending row vectors
fn merge_rows(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Column reduction with a dense pivot table over edge rows.
fn host_h1(edges: &[Edge], triangles: &[Triangle]) -> Option<Vec<(f64, f64)>> {
    let rows = sweep_order(edges.iter().map(|e| e.filtration));
    let mut row_of = vec![0usize; edges.len()];
    for (row, &e) in rows.iter().enumerate() {
        row_of[e] = row;
    }
    let lookup: HashMap<(usize, usize), usize> = edges
        .iter()
        .enumerate()
        .map(|(i, e)| ((e.u.min(e.v), e.u.max(e.v)), i))
        .collect();

    let mut pivot_of_row: Vec<Option<usize>> = vec![None; edges.len()];
    let mut reduced: Vec<Vec<usize>> = Vec::with_capacity(triangles.len());
    let mut pairs = Vec::new();

    for t in sweep_order(triangles.iter().map(|t| t.filtration)) {
        let mut vs = triangles[t].vertices;
        vs.sort_unstable();
        let [a, b, c] = vs;

        let mut column = Vec::with_capacity(3);
        for key in [(a, b), (a, c), (b, c)] {
            column.push(row_of[*lookup.get(&key)?]);
        }
        column.sort_unstable();
        column.dedup();

        while let Some(&low) = column.last() {
            match pivot_of_row[low] {
                Some(pivot) => column = merge_rows(&column, &reduced[pivot]),
                None => break,
            }
        }

        if let Some(&low) = column.last() {
            pivot_of_row[low] = Some(reduced.len());
            pairs.push((edges[rows[low]].filtration, triangles[t].filtration));
        }
        reduced.push(column);
    }
    Some(pairs)
}

/// Copy pairs into the caller's buffers; fails if they do not fit.
fn write_pairs(pairs: &[(f64, f64)], out: PairBuffers<'_>) -> i32 {
    if pairs.len() > out.births.len() || pairs.len() > out.deaths.len() {
        return KernelStatus::Internal.code();
    }
    let Ok(count) = i32::try_from(pairs.len()) else {
        return KernelStatus::Internal.code();
    };
    for (slot, &(a, b)) in pairs.iter().enumerate() {
        out.births[slot] = a;
        out.deaths[slot] = b;
    }
    *out.count = count;
    OK
}

impl AcceleratorKernels for HostKernels {
    fn name(&self) -> &str {
        "host"
    }

    fn knn(
        &self,
        points: &[f64],
        n: usize,
        d: usize,
        k: usize,
        out_dist: &mut [f64],
        out_idx: &mut [i32],
    ) -> i32 {
        if points.len() != n * d || out_dist.len() != n * k || out_idx.len() != n * k {
            return INVALID;
        }
        if k == 0 || k >= n {
            return INVALID;
        }

        let mut candidates: Vec<(f64, usize)> = Vec::with_capacity(n - 1);
        for i in 0..n {
            let p = &points[i * d..(i + 1) * d];
            candidates.clear();
            for j in (0..n).filter(|&j| j != i) {
                candidates.push((squared_distance(p, &points[j * d..(j + 1) * d]), j));
            }
            candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            for (slot, &(sq, j)) in candidates.iter().take(k).enumerate() {
                let Ok(j) = i32::try_from(j) else {
                    return INVALID;
                };
                out_dist[i * k + slot] = sq.sqrt();
                out_idx[i * k + slot] = j;
            }
        }
        OK
    }

    fn density_filtration(&self, kth_distances: &[f64], out_filtration: &mut [f64]) -> i32 {
        if kth_distances.len() != out_filtration.len() {
            return INVALID;
        }
        out_filtration.copy_from_slice(&density_filtration(kth_distances));
        OK
    }

    fn persistence_h0(&self, vertex_filtration: &[f64], edges: EdgeBuffers<'_>, out: PairBuffers<'_>) -> i32 {
        let Some(edges) = unpack_edges(&edges) else {
            return INVALID;
        };
        match host_h0(vertex_filtration, &edges) {
            Some(pairs) => write_pairs(&pairs, out),
            None => INVALID,
        }
    }

    fn persistence_h1(
        &self,
        edges: EdgeBuffers<'_>,
        triangles: TriangleBuffers<'_>,
        out: PairBuffers<'_>,
    ) -> i32 {
        let (Some(edges), Some(triangles)) = (unpack_edges(&edges), unpack_triangles(&triangles)) else {
            return INVALID;
        };
        match host_h1(&edges, &triangles) {
            Some(pairs) => write_pairs(&pairs, out),
            None => INVALID,
        }
    }

    fn radius_query(
        &self,
        points: &[f64],
        n: usize,
        d: usize,
        query: &[f64],
        radius: f64,
        out_indices: &mut [i32],
        out_count: &mut i32,
    ) -> i32 {
        if points.len() != n * d || query.len() != d || out_indices.len() < n {
            return INVALID;
        }

        let mut count = 0usize;
        for i in 0..n {
            if euclidean_distance(&points[i * d..(i + 1) * d], query) <= radius {
                let Ok(idx) = i32::try_from(i) else {
                    return INVALID;
                };
                out_indices[count] = idx;
                count += 1;
            }
        }

        match i32::try_from(count) {
            Ok(c) => {
                *out_count = c;
                OK
            }
            Err(_) => INVALID,
        }
    }
}
