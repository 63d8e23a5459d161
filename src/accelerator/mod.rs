//! Accelerator Module: Native Kernel Contract
//!
//! The accelerator is a black-box service exposing five synchronous
//! kernels over fixed-layout buffers:
//!
//! | Kernel               | Inputs                                  | Outputs                  |
//! |----------------------|-----------------------------------------|--------------------------|
//! | `knn`                | points (n×d), k                         | distances, indices (n×k) |
//! | `density_filtration` | k-th neighbor distances (n)             | filtration (n)           |
//! | `persistence_h0`     | vertex filtration (n), edges (m)        | births, deaths, count    |
//! | `persistence_h1`     | edges (m), triangles (t)                | births, deaths, count    |
//! | `radius_query`       | points, query, radius                   | indices, count           |
//!
//! Coordinates, distances and filtration values are `f64`; indices and
//! counts are `i32`. Callers pre-allocate worst-case outputs and read back
//! `count` entries. Every kernel returns a status code (0 = success).
//!
//! ## Implementations
//!
//! - `NativeKernels` (feature `cuda`): FFI into `libtopostreams`
//! - `HostKernels`: CPU code mirroring the kernels, used to exercise the
//!   accelerated paths without a device
//!
//! ## Device Access
//!
//! The device is a singleton resource. `Accelerator` is a cloneable handle
//! whose clones share one lock; every kernel call holds it, so concurrent
//! runs serialize their device access.

mod host;
#[cfg(feature = "cuda")]
mod native;
mod status;

pub use host::HostKernels;
#[cfg(feature = "cuda")]
pub use native::NativeKernels;
pub use status::KernelStatus;

use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, ArrayView1, ArrayView2};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, StreamError};
use crate::spatial::{flatten, KnnResult};
use crate::topology::{Edge, Triangle};

/// Edge list in kernel layout
#[derive(Debug, Clone, Copy)]
pub struct EdgeBuffers<'a> {
    pub src: &'a [i32],
    pub dst: &'a [i32],
    pub filtration: &'a [f64],
}

impl EdgeBuffers<'_> {
    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }
}

/// Triangle list in kernel layout
#[derive(Debug, Clone, Copy)]
pub struct TriangleBuffers<'a> {
    pub v0: &'a [i32],
    pub v1: &'a [i32],
    pub v2: &'a [i32],
    pub filtration: &'a [f64],
}

impl TriangleBuffers<'_> {
    pub fn len(&self) -> usize {
        self.v0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v0.is_empty()
    }
}

/// Pre-allocated persistence-pair outputs
#[derive(Debug)]
pub struct PairBuffers<'a> {
    pub births: &'a mut [f64],
    pub deaths: &'a mut [f64],
    pub count: &'a mut i32,
}

/// The five-kernel call contract.
///
/// Implementations must not panic on bad input; they report it through the
/// returned status code instead.
pub trait AcceleratorKernels: Send + Sync {
    /// Implementation name, used in logs
    fn name(&self) -> &str;

    /// k nearest neighbors (excluding self) of each of the `n` points of
    /// dimension `d` in `points` (row-major).
    fn knn(
        &self,
        points: &[f64],
        n: usize,
        d: usize,
        k: usize,
        out_dist: &mut [f64],
        out_idx: &mut [i32],
    ) -> i32;

    /// filtration[i] = -1 / max(kth_distances[i], 1e-10)
    fn density_filtration(&self, kth_distances: &[f64], out_filtration: &mut [f64]) -> i32;

    /// H0 finite pairs via union-find over edges in filtration order.
    fn persistence_h0(&self, vertex_filtration: &[f64], edges: EdgeBuffers<'_>, out: PairBuffers<'_>) -> i32;

    /// H1 finite pairs via boundary-matrix reduction.
    fn persistence_h1(
        &self,
        edges: EdgeBuffers<'_>,
        triangles: TriangleBuffers<'_>,
        out: PairBuffers<'_>,
    ) -> i32;

    /// Indices of points within `radius` of `query`.
    #[allow(clippy::too_many_arguments)]
    fn radius_query(
        &self,
        points: &[f64],
        n: usize,
        d: usize,
        query: &[f64],
        radius: f64,
        out_indices: &mut [i32],
        out_count: &mut i32,
    ) -> i32;

    /// Description of a nonzero status code
    fn error_string(&self, code: i32) -> String {
        KernelStatus::from_code(code).describe().to_string()
    }
}

/// Shared handle to an accelerator device.
#[derive(Clone)]
pub struct Accelerator {
    kernels: Arc<dyn AcceleratorKernels>,
    device: Arc<Mutex<()>>,
}

impl fmt::Debug for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accelerator")
            .field("kernels", &self.kernels.name())
            .finish()
    }
}

impl Accelerator {
    /// Wrap an explicit kernel implementation.
    pub fn with_kernels(kernels: Arc<dyn AcceleratorKernels>) -> Self {
        Self {
            kernels,
            device: Arc::new(Mutex::new(())),
        }
    }

    /// Connect to the native device.
    #[cfg(feature = "cuda")]
    pub fn probe() -> Result<Self> {
        let kernels = NativeKernels::probe()?;
        Ok(Self::with_kernels(Arc::new(kernels)))
    }

    /// Connect to the native device.
    #[cfg(not(feature = "cuda"))]
    pub fn probe() -> Result<Self> {
        Err(StreamError::AcceleratorUnavailable(
            "crate built without the `cuda` feature".to_string(),
        ))
    }

    pub fn name(&self) -> &str {
        self.kernels.name()
    }

    fn check(&self, kernel: &str, code: i32) -> Result<()> {
        if code == 0 {
            return Ok(());
        }
        Err(StreamError::Accelerator {
            code,
            message: format!("{}: {}", kernel, self.kernels.error_string(code)),
        })
    }

    pub fn knn(&self, points: ArrayView2<'_, f64>, k: usize) -> Result<KnnResult> {
        let (n, d) = points.dim();
        check_kernel_size(n)?;
        let coords = flatten(points);
        let mut out_dist = vec![0.0; n * k];
        let mut out_idx = vec![0i32; n * k];

        debug!(n, d, k, backend = self.name(), "accelerator knn");
        let code = {
            let _device = self.device.lock();
            self.kernels.knn(&coords, n, d, k, &mut out_dist, &mut out_idx)
        };
        self.check("knn", code)?;

        let indices = out_idx
            .iter()
            .map(|&j| kernel_index(j, n))
            .collect::<Result<Vec<usize>>>()?;

        Ok(KnnResult {
            distances: Array2::from_shape_vec((n, k), out_dist)
                .map_err(|e| StreamError::InvalidInput(e.to_string()))?,
            indices: Array2::from_shape_vec((n, k), indices)
                .map_err(|e| StreamError::InvalidInput(e.to_string()))?,
        })
    }

    pub fn density_filtration(&self, kth_distances: &[f64]) -> Result<Vec<f64>> {
        check_kernel_size(kth_distances.len())?;
        let mut out = vec![0.0; kth_distances.len()];
        let code = {
            let _device = self.device.lock();
            self.kernels.density_filtration(kth_distances, &mut out)
        };
        self.check("density_filtration", code)?;
        Ok(out)
    }

    /// Finite H0 pairs in negated-filtration space.
    pub fn persistence_h0(&self, vertex_filtration: &[f64], edges: &[Edge]) -> Result<Vec<(f64, f64)>> {
        let n = vertex_filtration.len();
        check_kernel_size(n)?;
        let packed = PackedEdges::pack(edges)?;
        let mut births = vec![0.0; n];
        let mut deaths = vec![0.0; n];
        let mut count = 0i32;

        debug!(n, m = edges.len(), backend = self.name(), "accelerator persistence_h0");
        let code = {
            let _device = self.device.lock();
            self.kernels.persistence_h0(
                vertex_filtration,
                packed.buffers(),
                PairBuffers { births: &mut births, deaths: &mut deaths, count: &mut count },
            )
        };
        self.check("persistence_h0", code)?;
        read_pairs(&births, &deaths, count)
    }

    /// Finite H1 pairs in negated-filtration space.
    pub fn persistence_h1(&self, edges: &[Edge], triangles: &[Triangle]) -> Result<Vec<(f64, f64)>> {
        let t = triangles.len();
        check_kernel_size(t)?;
        let packed_edges = PackedEdges::pack(edges)?;
        let packed_triangles = PackedTriangles::pack(triangles)?;
        let mut births = vec![0.0; t];
        let mut deaths = vec![0.0; t];
        let mut count = 0i32;

        debug!(m = edges.len(), t, backend = self.name(), "accelerator persistence_h1");
        let code = {
            let _device = self.device.lock();
            self.kernels.persistence_h1(
                packed_edges.buffers(),
                packed_triangles.buffers(),
                PairBuffers { births: &mut births, deaths: &mut deaths, count: &mut count },
            )
        };
        self.check("persistence_h1", code)?;
        read_pairs(&births, &deaths, count)
    }

    pub fn radius_query(
        &self,
        points: ArrayView2<'_, f64>,
        query: ArrayView1<'_, f64>,
        radius: f64,
    ) -> Result<Vec<usize>> {
        let (n, d) = points.dim();
        check_kernel_size(n)?;
        let coords = flatten(points);
        let q = query.to_vec();
        let mut out_indices = vec![0i32; n];
        let mut count = 0i32;

        let code = {
            let _device = self.device.lock();
            self.kernels
                .radius_query(&coords, n, d, &q, radius, &mut out_indices, &mut count)
        };
        self.check("radius_query", code)?;

        let count = kernel_count(count, n)?;
        out_indices[..count].iter().map(|&j| kernel_index(j, n)).collect()
    }
}

fn check_kernel_size(len: usize) -> Result<()> {
    if i32::try_from(len).is_err() {
        return Err(StreamError::InvalidInput(format!(
            "{} elements exceed the 32-bit kernel index range",
            len
        )));
    }
    Ok(())
}

fn to_kernel_index(i: usize) -> Result<i32> {
    i32::try_from(i).map_err(|_| {
        StreamError::InvalidInput(format!("index {} exceeds the 32-bit kernel index range", i))
    })
}

fn kernel_index(j: i32, n: usize) -> Result<usize> {
    usize::try_from(j).ok().filter(|&j| j < n).ok_or_else(|| StreamError::Accelerator {
        code: KernelStatus::Internal.code(),
        message: format!("kernel returned index {} outside 0..{}", j, n),
    })
}

fn kernel_count(count: i32, capacity: usize) -> Result<usize> {
    usize::try_from(count)
        .ok()
        .filter(|&c| c <= capacity)
        .ok_or_else(|| StreamError::Accelerator {
            code: KernelStatus::Internal.code(),
            message: format!("kernel reported count {} for a buffer of {}", count, capacity),
        })
}

fn read_pairs(births: &[f64], deaths: &[f64], count: i32) -> Result<Vec<(f64, f64)>> {
    let count = kernel_count(count, births.len())?;
    Ok(births[..count].iter().copied().zip(deaths[..count].iter().copied()).collect())
}

struct PackedEdges {
    src: Vec<i32>,
    dst: Vec<i32>,
    filtration: Vec<f64>,
}

impl PackedEdges {
    fn pack(edges: &[Edge]) -> Result<Self> {
        let mut packed = Self {
            src: Vec::with_capacity(edges.len()),
            dst: Vec::with_capacity(edges.len()),
            filtration: Vec::with_capacity(edges.len()),
        };
        for edge in edges {
            packed.src.push(to_kernel_index(edge.u)?);
            packed.dst.push(to_kernel_index(edge.v)?);
            packed.filtration.push(edge.filtration);
        }
        Ok(packed)
    }

    fn buffers(&self) -> EdgeBuffers<'_> {
        EdgeBuffers { src: &self.src, dst: &self.dst, filtration: &self.filtration }
    }
}

struct PackedTriangles {
    v0: Vec<i32>,
    v1: Vec<i32>,
    v2: Vec<i32>,
    filtration: Vec<f64>,
}

impl PackedTriangles {
    fn pack(triangles: &[Triangle]) -> Result<Self> {
        let mut packed = Self {
            v0: Vec::with_capacity(triangles.len()),
            v1: Vec::with_capacity(triangles.len()),
            v2: Vec::with_capacity(triangles.len()),
            filtration: Vec::with_capacity(triangles.len()),
        };
        for tri in triangles {
            let [a, b, c] = tri.vertices;
            packed.v0.push(to_kernel_index(a)?);
            packed.v1.push(to_kernel_index(b)?);
            packed.v2.push(to_kernel_index(c)?);
            packed.filtration.push(tri.filtration);
        }
        Ok(packed)
    }

    fn buffers(&self) -> TriangleBuffers<'_> {
        TriangleBuffers {
            v0: &self.v0,
            v1: &self.v1,
            v2: &self.v2,
            filtration: &self.filtration,
        }
    }
}
