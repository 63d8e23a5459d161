//! FFI binding to `libtopostreams`.
//!
//! Sizes are passed as C `int`; `Accelerator` checks that every size and
//! index fits before a call reaches this layer.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use tracing::info;

use super::{AcceleratorKernels, EdgeBuffers, KernelStatus, PairBuffers, TriangleBuffers};
use crate::error::{Result, StreamError};

extern "C" {
    fn topo_gpu_knn(
        points: *const f64,
        n: c_int,
        d: c_int,
        k: c_int,
        out_dist: *mut f64,
        out_idx: *mut c_int,
    ) -> c_int;
    fn topo_gpu_density_filtration(kth_distances: *const f64, n: c_int, out_filtration: *mut f64) -> c_int;
    fn topo_gpu_persistence_h0(
        vertex_filt: *const f64,
        edge_src: *const c_int,
        edge_dst: *const c_int,
        edge_filt: *const f64,
        n: c_int,
        m: c_int,
        out_births: *mut f64,
        out_deaths: *mut f64,
        out_count: *mut c_int,
    ) -> c_int;
    fn topo_gpu_persistence_h1(
        edge_src: *const c_int,
        edge_dst: *const c_int,
        edge_filt: *const f64,
        tri_v0: *const c_int,
        tri_v1: *const c_int,
        tri_v2: *const c_int,
        tri_filt: *const f64,
        m: c_int,
        t: c_int,
        out_births: *mut f64,
        out_deaths: *mut f64,
        out_count: *mut c_int,
    ) -> c_int;
    fn topo_gpu_radius_query(
        points: *const f64,
        query: *const f64,
        n: c_int,
        d: c_int,
        radius: f64,
        out_indices: *mut c_int,
        out_count: *mut c_int,
    ) -> c_int;
    fn topo_error_string(code: c_int) -> *const c_char;
}

fn to_c_int(value: usize) -> Option<c_int> {
    c_int::try_from(value).ok()
}

/// Kernels backed by the native CUDA library
#[derive(Debug, Clone, Copy)]
pub struct NativeKernels {
    _private: (),
}

impl NativeKernels {
    /// Check that a device answers by running the smallest kernel once.
    pub fn probe() -> Result<Self> {
        let kernels = Self { _private: () };
        let mut out = [0.0f64; 1];
        let code = kernels.density_filtration(&[1.0], &mut out);
        if code != 0 {
            return Err(StreamError::AcceleratorUnavailable(format!(
                "probe kernel returned status {}: {}",
                code,
                kernels.error_string(code)
            )));
        }
        info!("native accelerator available");
        Ok(kernels)
    }
}

impl AcceleratorKernels for NativeKernels {
    fn name(&self) -> &str {
        "cuda"
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
            return KernelStatus::InvalidArgument.code();
        }
        let (Some(n), Some(d), Some(k)) = (to_c_int(n), to_c_int(d), to_c_int(k)) else {
            return KernelStatus::InvalidArgument.code();
        };
        // SAFETY: buffer lengths checked against n, d and k above.
        unsafe { topo_gpu_knn(points.as_ptr(), n, d, k, out_dist.as_mut_ptr(), out_idx.as_mut_ptr()) }
    }

    fn density_filtration(&self, kth_distances: &[f64], out_filtration: &mut [f64]) -> i32 {
        if kth_distances.len() != out_filtration.len() {
            return KernelStatus::InvalidArgument.code();
        }
        let Some(n) = to_c_int(kth_distances.len()) else {
            return KernelStatus::InvalidArgument.code();
        };
        // SAFETY: both buffers hold n values.
        unsafe { topo_gpu_density_filtration(kth_distances.as_ptr(), n, out_filtration.as_mut_ptr()) }
    }

    fn persistence_h0(&self, vertex_filtration: &[f64], edges: EdgeBuffers<'_>, out: PairBuffers<'_>) -> i32 {
        let n = vertex_filtration.len();
        if edges.dst.len() != edges.len()
            || edges.filtration.len() != edges.len()
            || out.births.len() < n
            || out.deaths.len() < n
        {
            return KernelStatus::InvalidArgument.code();
        }
        let (Some(n), Some(m)) = (to_c_int(n), to_c_int(edges.len())) else {
            return KernelStatus::InvalidArgument.code();
        };
        // SAFETY: edge arrays hold m values, outputs hold at least n.
        unsafe {
            topo_gpu_persistence_h0(
                vertex_filtration.as_ptr(),
                edges.src.as_ptr(),
                edges.dst.as_ptr(),
                edges.filtration.as_ptr(),
                n,
                m,
                out.births.as_mut_ptr(),
                out.deaths.as_mut_ptr(),
                out.count,
            )
        }
    }

    fn persistence_h1(
        &self,
        edges: EdgeBuffers<'_>,
        triangles: TriangleBuffers<'_>,
        out: PairBuffers<'_>,
    ) -> i32 {
        let t = triangles.len();
        if edges.dst.len() != edges.len()
            || edges.filtration.len() != edges.len()
            || triangles.v1.len() != t
            || triangles.v2.len() != t
            || triangles.filtration.len() != t
            || out.births.len() < t
            || out.deaths.len() < t
        {
            return KernelStatus::InvalidArgument.code();
        }
        let (Some(m), Some(t)) = (to_c_int(edges.len()), to_c_int(t)) else {
            return KernelStatus::InvalidArgument.code();
        };
        // SAFETY: edge arrays hold m values, triangle arrays and outputs hold t.
        unsafe {
            topo_gpu_persistence_h1(
                edges.src.as_ptr(),
                edges.dst.as_ptr(),
                edges.filtration.as_ptr(),
                triangles.v0.as_ptr(),
                triangles.v1.as_ptr(),
                triangles.v2.as_ptr(),
                triangles.filtration.as_ptr(),
                m,
                t,
                out.births.as_mut_ptr(),
                out.deaths.as_mut_ptr(),
                out.count,
            )
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
            return KernelStatus::InvalidArgument.code();
        }
        let (Some(n), Some(d)) = (to_c_int(n), to_c_int(d)) else {
            return KernelStatus::InvalidArgument.code();
        };
        // SAFETY: points hold n*d values, query d, indices at least n.
        unsafe {
            topo_gpu_radius_query(
                points.as_ptr(),
                query.as_ptr(),
                n,
                d,
                radius,
                out_indices.as_mut_ptr(),
                out_count,
            )
        }
    }

    fn error_string(&self, code: i32) -> String {
        // SAFETY: the library returns a static NUL-terminated string or null.
        let ptr = unsafe { topo_error_string(code) };
        if ptr.is_null() {
            return KernelStatus::from_code(code).describe().to_string();
        }
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}
