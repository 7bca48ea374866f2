use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::shape::Shape;
use std::fmt;

// Backend — Abstraction over compute devices (CPU, GPU, ...)
//
// Each backend implements this trait, providing its own storage type and
// the handful of dense kernels a fully connected layer is built from:
//
//   gemm               C (=|+=) op(A) · op(B)
//   sum_rows           v (=|+=) column-wise sum of a matrix
//   add_row_broadcast  C[r, c] += v[c]
//
// The operator is written once against these primitives and monomorphized
// per backend. Unlike a functional tensor API, kernels write into a
// caller-provided `&mut Storage`: the executor owns every buffer and the
// operator only fills them in.

/// Identifies a compute device (e.g., "cpu", "cuda:0").
pub trait BackendDevice: Clone + fmt::Debug + Send + Sync + 'static {
    /// A human-readable name for this device.
    fn name(&self) -> String;
}

/// A storage buffer that holds tensor data on a specific device.
pub trait BackendStorage: Clone + Send + Sync + 'static {
    /// The data type of the elements in this storage.
    fn dtype(&self) -> DType;

    /// Total number of elements in this storage.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a kernel combines its result with the destination contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assign {
    /// Overwrite the destination.
    Write,
    /// Add into the destination.
    Add,
}

/// A row-major `rows × cols` matrix, optionally read transposed.
///
/// `rows`/`cols` always describe the matrix as it is stored; `transposed`
/// only changes how the kernel walks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatView {
    pub rows: usize,
    pub cols: usize,
    pub transposed: bool,
}

impl MatView {
    pub fn new(rows: usize, cols: usize) -> Self {
        MatView {
            rows,
            cols,
            transposed: false,
        }
    }

    /// The same storage read as its transpose.
    pub fn t(self) -> Self {
        MatView {
            transposed: !self.transposed,
            ..self
        }
    }

    /// Rows of the matrix as the kernel sees it.
    pub fn op_rows(&self) -> usize {
        if self.transposed {
            self.cols
        } else {
            self.rows
        }
    }

    /// Columns of the matrix as the kernel sees it.
    pub fn op_cols(&self) -> usize {
        if self.transposed {
            self.rows
        } else {
            self.cols
        }
    }
}

/// Validate the operands of `op(lhs) · op(rhs)` and return `(m, k, n)`.
///
/// Shared by every backend so that dimension errors are reported the same
/// way regardless of device.
pub fn gemm_dims(lhs: MatView, rhs: MatView) -> Result<(usize, usize, usize)> {
    let (m, k) = (lhs.op_rows(), lhs.op_cols());
    let (k2, n) = (rhs.op_rows(), rhs.op_cols());
    if k != k2 {
        return Err(Error::MatmulShapeMismatch { m, k1: k, k2, n });
    }
    Ok((m, k, n))
}

/// Check that a storage holds exactly `expected` elements.
pub fn check_len<S: BackendStorage>(storage: &S, shape: Shape) -> Result<()> {
    let expected = shape.elem_count();
    if storage.len() != expected {
        return Err(Error::ElementCountMismatch {
            shape,
            expected,
            got: storage.len(),
        });
    }
    Ok(())
}

/// The main Backend trait. Implementing this for a struct (e.g., CpuBackend)
/// makes that struct a complete execution target for dense operators.
pub trait Backend: Clone + Send + Sync + fmt::Debug + 'static {
    /// The device type for this backend.
    type Device: BackendDevice;
    /// The storage type for this backend.
    type Storage: BackendStorage;

    //  Creation

    /// Allocate storage filled with zeros.
    fn zeros(shape: &Shape, dtype: DType, device: &Self::Device) -> Result<Self::Storage>;

    /// Create storage from a flat f64 slice, converting to the target dtype.
    fn from_f64_slice(data: &[f64], dtype: DType, device: &Self::Device) -> Result<Self::Storage>;

    /// Copy data from this storage to a `Vec<f64>` on the host.
    fn to_f64_vec(input: &Self::Storage) -> Result<Vec<f64>>;

    //  Dense kernels

    /// General matrix multiply: `out (=|+=) op(lhs) · op(rhs)`.
    ///
    /// `out` is the `m × n` result in row-major order, where `m × k` and
    /// `k × n` are the operand shapes after applying each view's transpose.
    fn gemm(
        lhs: &Self::Storage,
        lhs_view: MatView,
        rhs: &Self::Storage,
        rhs_view: MatView,
        out: &mut Self::Storage,
        assign: Assign,
    ) -> Result<()>;

    /// Column-wise sum of a row-major `rows × cols` matrix into a length-`cols`
    /// vector: `out[c] (=|+=) Σ_r input[r, c]`.
    fn sum_rows(
        input: &Self::Storage,
        rows: usize,
        cols: usize,
        out: &mut Self::Storage,
        assign: Assign,
    ) -> Result<()>;

    /// Broadcast-add a length-`cols` vector to every row:
    /// `out[r, c] += bias[c]`.
    fn add_row_broadcast(
        out: &mut Self::Storage,
        rows: usize,
        cols: usize,
        bias: &Self::Storage,
    ) -> Result<()>;
}
