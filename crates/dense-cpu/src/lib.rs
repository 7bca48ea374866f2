// CPU Backend — dense kernels on host memory
//
// ARCHITECTURE:
// - CpuDevice is a unit struct (there is only one host)
// - CpuStorage is an enum over Vec<T> for each supported dtype
// - Every kernel is written once, generic over T: WithDType, and dispatched
//   on the runtime dtype of its operands
// - Work is split across rows with rayon; each output row is owned by exactly
//   one task, so no synchronization is needed inside a kernel
//
// USAGE:
//   let dev = CpuDevice;
//   let blob = CpuBlob::zeros((2, 1, 1, 4), DType::F32, &dev)?;

use rayon::prelude::*;

use dense_core::backend::{check_len, gemm_dims, Assign, Backend, BackendDevice, BackendStorage};
use dense_core::{DType, Error, MatView, Result, Shape, TBlob, WithDType};

/// The host device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuDevice;

impl BackendDevice for CpuDevice {
    fn name(&self) -> String {
        "cpu".to_string()
    }
}

/// Host storage, one variant per supported dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum CpuStorage {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl BackendStorage for CpuStorage {
    fn dtype(&self) -> DType {
        match self {
            CpuStorage::F32(_) => DType::F32,
            CpuStorage::F64(_) => DType::F64,
        }
    }

    fn len(&self) -> usize {
        match self {
            CpuStorage::F32(v) => v.len(),
            CpuStorage::F64(v) => v.len(),
        }
    }
}

/// The CPU backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

/// Buffer handle on the CPU backend.
pub type CpuBlob = TBlob<CpuBackend>;

fn dtype_mismatch(expected: &CpuStorage, got: &CpuStorage) -> Error {
    Error::DTypeMismatch {
        expected: expected.dtype(),
        got: got.dtype(),
    }
}

// Element (r, c) of a row-major matrix as seen through `view`.
#[inline]
fn at<T: Copy>(data: &[T], view: MatView, r: usize, c: usize) -> T {
    if view.transposed {
        data[c * view.cols + r]
    } else {
        data[r * view.cols + c]
    }
}

#[inline]
fn store<T: WithDType>(dst: &mut T, v: T, assign: Assign) {
    match assign {
        Assign::Write => *dst = v,
        Assign::Add => *dst += v,
    }
}

fn gemm_typed<T: WithDType>(
    a: &[T],
    av: MatView,
    b: &[T],
    bv: MatView,
    out: &mut [T],
    (k, n): (usize, usize),
    assign: Assign,
) {
    out.par_chunks_mut(n.max(1))
        .enumerate()
        .for_each(|(i, row)| {
            for (j, dst) in row.iter_mut().enumerate() {
                let mut acc = T::zero();
                for p in 0..k {
                    acc += at(a, av, i, p) * at(b, bv, p, j);
                }
                store(dst, acc, assign);
            }
        });
}

fn sum_rows_typed<T: WithDType>(input: &[T], rows: usize, cols: usize, out: &mut [T], assign: Assign) {
    out.par_iter_mut().enumerate().for_each(|(c, dst)| {
        let mut acc = T::zero();
        for r in 0..rows {
            acc += input[r * cols + c];
        }
        store(dst, acc, assign);
    });
}

fn add_row_broadcast_typed<T: WithDType>(out: &mut [T], cols: usize, bias: &[T]) {
    out.par_chunks_mut(cols.max(1)).for_each(|row| {
        for (dst, &b) in row.iter_mut().zip(bias) {
            *dst += b;
        }
    });
}

impl Backend for CpuBackend {
    type Device = CpuDevice;
    type Storage = CpuStorage;

    fn zeros(shape: &Shape, dtype: DType, _device: &CpuDevice) -> Result<CpuStorage> {
        let n = shape.elem_count();
        Ok(match dtype {
            DType::F32 => CpuStorage::F32(vec![0.0; n]),
            DType::F64 => CpuStorage::F64(vec![0.0; n]),
        })
    }

    fn from_f64_slice(data: &[f64], dtype: DType, _device: &CpuDevice) -> Result<CpuStorage> {
        Ok(match dtype {
            DType::F32 => CpuStorage::F32(data.iter().map(|&v| v as f32).collect()),
            DType::F64 => CpuStorage::F64(data.to_vec()),
        })
    }

    fn to_f64_vec(input: &CpuStorage) -> Result<Vec<f64>> {
        Ok(match input {
            CpuStorage::F32(v) => v.iter().map(|&x| x as f64).collect(),
            CpuStorage::F64(v) => v.clone(),
        })
    }

    fn gemm(
        lhs: &CpuStorage,
        lhs_view: MatView,
        rhs: &CpuStorage,
        rhs_view: MatView,
        out: &mut CpuStorage,
        assign: Assign,
    ) -> Result<()> {
        let (m, k, n) = gemm_dims(lhs_view, rhs_view)?;
        check_len(lhs, Shape::from((lhs_view.rows, lhs_view.cols)))?;
        check_len(rhs, Shape::from((rhs_view.rows, rhs_view.cols)))?;
        check_len(out, Shape::from((m, n)))?;

        match (lhs, rhs, &mut *out) {
            (CpuStorage::F32(a), CpuStorage::F32(b), CpuStorage::F32(c)) => {
                gemm_typed(a, lhs_view, b, rhs_view, c, (k, n), assign)
            }
            (CpuStorage::F64(a), CpuStorage::F64(b), CpuStorage::F64(c)) => {
                gemm_typed(a, lhs_view, b, rhs_view, c, (k, n), assign)
            }
            (a, b, c) if a.dtype() == b.dtype() => return Err(dtype_mismatch(a, c)),
            (a, b, _) => return Err(dtype_mismatch(a, b)),
        }
        Ok(())
    }

    fn sum_rows(
        input: &CpuStorage,
        rows: usize,
        cols: usize,
        out: &mut CpuStorage,
        assign: Assign,
    ) -> Result<()> {
        check_len(input, Shape::from((rows, cols)))?;
        check_len(out, Shape::from(cols))?;

        match (input, &mut *out) {
            (CpuStorage::F32(a), CpuStorage::F32(c)) => sum_rows_typed(a, rows, cols, c, assign),
            (CpuStorage::F64(a), CpuStorage::F64(c)) => sum_rows_typed(a, rows, cols, c, assign),
            (a, c) => return Err(dtype_mismatch(a, c)),
        }
        Ok(())
    }

    fn add_row_broadcast(
        out: &mut CpuStorage,
        rows: usize,
        cols: usize,
        bias: &CpuStorage,
    ) -> Result<()> {
        check_len(out, Shape::from((rows, cols)))?;
        check_len(bias, Shape::from(cols))?;

        match (&mut *out, bias) {
            (CpuStorage::F32(c), CpuStorage::F32(b)) => add_row_broadcast_typed(c, cols, b),
            (CpuStorage::F64(c), CpuStorage::F64(b)) => add_row_broadcast_typed(c, cols, b),
            (c, b) => return Err(dtype_mismatch(c, b)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64s(s: &CpuStorage) -> Vec<f64> {
        CpuBackend::to_f64_vec(s).unwrap()
    }

    fn storage(data: &[f64]) -> CpuStorage {
        CpuBackend::from_f64_slice(data, DType::F64, &CpuDevice).unwrap()
    }

    #[test]
    fn test_gemm_plain() {
        // [1 2; 3 4] · [5 6; 7 8] = [19 22; 43 50]
        let a = storage(&[1.0, 2.0, 3.0, 4.0]);
        let b = storage(&[5.0, 6.0, 7.0, 8.0]);
        let mut c = CpuBackend::zeros(&Shape::from((2, 2)), DType::F64, &CpuDevice).unwrap();
        CpuBackend::gemm(&a, MatView::new(2, 2), &b, MatView::new(2, 2), &mut c, Assign::Write)
            .unwrap();
        assert_eq!(f64s(&c), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_gemm_rhs_transposed() {
        // data [2x3] · weight^T, weight stored [1x3]
        let a = storage(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let w = storage(&[1.0, 0.0, -1.0]);
        let mut c = CpuBackend::zeros(&Shape::from((2, 1)), DType::F64, &CpuDevice).unwrap();
        CpuBackend::gemm(&a, MatView::new(2, 3), &w, MatView::new(1, 3).t(), &mut c, Assign::Write)
            .unwrap();
        assert_eq!(f64s(&c), vec![-2.0, -2.0]);
    }

    #[test]
    fn test_gemm_lhs_transposed_accumulates() {
        // grad^T [2x1]^T=[1x2] · data [2x2]
        let g = storage(&[1.0, 2.0]);
        let d = storage(&[1.0, 1.0, 3.0, 4.0]);
        let mut c = storage(&[10.0, 10.0]);
        CpuBackend::gemm(&g, MatView::new(2, 1).t(), &d, MatView::new(2, 2), &mut c, Assign::Add)
            .unwrap();
        assert_eq!(f64s(&c), vec![17.0, 19.0]);
    }

    #[test]
    fn test_gemm_inner_dim_mismatch() {
        let a = storage(&[1.0, 2.0, 3.0]);
        let b = storage(&[1.0, 2.0]);
        let mut c = storage(&[0.0]);
        let r = CpuBackend::gemm(&a, MatView::new(1, 3), &b, MatView::new(2, 1), &mut c, Assign::Write);
        assert!(matches!(
            r,
            Err(Error::MatmulShapeMismatch {
                m: 1,
                k1: 3,
                k2: 2,
                n: 1
            })
        ));
    }

    #[test]
    fn test_gemm_dtype_mismatch() {
        let a = storage(&[1.0]);
        let b = CpuBackend::from_f64_slice(&[1.0], DType::F32, &CpuDevice).unwrap();
        let mut c = storage(&[0.0]);
        let r = CpuBackend::gemm(&a, MatView::new(1, 1), &b, MatView::new(1, 1), &mut c, Assign::Write);
        assert!(matches!(r, Err(Error::DTypeMismatch { .. })));
        assert_eq!(f64s(&c), vec![0.0]);
    }

    #[test]
    fn test_sum_rows() {
        let g = storage(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut out = storage(&[0.0, 0.0, 0.0]);
        CpuBackend::sum_rows(&g, 2, 3, &mut out, Assign::Write).unwrap();
        assert_eq!(f64s(&out), vec![5.0, 7.0, 9.0]);
        CpuBackend::sum_rows(&g, 2, 3, &mut out, Assign::Add).unwrap();
        assert_eq!(f64s(&out), vec![10.0, 14.0, 18.0]);
    }

    #[test]
    fn test_add_row_broadcast() {
        let mut out = storage(&[0.0, 0.0, 1.0, 1.0]);
        let bias = storage(&[0.5, -0.5]);
        CpuBackend::add_row_broadcast(&mut out, 2, 2, &bias).unwrap();
        assert_eq!(f64s(&out), vec![0.5, -0.5, 1.5, 0.5]);
    }

    #[test]
    fn test_add_row_broadcast_wrong_bias_len() {
        let mut out = storage(&[0.0, 0.0]);
        let bias = storage(&[1.0, 2.0, 3.0]);
        let r = CpuBackend::add_row_broadcast(&mut out, 1, 2, &bias);
        assert!(matches!(r, Err(Error::ElementCountMismatch { .. })));
    }

    #[test]
    fn test_blob_alias_shares_storage() {
        let a = CpuBlob::zeros((2, 1, 1, 3), DType::F32, &CpuDevice).unwrap();
        let b = a.alias_as((2, 3)).unwrap();
        let c = CpuBlob::zeros((2, 3), DType::F32, &CpuDevice).unwrap();
        assert!(a.shares_storage(&b));
        assert!(!a.shares_storage(&c));
        assert!(a.alias_as((4, 2)).is_err());
    }

    #[test]
    fn test_blob_views() {
        let d = CpuBlob::zeros((2, 1, 1, 3), DType::F32, &CpuDevice).unwrap();
        assert_eq!(d.flat_2d().unwrap(), MatView::new(2, 3));
        assert!(d.matrix().is_err());
        let w = CpuBlob::zeros((4, 3), DType::F32, &CpuDevice).unwrap();
        assert_eq!(w.matrix().unwrap(), MatView::new(4, 3));
        let b = CpuBlob::zeros(4usize, DType::F32, &CpuDevice).unwrap();
        assert_eq!(b.vector().unwrap(), 4);
    }

    #[test]
    fn test_blob_from_slice_count_checked() {
        let r = CpuBlob::from_f64_slice(&[1.0, 2.0, 3.0], (2, 2), DType::F64, &CpuDevice);
        assert!(matches!(r, Err(Error::ElementCountMismatch { .. })));
    }
}
