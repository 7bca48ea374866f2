use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::{check_len, Backend, BackendStorage, MatView};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::shape::Shape;

// TBlob — A handle on an executor-owned buffer
//
// The executor allocates every buffer and hands operators a TBlob per call.
// A TBlob is a handle: shape + dtype + device + a shared pointer to the
// storage. Cloning it is O(1) and yields a second handle on the *same*
// storage, which is exactly how an executor expresses in-place reuse (the
// data-gradient blob is a clone of the data blob).
//
// Storage is behind Arc<RwLock<..>> so that:
//   - several blobs can read the same buffer at once
//   - a kernel writes through a write lock, never through a shared borrow
//   - aliasing between two blobs is observable (`shares_storage`), which
//     lets operators reject aliases they never declared safe

/// Handle on a dense, row-major buffer owned by the executor.
pub struct TBlob<B: Backend> {
    storage: Arc<RwLock<B::Storage>>,
    shape: Shape,
    dtype: DType,
    device: B::Device,
}

impl<B: Backend> Clone for TBlob<B> {
    fn clone(&self) -> Self {
        TBlob {
            storage: Arc::clone(&self.storage),
            shape: self.shape.clone(),
            dtype: self.dtype,
            device: self.device.clone(),
        }
    }
}

impl<B: Backend> std::fmt::Debug for TBlob<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TBlob(shape={}, dtype={}, device={:?})",
            self.shape, self.dtype, self.device,
        )
    }
}

impl<B: Backend> TBlob<B> {
    /// Wrap existing storage. The storage must hold exactly
    /// `shape.elem_count()` elements.
    pub fn new(storage: B::Storage, shape: impl Into<Shape>, device: &B::Device) -> Result<Self> {
        let shape = shape.into();
        check_len(&storage, shape.clone())?;
        Ok(TBlob {
            dtype: storage.dtype(),
            storage: Arc::new(RwLock::new(storage)),
            shape,
            device: device.clone(),
        })
    }

    /// Allocate a zero-filled buffer.
    pub fn zeros(shape: impl Into<Shape>, dtype: DType, device: &B::Device) -> Result<Self> {
        let shape = shape.into();
        let storage = B::zeros(&shape, dtype, device)?;
        Self::new(storage, shape, device)
    }

    /// Allocate a buffer holding `data` (row-major) converted to `dtype`.
    pub fn from_f64_slice(
        data: &[f64],
        shape: impl Into<Shape>,
        dtype: DType,
        device: &B::Device,
    ) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.elem_count() {
            return Err(Error::ElementCountMismatch {
                expected: shape.elem_count(),
                got: data.len(),
                shape,
            });
        }
        let storage = B::from_f64_slice(data, dtype, device)?;
        Self::new(storage, shape, device)
    }

    /// A second handle on the same storage, viewed with another shape of the
    /// same element count.
    pub fn alias_as(&self, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if shape.elem_count() != self.elem_count() {
            return Err(Error::ElementCountMismatch {
                expected: shape.elem_count(),
                got: self.elem_count(),
                shape,
            });
        }
        Ok(TBlob {
            storage: Arc::clone(&self.storage),
            shape,
            dtype: self.dtype,
            device: self.device.clone(),
        })
    }

    // Accessors

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Whether both handles point at the same physical buffer.
    pub fn shares_storage(&self, other: &TBlob<B>) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Access the underlying storage (read lock).
    pub fn read(&self) -> RwLockReadGuard<'_, B::Storage> {
        self.storage.read().expect("storage lock poisoned")
    }

    /// Access the underlying storage (write lock).
    pub fn write(&self) -> RwLockWriteGuard<'_, B::Storage> {
        self.storage.write().expect("storage lock poisoned")
    }

    /// Copy the contents to the host as f64.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        B::to_f64_vec(&self.read())
    }

    // Views

    /// The blob as a 2-D matrix: first dimension kept, the rest collapsed.
    pub fn flat_2d(&self) -> Result<MatView> {
        let (rows, cols) = self.shape.flat_2d()?;
        Ok(MatView::new(rows, cols))
    }

    /// The blob as a 2-D matrix; its rank must be exactly 2.
    pub fn matrix(&self) -> Result<MatView> {
        self.expect_rank(2)?;
        let d = self.dims();
        Ok(MatView::new(d[0], d[1]))
    }

    /// The blob as a vector; its rank must be exactly 1. Returns its length.
    pub fn vector(&self) -> Result<usize> {
        self.expect_rank(1)?;
        Ok(self.dims()[0])
    }

    fn expect_rank(&self, rank: usize) -> Result<()> {
        if self.rank() != rank {
            return Err(Error::RankMismatch {
                expected: rank,
                got: self.rank(),
            });
        }
        Ok(())
    }
}
