//! # Dense
//!
//! A fully connected layer primitive for graph-based training frameworks.
//!
//! This is the facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```rust
//! use dense::prelude::*;
//!
//! let mut sym = FullyConnectedSymbol::default();
//! sym.set_param("num_hidden", "4").unwrap();
//!
//! let mut in_shape = vec![Some(Shape::from((2, 1, 1, 3))), None, None];
//! let mut out_shape = Vec::new();
//! sym.infer_shape(&mut in_shape, &mut out_shape).unwrap();
//! assert_eq!(out_shape[0], Shape::from((2, 1, 1, 4)));
//!
//! let ctx = Context::<CpuBackend>::new(CpuDevice);
//! let op = sym.bind(&ctx).unwrap();
//! # let _ = op;
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | `dense-core` | Shape, DType, TBlob, OpReq, Context, Backend trait, Error |
//! | `dense-cpu` | CPU backend with rayon-parallel GEMM |
//! | `dense-op` | FullyConnected operator + symbol, BackwardPlan, finite differences |

/// Re-export core types.
pub use dense_core::{
    backend::{Assign, Backend, BackendDevice, BackendStorage, MatView},
    Context, DType, Error, OpReq, Result, RunContext, Shape, TBlob, WithDType,
};

/// Re-export CPU backend.
pub use dense_cpu::{CpuBackend, CpuBlob, CpuDevice, CpuStorage};

/// Re-export operators and symbols.
pub mod op {
    pub use dense_op::*;
}

pub mod prelude {
    pub use crate::op::{
        AtomicSymbol, BackwardPlan, BindSymbol, FcInput, FullyConnectedOp, FullyConnectedParam,
        FullyConnectedSymbol, Operator,
    };
    pub use crate::{
        Backend, Context, CpuBackend, CpuBlob, CpuDevice, DType, Error, OpReq, Result, Shape,
        TBlob,
    };
}
