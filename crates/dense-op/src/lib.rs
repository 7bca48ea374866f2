//! # dense-op
//!
//! The fully connected layer, split the way a graph framework consumes it:
//!
//! 1. **Operator** — device-bound forward/backward over executor-owned blobs
//! 2. **AtomicSymbol** — device-free description: arguments, configuration,
//!    shape inference, backward dependencies, in-place options
//! 3. **BindSymbol** — turns a symbol into an operator for a given backend
//! 4. **BackwardPlan** — what an executor derives from a symbol before it
//!    frees buffers or grants in-place requests
//!
//! The operator is generic over `Backend`, so the same code runs on every
//! device that provides the dense kernels in `dense_core::Backend`.

pub mod finite_diff;
pub mod fully_connected;
pub mod operator;
pub mod param;
pub mod plan;
pub mod symbol;

pub use fully_connected::{FcInput, FullyConnectedOp, FullyConnectedSymbol, FC_OUTPUT};
pub use operator::Operator;
pub use param::FullyConnectedParam;
pub use plan::BackwardPlan;
pub use symbol::{shape_assign_check, AtomicSymbol, BindSymbol};
