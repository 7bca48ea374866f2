// Operator — the numerical half of a layer
//
// An Operator is what a symbol turns into once it is bound to a device. The
// executor calls it with buffers it has already shaped and allocated:
//
//   forward(in_data, req, out_data)
//   backward(out_grad, in_data, out_data, req, in_grad)
//
// Operators never allocate, never keep a blob past the call, and validate
// every precondition before the first write. The only state they carry is
// their configuration, which is read-only after bind, so one operator can be
// shared across threads.

use dense_core::{Backend, OpReq, Result, RunContext, TBlob};

/// A device-bound operator invoked by an external executor.
pub trait Operator<B: Backend>: Send + Sync {
    /// Compute `out_data` from `in_data`. `req[i]` says how to write
    /// `out_data[i]`.
    fn forward(
        &self,
        ctx: RunContext<'_, B>,
        in_data: &[TBlob<B>],
        req: &[OpReq],
        out_data: &[TBlob<B>],
    ) -> Result<()>;

    /// Compute `in_grad` from `out_grad` and the retained forward values.
    /// `req[i]` says how to write `in_grad[i]`.
    fn backward(
        &self,
        ctx: RunContext<'_, B>,
        out_grad: &[TBlob<B>],
        in_data: &[TBlob<B>],
        out_data: &[TBlob<B>],
        req: &[OpReq],
        in_grad: &[TBlob<B>],
    ) -> Result<()>;
}
