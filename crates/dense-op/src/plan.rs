// BackwardPlan — what an executor derives from a symbol before dispatch
//
// The executor numbers every value a node touches in backward:
//
//   out_grad  0 .. n_out
//   in_data   n_out .. n_out + n_in
//   out_data  next n_out
//   in_grad   next n_in
//
// and asks the symbol which of them backward reads and which gradient may
// share storage with which input. From the answers it can free forward
// values early and refuse in-place requests the symbol never declared safe.

use dense_core::{bail, Error, OpReq, Result};

use crate::symbol::AtomicSymbol;

/// Buffer-lifetime and aliasing plan for one node's backward pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackwardPlan {
    arguments: Vec<String>,
    out_grad: Vec<usize>,
    in_data: Vec<usize>,
    out_data: Vec<usize>,
    in_grad: Vec<usize>,
    retained: Vec<usize>,
    inplace: Vec<(usize, usize)>,
}

impl BackwardPlan {
    pub fn new(symbol: &dyn AtomicSymbol) -> Result<Self> {
        let arguments = symbol.list_arguments();
        let n_in = arguments.len();
        let n_out = symbol.num_outputs();

        let mut next = 0..;
        let mut take = |n: usize| -> Vec<usize> { next.by_ref().take(n).collect() };
        let out_grad = take(n_out);
        let in_data = take(n_in);
        let out_data = take(n_out);
        let in_grad = take(n_in);

        let retained = symbol.declare_backward_dependency(&out_grad, &in_data, &out_data)?;
        let inplace = symbol.backward_inplace_option(&out_grad, &in_data, &out_data, &in_grad)?;

        Ok(BackwardPlan {
            arguments,
            out_grad,
            in_data,
            out_data,
            in_grad,
            retained,
            inplace,
        })
    }

    pub fn out_grad_ids(&self) -> &[usize] {
        &self.out_grad
    }

    pub fn in_data_ids(&self) -> &[usize] {
        &self.in_data
    }

    pub fn out_data_ids(&self) -> &[usize] {
        &self.out_data
    }

    pub fn in_grad_ids(&self) -> &[usize] {
        &self.in_grad
    }

    /// Values backward reads; they must stay alive until it runs.
    pub fn retained(&self) -> &[usize] {
        &self.retained
    }

    pub fn is_retained(&self, id: usize) -> bool {
        self.retained.contains(&id)
    }

    /// Forward inputs and outputs backward never reads.
    pub fn releasable(&self) -> Vec<usize> {
        self.in_data
            .iter()
            .chain(&self.out_data)
            .copied()
            .filter(|id| !self.is_retained(*id))
            .collect()
    }

    /// Declared `(in_grad, source)` pairs.
    pub fn inplace_pairs(&self) -> &[(usize, usize)] {
        &self.inplace
    }

    /// Check a backward request vector (one entry per input gradient) against
    /// the declared in-place pairs.
    pub fn check_requests(&self, req: &[OpReq]) -> Result<()> {
        if req.len() != self.in_grad.len() {
            return Err(Error::ArgumentCount {
                what: "backward requests",
                expected: self.in_grad.len(),
                got: req.len(),
            });
        }
        for (i, r) in req.iter().enumerate() {
            let OpReq::Inplace(src) = *r else {
                continue;
            };
            let declared = self
                .in_data
                .get(src)
                .is_some_and(|&src_id| self.inplace.contains(&(self.in_grad[i], src_id)));
            if !declared {
                let source = self
                    .arguments
                    .get(src)
                    .map_or_else(|| format!("input {}", src), |name| format!("`{}`", name));
                bail!(
                    "gradient of `{}` may not alias {}: not a declared in-place pair",
                    self.arguments[i],
                    source
                );
            }
        }
        Ok(())
    }
}
