// AtomicSymbol — the graph-facing half of a layer
//
// A symbol describes an operator to the graph builder without touching any
// device:
//
//   list_arguments / list_outputs   named positional slots
//   set_param                       string configuration entry point
//   infer_shape                     validate + propagate shapes in place
//   declare_backward_dependency     which forward values backward reads
//   backward_inplace_option         which (grad, input) pairs may share memory
//
// The executor uses the last two to plan buffer lifetime: anything not
// declared as a dependency may be freed after forward, and only declared
// in-place pairs may be given aliased buffers. Both are correctness
// contracts, not hints.
//
// Index spaces: the dependency/in-place queries receive one id per slot
// (out_grad, in_data, out_data, in_grad) chosen by the executor, and answer
// in terms of those ids.

use std::fmt;

use dense_core::{Backend, Context, Error, Result, Shape};

use crate::operator::Operator;

/// Device-independent description of an operator node.
pub trait AtomicSymbol: Send + Sync + fmt::Debug {
    /// Names of the inputs, in positional order.
    fn list_arguments(&self) -> Vec<String>;

    /// Names of the outputs, in positional order.
    fn list_outputs(&self) -> Vec<String> {
        vec!["output".to_string()]
    }

    fn num_outputs(&self) -> usize {
        self.list_outputs().len()
    }

    /// Apply one configuration option by name.
    fn set_param(&mut self, name: &str, value: &str) -> Result<()>;

    /// Validate `in_shape`, fill in the slots that can be derived, and write
    /// the output shapes to `out_shape`.
    ///
    /// `None` marks an input shape that is not known yet. On error neither
    /// argument is modified.
    fn infer_shape(&self, in_shape: &mut [Option<Shape>], out_shape: &mut Vec<Shape>)
        -> Result<()>;

    /// An independent copy of this symbol's configuration.
    fn copy(&self) -> Box<dyn AtomicSymbol>;

    /// Stable name of the operator kind.
    fn type_string(&self) -> String;

    /// The subset of `out_grad`, `in_data` and `out_data` ids that backward
    /// reads. Defaults to all of them.
    fn declare_backward_dependency(
        &self,
        out_grad: &[usize],
        in_data: &[usize],
        out_data: &[usize],
    ) -> Result<Vec<usize>> {
        let mut deps = Vec::with_capacity(out_grad.len() + in_data.len() + out_data.len());
        deps.extend_from_slice(out_grad);
        deps.extend_from_slice(in_data);
        deps.extend_from_slice(out_data);
        Ok(deps)
    }

    /// `(in_grad, source)` pairs that may share storage in backward.
    fn backward_inplace_option(
        &self,
        _out_grad: &[usize],
        _in_data: &[usize],
        _out_data: &[usize],
        _in_grad: &[usize],
    ) -> Result<Vec<(usize, usize)>> {
        Ok(Vec::new())
    }
}

impl Clone for Box<dyn AtomicSymbol> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

/// A symbol that can be bound to a device of backend `B`.
pub trait BindSymbol<B: Backend>: AtomicSymbol {
    /// Create an operator carrying a copy of the current configuration.
    fn bind(&self, ctx: &Context<B>) -> Result<Box<dyn Operator<B>>>;
}

/// Two-way shape constraint: an unset slot takes `expected`, a set slot must
/// already equal it. Returns the resolved shape without touching the slot.
pub fn shape_assign_check(slot: &Option<Shape>, expected: Shape) -> Result<Shape> {
    match slot {
        Some(s) if s.rank() != 0 => {
            if *s != expected {
                return Err(Error::ShapeMismatch {
                    expected,
                    got: s.clone(),
                });
            }
            Ok(expected)
        }
        _ => Ok(expected),
    }
}

/// Look up the id at position `pos`, failing if the executor passed too few.
pub(crate) fn slot_id(ids: &[usize], pos: usize, what: &'static str) -> Result<usize> {
    ids.get(pos).copied().ok_or(Error::ArgumentCount {
        what,
        expected: pos + 1,
        got: ids.len(),
    })
}
