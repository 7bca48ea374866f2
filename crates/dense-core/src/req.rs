use std::fmt;

use crate::backend::Assign;

// OpReq — what the executor asks an operator to do with one output slot
//
// Every output buffer an operator writes (forward outputs, backward input
// gradients) comes with one of these tags. The in-place variant names the
// input slot the destination aliases, so the aliasing is explicit in the
// request instead of an unchecked convention: the executor can compare it
// against the symbol's declared in-place pairs before dispatch, and the
// operator can refuse aliases it never declared safe.

/// Per-slot write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpReq {
    /// Nothing is requested; the slot is left untouched.
    Null,
    /// Overwrite the destination.
    #[default]
    Write,
    /// Add the result into the destination's existing contents.
    Accumulate,
    /// Overwrite a destination that shares storage with input slot `.0`.
    /// The result must be identical to `Write`.
    Inplace(usize),
}

impl OpReq {
    /// The kernel-level assignment this request maps to, or `None` for `Null`.
    pub fn assign(&self) -> Option<Assign> {
        match self {
            OpReq::Null => None,
            OpReq::Write | OpReq::Inplace(_) => Some(Assign::Write),
            OpReq::Accumulate => Some(Assign::Add),
        }
    }

    pub fn is_inplace(&self) -> bool {
        matches!(self, OpReq::Inplace(_))
    }
}

impl fmt::Display for OpReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpReq::Null => write!(f, "null"),
            OpReq::Write => write!(f, "write"),
            OpReq::Accumulate => write!(f, "accumulate"),
            OpReq::Inplace(slot) => write!(f, "inplace({})", slot),
        }
    }
}
