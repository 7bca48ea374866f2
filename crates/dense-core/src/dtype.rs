use std::fmt;

// DType — Supported numeric data types
//
// Dense layers only ever run in floating point:
//
//   F32  — 32-bit float, the default workhorse
//   F64  — 64-bit float, for high-precision work and gradient checking

/// Enum of all supported element data types.
///
/// Stored inside every buffer handle so kernels can dispatch to the correct
/// typed implementation at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    #[default]
    F32,
    F64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        write!(f, "{}", s)
    }
}

// WithDType — bridge between Rust element types and the DType enum.
//
// Backends write their kernels once, generic over `T: WithDType`, and pick
// the instantiation from the runtime DType of the storage.

/// Trait implemented by Rust types that can be stored in a buffer.
///
/// The arithmetic comes from `num_traits::Float`; this trait only adds the
/// mapping to the runtime DType.
pub trait WithDType:
    num_traits::Float + std::ops::AddAssign + Send + Sync + 'static + fmt::Debug
{
    /// The corresponding DType enum variant.
    const DTYPE: DType;
}

impl WithDType for f32 {
    const DTYPE: DType = DType::F32;
}

impl WithDType for f64 {
    const DTYPE: DType = DType::F64;
}
