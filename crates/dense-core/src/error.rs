use crate::dtype::DType;
use crate::shape::Shape;

/// All errors that can occur while configuring, shape-checking or running
/// a dense operator.
///
/// Every variant is a contract violation detected *before* any output buffer
/// is touched, so a returned error always means "nothing was written".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shape mismatch between an expected and an actual shape.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Inner dimensions of a matrix product disagree: `[m, k1] · [k2, n]`.
    #[error("matmul shape mismatch: [{m}, {k1}] x [{k2}, {n}]")]
    MatmulShapeMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// Operation requires a specific rank (number of dimensions).
    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// A shape slot that must be known was still unset.
    #[error("shape of `{arg}` must be known")]
    UnknownShape { arg: &'static str },

    /// DType mismatch between buffers taking part in one call.
    #[error("dtype mismatch: expected {expected:?}, got {got:?}")]
    DTypeMismatch { expected: DType, got: DType },

    /// Element count of a buffer does not match the view requested on it.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Wrong number of buffers / shapes / requests passed to a call.
    #[error("{what}: expected {expected}, got {got}")]
    ArgumentCount {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A write request that the operator does not support for that slot.
    #[error("invalid request for `{slot}`: {reason}")]
    InvalidRequest { slot: &'static str, reason: String },

    /// A destination buffer shares storage with a buffer it may not alias.
    #[error("`{dst}` shares storage with `{src}`, which is not a declared in-place pair")]
    AliasViolation {
        dst: &'static str,
        src: &'static str,
    },

    /// A configuration option was given a value it cannot hold.
    #[error("invalid value {value:?} for parameter `{name}`: {reason}")]
    InvalidParam {
        name: String,
        value: String,
        reason: String,
    },

    /// A configuration option name that the operator does not know.
    #[error("unknown parameter `{name}`")]
    UnknownParam { name: String },

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }
}

/// Convenience Result type used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
