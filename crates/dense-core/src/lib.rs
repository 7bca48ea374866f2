//! # dense-core
//!
//! Core types shared by every dense operator and backend.
//!
//! This crate provides:
//! - [`Shape`] — dimension tuple with the flat 2-D view kernels operate on
//! - [`DType`] / [`WithDType`] — element types (F32, F64)
//! - [`Backend`] trait — the dense kernels a device must provide
//! - [`TBlob`] — handle on an executor-owned buffer
//! - [`OpReq`] — per-slot write request, including explicit in-place aliasing
//! - [`Context`] / [`RunContext`] — device binding and per-call resources
//! - [`Error`] / [`Result`] — contract violations

pub mod backend;
pub mod blob;
pub mod context;
pub mod dtype;
pub mod error;
pub mod req;
pub mod shape;

pub use backend::{Assign, Backend, BackendDevice, BackendStorage, MatView};
pub use blob::TBlob;
pub use context::{Context, RunContext};
pub use dtype::{DType, WithDType};
pub use error::{Error, Result};
pub use req::OpReq;
pub use shape::Shape;
