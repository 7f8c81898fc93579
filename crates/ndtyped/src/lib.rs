//! # ndtyped
//!
//! Homogeneous, typed n-dimensional arrays built from nested literal data.
//!
//! This crate provides:
//! - [`TypedArray`]: contiguous row-major array with one element dtype
//! - [`Nested`] / [`Scalar`] / [`nested!`]: dynamically typed input literals
//! - [`DType`] / [`Element`]: element types and their Rust counterparts
//! - [`promote`] / [`result_dtype`]: dtype rules for element-wise arithmetic
//! - [`ArrayConfig`]: default dtypes and the parallel threshold
// - Shape: n-dimensional shape and row-major strides
// - Storage: owned byte buffers, encoding and casting between dtypes
// - Ops: element-wise kernels, sequential or on the rayon pool

pub mod array;
pub mod config;
pub mod dtype;
pub mod error;
pub mod ops;
pub mod scalar;
pub mod shape;
mod storage;

pub use array::TypedArray;
pub use config::ArrayConfig;
pub use dtype::{promote, result_dtype, DType, Element};
pub use error::{Error, ErrorKind, Result};
pub use ops::{BinaryOp, ScalarSide};
pub use scalar::{Nested, Scalar};
pub use shape::Shape;
