//! implore-frame - Tabular engine for implore readers
//!
//! This crate provides the capabilities a reader pipeline executes against:
//!
//! - **Storage**: byte streams opened by URL (`memory://`, `file://`, bare paths)
//! - **CSV**: materialization into a `DataFrame` with type inference
//! - **Frames**: column selection, `set_index`, `head`/`tail`, value equality
//! - **Numerics**: reductions (`max`, `min`, `sum`, `mean`, `count`)
//!
//! # Design
//!
//! Everything here is eager; laziness lives in `implore-readers`, which only
//! calls into this crate when a pipeline is read.

pub mod error;
pub mod frame;
pub mod numerics;
pub mod schema;
pub mod storage;

#[cfg(feature = "csv")]
pub mod csv_reader;

pub use error::{FrameError, FrameResult};
pub use frame::{DataFrame, Index, Series};
pub use numerics::Reduction;
pub use schema::{Column, ColumnType, Scalar};
