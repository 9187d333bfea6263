//! implore-readers - Lazy, parameterizable data pipelines
//!
//! This crate describes data access declaratively and defers all work:
//!
//! - **DataType**: where raw data lives (`Csv`, `Bytes`, or another reader's output)
//! - **Reader**: a data type plus an ordered list of steps, extended by chaining
//! - **Combinators**: `equals` comparison and the `Retry` wrapper
//! - **Entry**: a serializable capture of a reader whose literals can become parameters
//! - **Catalog**: named entries that rebuild live readers on access
//!
//! # Example
//!
//! ```ignore
//! use implore_readers::{Catalog, DataType, Reader};
//!
//! let reader = Reader::frame_csv(DataType::csv("memory://data.csv"))
//!     .get_item(vec!["apple", "beet"])
//!     .set_index("beet");
//!
//! let mut catalog = Catalog::new();
//! catalog.insert("fruit", &reader)?;
//! let frame = catalog.read("fruit")?;
//! ```

pub mod catalog;
pub mod config;
pub mod datatypes;
pub mod entry;
pub mod error;
pub mod functions;
pub mod namespace;
pub mod node;
pub mod readers;
pub mod retry;
pub mod step;
pub mod utils;
pub mod value;

pub use catalog::Catalog;
pub use config::ReadersConfig;
pub use datatypes::{DataType, FileData};
pub use entry::{Entry, EntryKind, Parameter, ToEntry};
pub use error::{ErrorClass, ReaderError, ReaderResult};
pub use functions::{register_function, FunctionRegistry, PipelineFn};
pub use namespace::{Namespace, NamespaceProxy};
pub use node::{Kwargs, Node};
pub use readers::{Reader, ReaderKind};
pub use retry::{Retry, RetryOutcome, RetryState};
pub use step::Step;
pub use utils::descend_to_path;
pub use value::Value;
