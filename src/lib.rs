//! # DataBag Engine
//!
//! An in-memory, schema-typed object graph store over jagged columnar slices,
//! with graph extraction, cloning and grouping operators.
//!
//! ## Data Model
//!
//! ```text
//! DataSlice
//!     ├── DataSliceImpl  (flat typed or mixed column of DataItems)
//!     ├── JaggedShape    (edges of the ragged dimensions)
//!     ├── schema         (DType or explicit schema ObjectId)
//!     └── DataBag        (triples, lists, dicts + fallback bags)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use databag::{DataBag, DataSlice, OperatorRegistry, Config};
//!
//! let registry = OperatorRegistry::new(Config::load()?);
//! let extracted = registry.eval("core.extract", &[slice])?;
//! let groups = registry.eval("core.group_by_indices_sorted", &[keys])?;
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `value` | `DataItem`, `ObjectId` allocation, dtypes, fingerprints |
//! | `slice` | `DataSliceImpl`, jagged shapes, `DataSlice`, Arrow interop |
//! | `data_bag` | Triple store with fallback chains |
//! | `schema` | Reserved attributes, NoFollow schemas |
//! | `ops` | Extract, clone, group-by, unique, operator registry |

// Columnar primitives
pub mod slice;
pub mod value;

// Object graph store
pub mod data_bag;
pub mod schema;

// Operators
pub mod ops;

// Ambient
pub mod config; // Configuration system
pub mod error; // Error types
pub mod logging; // Tracing subscriber setup

// Re-export public types
pub use config::{Config, GroupByConfig, LogFormat, LoggingConfig, StoreConfig};
pub use data_bag::{DataBag, DataBagImpl, FlattenFallbackFinder};
pub use error::{DataError, DataResult, ErrorKind};
pub use ops::{
    clone, extract, extract_with_schema, shallow_clone, shallow_clone_with_schema, unique,
    BagRef, CloneOp, ExtractOp, GroupByIndicesOp, Operator, OperatorRegistry, ShallowCloneOp,
};
pub use slice::{DataSlice, DataSliceImpl, Edge, JaggedShape};
pub use value::{DType, DataItem, ObjectId};
