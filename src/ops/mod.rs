//! # Operators
//!
//! - [`extract`]: reachable-subgraph extraction and shallow clone
//! - [`clone`]: deep clone built from the two
//! - [`group_by`]: grouping indices and unique values over jagged slices
//! - [`registry`]: named operator dispatch over `DataSlice` arguments

pub mod clone;
pub mod extract;
pub mod group_by;
pub mod registry;

pub use clone::{clone, clone_with_schema, CloneOp};
pub use extract::{
    extract, extract_with_schema, shallow_clone, shallow_clone_with_schema, BagRef, ExtractOp,
    ShallowCloneOp,
};
pub use group_by::{unique, GroupByIndicesOp};
pub use registry::{Operator, OperatorRegistry};
