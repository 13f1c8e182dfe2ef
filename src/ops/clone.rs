//! Deep clone: shallow clone, then extract through the combined bags.
//!
//! The shallow clone re-identifies the top-level objects and copies their
//! first level. Extracting the new ids from a bag that falls back from the
//! shallow-clone bag to the original one then pulls in everything reachable
//! below, keeping the ids of nested objects.

use super::extract::{ExtractOp, ShallowCloneOp};
use crate::config::StoreConfig;
use crate::data_bag::DataBag;
use crate::error::{DataError, DataResult};
use crate::slice::DataSlice;
use tracing::debug;

/// Deep clone with output stores pre-sized to `capacity`
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneOp {
    capacity: usize,
}

impl CloneOp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        CloneOp {
            capacity: config.initial_capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn eval(&self, ds: &DataSlice, schema: &DataSlice) -> DataResult<DataSlice> {
        let original = ds
            .bag()
            .cloned()
            .ok_or_else(|| DataError::invalid_argument("cannot clone without a DataBag"))?;
        let shallow = ShallowCloneOp::with_capacity(self.capacity).eval(ds, schema)?;
        let combined =
            DataBag::immutable_empty_with_fallbacks([shallow.bag().cloned(), Some(original)]);
        debug!(size = ds.size(), "clone_extract");
        let shallow = shallow.with_bag(Some(combined));
        ExtractOp::with_capacity(self.capacity).eval(&shallow, &shallow.schema_slice())
    }
}

/// Deep copy of `ds` with fresh top-level ids in a new bag
pub fn clone(ds: &DataSlice) -> DataResult<DataSlice> {
    clone_with_schema(ds, &ds.schema_slice())
}

pub fn clone_with_schema(ds: &DataSlice, schema: &DataSlice) -> DataResult<DataSlice> {
    CloneOp::new().eval(ds, schema)
}
