//! Insertion-ordered dict contents.

use crate::error::{DataError, DataResult};
use crate::value::DataItem;
use std::collections::HashMap;

/// Key/value contents of one dict object
///
/// Keys keep their first insertion order. Setting a key to
/// [`DataItem::Missing`] keeps a tombstone so the entry masks fallbacks.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    values: HashMap<DataItem, DataItem>,
    keys: Vec<DataItem>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: DataItem, value: DataItem) {
        if !self.values.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.values.insert(key, value);
    }

    /// Local entry for `key`, including tombstones
    pub fn get(&self, key: &DataItem) -> Option<&DataItem> {
        self.values.get(key)
    }

    /// All locally known keys in insertion order, including tombstoned ones
    pub fn keys(&self) -> &[DataItem] {
        &self.keys
    }

    pub fn clear(&mut self) {
        for value in self.values.values_mut() {
            *value = DataItem::Missing;
        }
    }
}

/// Reject items that cannot be used as dict keys
pub fn validate_dict_key(key: &DataItem) -> DataResult<()> {
    match key {
        DataItem::Missing => Err(DataError::invalid_argument("dict keys cannot be missing")),
        DataItem::Float32(_) | DataItem::Float64(_) | DataItem::Expr(_) | DataItem::DType(_) => {
            Err(DataError::invalid_argument(format!(
                "dict keys cannot be {}",
                key.dtype().map_or("NONE", |d| d.name())
            )))
        }
        DataItem::ObjectId(id) if id.is_schema() => Err(DataError::invalid_argument(
            "dict keys cannot be SCHEMA",
        )),
        _ => Ok(()),
    }
}
