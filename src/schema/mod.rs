//! # Schema Helpers
//!
//! A schema is either a [`DType`] or the [`ObjectId`] of an explicit schema
//! object. Explicit schemas declare their attributes as ordinary triples
//! `(schema, name) -> schema`. Containers use reserved attribute names:
//!
//! - list schemas declare exactly `__items__`
//! - dict schemas declare exactly `__keys__` and `__values__`
//!
//! Objects typed as `OBJECT` carry their own schema in `__schema__`.
//!
//! A *NoFollow* schema wraps another schema and marks the edge it is attached
//! to as not traversable by extraction and cloning.

use crate::error::{DataError, DataResult};
use crate::value::{DType, DataItem, ObjectId};

/// Embedded per-object schema attribute
pub const SCHEMA_ATTR: &str = "__schema__";
/// List item schema attribute
pub const LIST_ITEMS_SCHEMA_ATTR: &str = "__items__";
/// Dict key schema attribute
pub const DICT_KEYS_SCHEMA_ATTR: &str = "__keys__";
/// Dict value schema attribute
pub const DICT_VALUES_SCHEMA_ATTR: &str = "__values__";

/// Wrap a schema into its NoFollow form
///
/// Only `OBJECT` and explicit schemas can be wrapped. Wrapping twice is an
/// error.
pub fn nofollow_schema_item(schema: &DataItem) -> DataResult<DataItem> {
    match schema {
        DataItem::DType(DType::Object) => {
            Ok(DataItem::ObjectId(ObjectId::nofollow_object_schema_id()))
        }
        DataItem::DType(dtype) => Err(DataError::invalid_argument(format!(
            "calling nofollow on {dtype} slice is not allowed"
        ))),
        DataItem::ObjectId(id) if !id.is_schema() => Err(DataError::internal(
            "calling nofollow on a non-schema is not allowed",
        )),
        DataItem::ObjectId(id) if id.is_nofollow_schema() => Err(DataError::invalid_argument(
            "calling nofollow on a nofollow slice is not allowed",
        )),
        DataItem::ObjectId(id) => Ok(DataItem::ObjectId(id.with_nofollow())),
        _ => Err(DataError::internal(
            "schema can be either a DType or ObjectId schema",
        )),
    }
}

/// The schema wrapped by a NoFollow schema
pub fn get_nofollowed_schema_item(schema: &DataItem) -> DataResult<DataItem> {
    match schema {
        DataItem::ObjectId(id) if *id == ObjectId::nofollow_object_schema_id() => {
            Ok(DataItem::DType(DType::Object))
        }
        DataItem::ObjectId(id) if id.is_nofollow_schema() => {
            Ok(DataItem::ObjectId(id.without_nofollow()))
        }
        _ => Err(DataError::invalid_argument(
            "a nofollow schema is required in get_nofollowed_schema",
        )),
    }
}

pub fn is_nofollow_schema(schema: &DataItem) -> bool {
    schema.as_object_id().is_some_and(|id| id.is_nofollow_schema())
}

/// Fail unless `item` is a DType or a schema object id
pub fn verify_is_schema(item: &DataItem) -> DataResult<()> {
    if item.is_schema() {
        Ok(())
    } else {
        Err(DataError::invalid_argument(format!(
            "schema must be a DType or a schema ObjectId, got: {item}"
        )))
    }
}

/// Fail for schemas whose values cannot be dict keys
pub fn verify_dict_key_schema(schema: &DataItem) -> DataResult<()> {
    match schema {
        DataItem::DType(DType::None | DType::Float32 | DType::Float64 | DType::Expr) => Err(
            DataError::invalid_argument(format!("dict keys cannot be {schema}")),
        ),
        _ => Ok(()),
    }
}

/// True for the reserved container attribute names
pub fn is_container_attr(name: &str) -> bool {
    matches!(
        name,
        LIST_ITEMS_SCHEMA_ATTR | DICT_KEYS_SCHEMA_ATTR | DICT_VALUES_SCHEMA_ATTR
    )
}
