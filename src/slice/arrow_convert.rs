//! Arrow Conversion Utilities
//!
//! Converts between [`DataSliceImpl`] and Arrow arrays for the primitive
//! column types. Object ids, dtypes, expressions and mixed slices have no
//! Arrow counterpart and are rejected.

use super::{DataSliceImpl, TypedValues};
use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Float32Array, Float64Array, Int32Array,
    Int64Array, NullArray, StringArray,
};
use std::sync::Arc;

/// Error type for Arrow conversion operations
#[derive(Debug, thiserror::Error)]
pub enum ArrowConvertError {
    /// Unsupported data type
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
}

impl DataSliceImpl {
    /// Build a slice from an Arrow array; nulls become missing items
    pub fn from_arrow(array: &dyn Array) -> Result<Self, ArrowConvertError> {
        let any = array.as_any();
        if any.downcast_ref::<NullArray>().is_some() {
            return Ok(DataSliceImpl::create_empty_and_unknown_type(array.len()));
        }
        let values = if let Some(arr) = any.downcast_ref::<BooleanArray>() {
            TypedValues::Bool(arr.iter().collect())
        } else if let Some(arr) = any.downcast_ref::<Int32Array>() {
            TypedValues::Int32(arr.iter().collect())
        } else if let Some(arr) = any.downcast_ref::<Int64Array>() {
            TypedValues::Int64(arr.iter().collect())
        } else if let Some(arr) = any.downcast_ref::<Float32Array>() {
            TypedValues::Float32(arr.iter().collect())
        } else if let Some(arr) = any.downcast_ref::<Float64Array>() {
            TypedValues::Float64(arr.iter().collect())
        } else if let Some(arr) = any.downcast_ref::<StringArray>() {
            TypedValues::Text(arr.iter().map(|v| v.map(Arc::from)).collect())
        } else if let Some(arr) = any.downcast_ref::<BinaryArray>() {
            TypedValues::Bytes(arr.iter().map(|v| v.map(Arc::from)).collect())
        } else {
            return Err(ArrowConvertError::UnsupportedType(format!(
                "Cannot convert array type: {:?}",
                array.data_type()
            )));
        };
        Ok(DataSliceImpl::from_typed(values))
    }

    /// Convert to an Arrow array
    pub fn to_arrow(&self) -> Result<ArrayRef, ArrowConvertError> {
        if self.is_empty_and_unknown() {
            return Ok(Arc::new(NullArray::new(self.size())));
        }
        let Some(values) = self.typed_values() else {
            return Err(ArrowConvertError::UnsupportedType(
                "mixed dtype slices have no arrow representation".to_string(),
            ));
        };
        let array: ArrayRef = match values {
            TypedValues::Bool(v) => Arc::new(BooleanArray::from(v.clone())),
            TypedValues::Int32(v) => Arc::new(Int32Array::from(v.clone())),
            TypedValues::Int64(v) => Arc::new(Int64Array::from(v.clone())),
            TypedValues::Float32(v) => Arc::new(Float32Array::from(v.clone())),
            TypedValues::Float64(v) => Arc::new(Float64Array::from(v.clone())),
            TypedValues::Text(v) => Arc::new(StringArray::from(
                v.iter().map(|s| s.as_deref()).collect::<Vec<Option<&str>>>(),
            )),
            TypedValues::Bytes(v) => Arc::new(BinaryArray::from_opt_vec(
                v.iter().map(|b| b.as_deref()).collect(),
            )),
            other => {
                return Err(ArrowConvertError::UnsupportedType(other.dtype().to_string()))
            }
        };
        Ok(array)
    }
}
