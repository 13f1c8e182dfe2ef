//! Primitive schema tags.

use std::fmt;

/// Primitive schema dtype
///
/// Used both as a schema (stored in [`DataItem::DType`](super::DataItem)) and
/// to describe the element type of a homogeneous slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    None,
    ItemId,
    Schema,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Bytes,
    Text,
    Expr,
    Object,
    Any,
}

impl DType {
    pub const ALL: [DType; 13] = [
        DType::None,
        DType::ItemId,
        DType::Schema,
        DType::Int32,
        DType::Int64,
        DType::Float32,
        DType::Float64,
        DType::Bool,
        DType::Bytes,
        DType::Text,
        DType::Expr,
        DType::Object,
        DType::Any,
    ];

    /// Upper-case name used in error messages and reprs
    pub fn name(self) -> &'static str {
        match self {
            DType::None => "NONE",
            DType::ItemId => "ITEMID",
            DType::Schema => "SCHEMA",
            DType::Int32 => "INT32",
            DType::Int64 => "INT64",
            DType::Float32 => "FLOAT32",
            DType::Float64 => "FLOAT64",
            DType::Bool => "BOOLEAN",
            DType::Bytes => "BYTES",
            DType::Text => "TEXT",
            DType::Expr => "EXPR",
            DType::Object => "OBJECT",
            DType::Any => "ANY",
        }
    }

    /// Stable numeric id, part of the fingerprint encoding
    pub fn type_id(self) -> u8 {
        match self {
            DType::None => 0,
            DType::ItemId => 1,
            DType::Schema => 2,
            DType::Int32 => 3,
            DType::Int64 => 4,
            DType::Float32 => 5,
            DType::Float64 => 6,
            DType::Bool => 7,
            DType::Bytes => 8,
            DType::Text => 9,
            DType::Expr => 10,
            DType::Object => 11,
            DType::Any => 12,
        }
    }

    /// Parse from the upper-case name (case-insensitive)
    pub fn from_name(s: &str) -> Option<Self> {
        DType::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(s))
    }

    /// True for dtypes whose values hold no object references
    pub fn is_primitive(self) -> bool {
        !matches!(
            self,
            DType::ItemId | DType::Schema | DType::Object | DType::Any | DType::None
        )
    }

    /// True when values of this dtype have a natural ascending order
    pub fn is_sortable(self) -> bool {
        matches!(
            self,
            DType::Int32
                | DType::Int64
                | DType::Float32
                | DType::Float64
                | DType::Bool
                | DType::Bytes
                | DType::Text
        )
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for dtype in DType::ALL {
            assert_eq!(DType::from_name(dtype.name()), Some(dtype));
        }
        assert_eq!(DType::from_name("int32"), Some(DType::Int32));
        assert_eq!(DType::from_name("nope"), None);
    }

    #[test]
    fn test_type_ids_unique() {
        let mut ids: Vec<u8> = DType::ALL.iter().map(|d| d.type_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DType::ALL.len());
    }

    #[test]
    fn test_sortable() {
        assert!(DType::Text.is_sortable());
        assert!(DType::Float32.is_sortable());
        assert!(!DType::Expr.is_sortable());
        assert!(!DType::ItemId.is_sortable());
    }
}
