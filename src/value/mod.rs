//! # Value Type System
//!
//! The scalar building blocks of the engine:
//!
//! - [`DataItem`]: a closed tagged union over the supported primitive types,
//!   object ids, schema dtypes, and expression quotes, plus "missing"
//! - [`ObjectId`]/[`AllocationId`]: identities of entities, lists, dicts and
//!   schemas
//! - [`DType`]: primitive schema tags
//!
//! ## Design Decisions
//!
//! - **Closed enum**: all dispatch (hashing, ordering, printing) is an
//!   exhaustive `match`, no trait objects
//! - **Bitwise float identity**: `Float32`/`Float64` compare and hash by bit
//!   pattern so they can be used as grouping and dict keys
//! - **Stable fingerprint**: SHA-256 over a canonical encoding, identical
//!   across processes
//!
//! ## Usage
//!
//! ```rust
//! use databag::value::{DataItem, DType};
//!
//! let a = DataItem::from(1);
//! let t = DataItem::text("hello");
//! assert_eq!(a.dtype(), Some(DType::Int32));
//! assert_eq!(t.to_string(), "'hello'");
//! assert!(DataItem::Missing.is_missing());
//! ```

pub mod dtype;
pub mod fingerprint;
pub mod object_id;

pub use dtype::DType;
pub use fingerprint::{Fingerprint, StableHasher};
pub use object_id::{
    allocate_dicts, allocate_explicit_schema, allocate_lists, allocate_objects, AllocationId,
    ObjectId, ObjectKind,
};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A quoted expression, carried as an opaque value
///
/// Quotes are hashable but have no natural order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExprQuote(Arc<str>);

impl ExprQuote {
    pub fn new(expr: &str) -> Self {
        ExprQuote(Arc::from(expr))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExprQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprQuote('{}')", self.0)
    }
}

/// A single value or "missing"
#[derive(Debug, Clone, Default)]
pub enum DataItem {
    /// Absent value
    #[default]
    Missing,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// UTF-8 text (reference counted for cheap cloning)
    Text(Arc<str>),
    Bytes(Arc<[u8]>),
    /// Reference to an entity, list, dict or schema object
    ObjectId(ObjectId),
    /// A primitive schema
    DType(DType),
    Expr(ExprQuote),
}

impl DataItem {
    pub fn text(s: &str) -> Self {
        DataItem::Text(Arc::from(s))
    }

    pub fn bytes(b: &[u8]) -> Self {
        DataItem::Bytes(Arc::from(b))
    }

    pub fn expr(e: &str) -> Self {
        DataItem::Expr(ExprQuote::new(e))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, DataItem::Missing)
    }

    pub fn has_value(&self) -> bool {
        !self.is_missing()
    }

    /// The dtype describing this value; `None` when missing
    ///
    /// Object ids report `ITEMID`, dtypes report `SCHEMA`.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            DataItem::Missing => None,
            DataItem::Bool(_) => Some(DType::Bool),
            DataItem::Int32(_) => Some(DType::Int32),
            DataItem::Int64(_) => Some(DType::Int64),
            DataItem::Float32(_) => Some(DType::Float32),
            DataItem::Float64(_) => Some(DType::Float64),
            DataItem::Text(_) => Some(DType::Text),
            DataItem::Bytes(_) => Some(DType::Bytes),
            DataItem::ObjectId(_) => Some(DType::ItemId),
            DataItem::DType(_) => Some(DType::Schema),
            DataItem::Expr(_) => Some(DType::Expr),
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            DataItem::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_dtype(&self) -> Option<DType> {
        match self {
            DataItem::DType(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataItem::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DataItem::Int32(v) => Some(i64::from(*v)),
            DataItem::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataItem::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True if this item can be used as a schema (dtype or schema object id)
    pub fn is_schema(&self) -> bool {
        match self {
            DataItem::DType(_) => true,
            DataItem::ObjectId(id) => id.is_schema(),
            _ => false,
        }
    }

    /// True for the given primitive schema
    pub fn is_dtype(&self, dtype: DType) -> bool {
        self.as_dtype() == Some(dtype)
    }

    /// Order two items of the same sortable type
    ///
    /// Returns `None` for mixed types, missing values, and types without a
    /// natural order (object ids, dtypes, expressions).
    pub fn sort_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (DataItem::Bool(a), DataItem::Bool(b)) => Some(a.cmp(b)),
            (DataItem::Int32(a), DataItem::Int32(b)) => Some(a.cmp(b)),
            (DataItem::Int64(a), DataItem::Int64(b)) => Some(a.cmp(b)),
            (DataItem::Float32(a), DataItem::Float32(b)) => Some(a.total_cmp(b)),
            (DataItem::Float64(a), DataItem::Float64(b)) => Some(a.total_cmp(b)),
            (DataItem::Text(a), DataItem::Text(b)) => Some(a.cmp(b)),
            (DataItem::Bytes(a), DataItem::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Stable, process-independent fingerprint of the value
    pub fn stable_fingerprint(&self) -> Fingerprint {
        let mut hasher = StableHasher::new("data_item");
        self.combine_into(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn combine_into(&self, hasher: &mut StableHasher) {
        hasher.combine_u8(self.variant_tag());
        match self {
            DataItem::Missing => {}
            DataItem::Bool(b) => {
                hasher.combine_u8(u8::from(*b));
            }
            DataItem::Int32(v) => {
                hasher.combine_bytes(&v.to_le_bytes());
            }
            DataItem::Int64(v) => {
                hasher.combine_bytes(&v.to_le_bytes());
            }
            DataItem::Float32(v) => {
                hasher.combine_bytes(&v.to_bits().to_le_bytes());
            }
            DataItem::Float64(v) => {
                hasher.combine_bytes(&v.to_bits().to_le_bytes());
            }
            DataItem::Text(s) => {
                hasher.combine_str(s);
            }
            DataItem::Bytes(b) => {
                hasher.combine_bytes(b);
            }
            DataItem::ObjectId(id) => {
                hasher.combine_bytes(&id.to_le_bytes());
            }
            DataItem::DType(d) => {
                hasher.combine_u8(d.type_id());
            }
            DataItem::Expr(e) => {
                hasher.combine_str(e.as_str());
            }
        }
    }

    fn variant_tag(&self) -> u8 {
        match self {
            DataItem::Missing => 0,
            DataItem::Bool(_) => 1,
            DataItem::Int32(_) => 2,
            DataItem::Int64(_) => 3,
            DataItem::Float32(_) => 4,
            DataItem::Float64(_) => 5,
            DataItem::Text(_) => 6,
            DataItem::Bytes(_) => 7,
            DataItem::ObjectId(_) => 8,
            DataItem::DType(_) => 9,
            DataItem::Expr(_) => 10,
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, s: String) -> fmt::Result {
    if s.contains('.') || s.contains("inf") || s.contains("NaN") {
        f.write_str(&s)
    } else {
        write!(f, "{s}.0")
    }
}

impl fmt::Display for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataItem::Missing => write!(f, "None"),
            DataItem::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            DataItem::Int32(v) => write!(f, "{v}"),
            DataItem::Int64(v) => write!(f, "{v}"),
            DataItem::Float32(v) => write_float(f, v.to_string()),
            DataItem::Float64(v) => write_float(f, v.to_string()),
            DataItem::Text(s) => write!(f, "'{s}'"),
            DataItem::Bytes(b) => {
                write!(f, "b'")?;
                for byte in b.iter() {
                    if byte.is_ascii_graphic() || *byte == b' ' {
                        write!(f, "{}", *byte as char)?;
                    } else {
                        write!(f, "\\x{byte:02x}")?;
                    }
                }
                write!(f, "'")
            }
            DataItem::ObjectId(id) => write!(f, "{id}"),
            DataItem::DType(d) => write!(f, "{d}"),
            DataItem::Expr(e) => write!(f, "{e}"),
        }
    }
}

// Floats compare by bit pattern so DataItem can be a hash key
impl PartialEq for DataItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataItem::Missing, DataItem::Missing) => true,
            (DataItem::Bool(a), DataItem::Bool(b)) => a == b,
            (DataItem::Int32(a), DataItem::Int32(b)) => a == b,
            (DataItem::Int64(a), DataItem::Int64(b)) => a == b,
            (DataItem::Float32(a), DataItem::Float32(b)) => a.to_bits() == b.to_bits(),
            (DataItem::Float64(a), DataItem::Float64(b)) => a.to_bits() == b.to_bits(),
            (DataItem::Text(a), DataItem::Text(b)) => a == b,
            (DataItem::Bytes(a), DataItem::Bytes(b)) => a == b,
            (DataItem::ObjectId(a), DataItem::ObjectId(b)) => a == b,
            (DataItem::DType(a), DataItem::DType(b)) => a == b,
            (DataItem::Expr(a), DataItem::Expr(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DataItem {}

impl Hash for DataItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            DataItem::Missing => {}
            DataItem::Bool(b) => b.hash(state),
            DataItem::Int32(v) => v.hash(state),
            DataItem::Int64(v) => v.hash(state),
            DataItem::Float32(v) => v.to_bits().hash(state),
            DataItem::Float64(v) => v.to_bits().hash(state),
            DataItem::Text(s) => s.hash(state),
            DataItem::Bytes(b) => b.hash(state),
            DataItem::ObjectId(id) => id.hash(state),
            DataItem::DType(d) => d.hash(state),
            DataItem::Expr(e) => e.hash(state),
        }
    }
}

// Convenience conversions
impl From<bool> for DataItem {
    fn from(v: bool) -> Self {
        DataItem::Bool(v)
    }
}

impl From<i32> for DataItem {
    fn from(v: i32) -> Self {
        DataItem::Int32(v)
    }
}

impl From<i64> for DataItem {
    fn from(v: i64) -> Self {
        DataItem::Int64(v)
    }
}

impl From<f32> for DataItem {
    fn from(v: f32) -> Self {
        DataItem::Float32(v)
    }
}

impl From<f64> for DataItem {
    fn from(v: f64) -> Self {
        DataItem::Float64(v)
    }
}

impl From<&str> for DataItem {
    fn from(v: &str) -> Self {
        DataItem::text(v)
    }
}

impl From<ObjectId> for DataItem {
    fn from(v: ObjectId) -> Self {
        DataItem::ObjectId(v)
    }
}

impl From<DType> for DataItem {
    fn from(v: DType) -> Self {
        DataItem::DType(v)
    }
}

impl<T: Into<DataItem>> From<Option<T>> for DataItem {
    fn from(v: Option<T>) -> Self {
        v.map_or(DataItem::Missing, Into::into)
    }
}
