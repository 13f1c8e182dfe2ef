//! # Slices
//!
//! [`DataSliceImpl`] is a flat array of [`DataItem`]s in one of three
//! representations:
//!
//! - **empty and unknown**: every element is missing and no type is known
//! - **typed**: a homogeneous column ([`TypedValues`]), one `Vec<Option<T>>`
//!   per supported element type
//! - **mixed**: one tagged [`DataItem`] per position
//!
//! Algorithms that need per-type fast paths go through [`TypedVisitor`], which
//! dispatches once on the column type and then runs monomorphized code over
//! `&[Option<T>]`. The mixed representation is handled by running the same
//! generic code with `T = DataItem`.
//!
//! Jagged shapes live in [`shape`], and [`view::DataSlice`] combines a slice,
//! its shape, a schema and an optional bag.

pub mod arrow_convert;
pub mod shape;
pub mod view;

pub use shape::{Edge, JaggedShape};
pub use view::{DataSlice, SliceContent};

use crate::value::{
    allocate_objects, AllocationId, DType, DataItem, ExprQuote, ObjectId,
};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::Hash;
use std::sync::Arc;

/// Element type that can be stored in a typed column
pub trait SliceValue: Clone + 'static {
    /// Hashable identity of the value
    ///
    /// Floats hash by bit pattern after adding `0.0`, which folds `-0.0`
    /// into `0.0`; each NaN payload stays its own key.
    type Key: Hash + Eq + Clone;

    fn key(&self) -> Self::Key;

    /// Natural ascending order; `None` for types without one
    fn sort_cmp(&self, other: &Self) -> Option<Ordering>;

    fn to_item(&self) -> DataItem;
}

macro_rules! impl_slice_value {
    ($ty:ty, $variant:ident, key = $key:ty, |$v:ident| $key_expr:expr, sortable = $sortable:tt) => {
        impl SliceValue for $ty {
            type Key = $key;

            fn key(&self) -> Self::Key {
                let $v = self;
                $key_expr
            }

            fn sort_cmp(&self, other: &Self) -> Option<Ordering> {
                impl_slice_value!(@cmp $sortable, self, other)
            }

            fn to_item(&self) -> DataItem {
                DataItem::$variant(self.clone())
            }
        }
    };
    (@cmp true, $a:expr, $b:expr) => {
        Some($a.cmp($b))
    };
    (@cmp float, $a:expr, $b:expr) => {
        Some($a.total_cmp($b))
    };
    (@cmp false, $a:expr, $b:expr) => {{
        let _ = ($a, $b);
        None
    }};
}

impl_slice_value!(bool, Bool, key = bool, |v| *v, sortable = true);
impl_slice_value!(i32, Int32, key = i32, |v| *v, sortable = true);
impl_slice_value!(i64, Int64, key = i64, |v| *v, sortable = true);
impl_slice_value!(f32, Float32, key = u32, |v| (v + 0.0).to_bits(), sortable = float);
impl_slice_value!(f64, Float64, key = u64, |v| (v + 0.0).to_bits(), sortable = float);
impl_slice_value!(Arc<str>, Text, key = Arc<str>, |v| v.clone(), sortable = true);
impl_slice_value!(Arc<[u8]>, Bytes, key = Arc<[u8]>, |v| v.clone(), sortable = true);
impl_slice_value!(ObjectId, ObjectId, key = ObjectId, |v| *v, sortable = false);
impl_slice_value!(DType, DType, key = DType, |v| *v, sortable = false);
impl_slice_value!(ExprQuote, Expr, key = ExprQuote, |v| v.clone(), sortable = false);

impl SliceValue for DataItem {
    type Key = DataItem;

    fn key(&self) -> Self::Key {
        match self {
            DataItem::Float32(v) => DataItem::Float32(v + 0.0),
            DataItem::Float64(v) => DataItem::Float64(v + 0.0),
            other => other.clone(),
        }
    }

    fn sort_cmp(&self, other: &Self) -> Option<Ordering> {
        DataItem::sort_cmp(self, other)
    }

    fn to_item(&self) -> DataItem {
        self.clone()
    }
}

/// Homogeneous column storage
#[derive(Debug, Clone)]
pub enum TypedValues {
    Bool(Vec<Option<bool>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Text(Vec<Option<Arc<str>>>),
    Bytes(Vec<Option<Arc<[u8]>>>),
    ObjectId(Vec<Option<ObjectId>>),
    DType(Vec<Option<DType>>),
    Expr(Vec<Option<ExprQuote>>),
}

/// Callback run once per column type
pub trait TypedVisitor {
    type Output;

    fn visit<T: SliceValue>(self, values: &[Option<T>]) -> Self::Output;
}

impl TypedValues {
    pub fn len(&self) -> usize {
        match self {
            TypedValues::Bool(v) => v.len(),
            TypedValues::Int32(v) => v.len(),
            TypedValues::Int64(v) => v.len(),
            TypedValues::Float32(v) => v.len(),
            TypedValues::Float64(v) => v.len(),
            TypedValues::Text(v) => v.len(),
            TypedValues::Bytes(v) => v.len(),
            TypedValues::ObjectId(v) => v.len(),
            TypedValues::DType(v) => v.len(),
            TypedValues::Expr(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dtype of the values (object ids report `ITEMID`, dtypes `SCHEMA`)
    pub fn dtype(&self) -> DType {
        match self {
            TypedValues::Bool(_) => DType::Bool,
            TypedValues::Int32(_) => DType::Int32,
            TypedValues::Int64(_) => DType::Int64,
            TypedValues::Float32(_) => DType::Float32,
            TypedValues::Float64(_) => DType::Float64,
            TypedValues::Text(_) => DType::Text,
            TypedValues::Bytes(_) => DType::Bytes,
            TypedValues::ObjectId(_) => DType::ItemId,
            TypedValues::DType(_) => DType::Schema,
            TypedValues::Expr(_) => DType::Expr,
        }
    }

    pub fn visit<V: TypedVisitor>(&self, visitor: V) -> V::Output {
        match self {
            TypedValues::Bool(v) => visitor.visit(v),
            TypedValues::Int32(v) => visitor.visit(v),
            TypedValues::Int64(v) => visitor.visit(v),
            TypedValues::Float32(v) => visitor.visit(v),
            TypedValues::Float64(v) => visitor.visit(v),
            TypedValues::Text(v) => visitor.visit(v),
            TypedValues::Bytes(v) => visitor.visit(v),
            TypedValues::ObjectId(v) => visitor.visit(v),
            TypedValues::DType(v) => visitor.visit(v),
            TypedValues::Expr(v) => visitor.visit(v),
        }
    }

    fn get(&self, i: usize) -> DataItem {
        struct Get(usize);
        impl TypedVisitor for Get {
            type Output = DataItem;
            fn visit<T: SliceValue>(self, values: &[Option<T>]) -> DataItem {
                values[self.0]
                    .as_ref()
                    .map_or(DataItem::Missing, SliceValue::to_item)
            }
        }
        self.visit(Get(i))
    }
}

#[derive(Debug, Clone)]
enum Storage {
    EmptyAndUnknown,
    Typed(TypedValues),
    Mixed(Vec<DataItem>),
}

/// Set of allocations referenced by the object ids of a slice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationIdSet {
    ids: BTreeSet<AllocationId>,
}

impl AllocationIdSet {
    pub fn insert(&mut self, id: AllocationId) {
        self.ids.insert(id);
    }

    pub fn contains(&self, id: &AllocationId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AllocationId> {
        self.ids.iter()
    }

    pub fn union(&mut self, other: &AllocationIdSet) {
        self.ids.extend(other.ids.iter().copied());
    }
}

/// Flat array of items
#[derive(Debug, Clone)]
pub struct DataSliceImpl {
    size: usize,
    storage: Storage,
    allocation_ids: AllocationIdSet,
}

impl DataSliceImpl {
    /// All-missing slice with no known type
    pub fn create_empty_and_unknown_type(size: usize) -> Self {
        DataSliceImpl {
            size,
            storage: Storage::EmptyAndUnknown,
            allocation_ids: AllocationIdSet::default(),
        }
    }

    /// Wrap a typed column
    pub fn from_typed(values: TypedValues) -> Self {
        let mut allocation_ids = AllocationIdSet::default();
        if let TypedValues::ObjectId(ids) = &values {
            for id in ids.iter().flatten() {
                allocation_ids.insert(id.allocation_id());
            }
        }
        DataSliceImpl {
            size: values.len(),
            storage: Storage::Typed(values),
            allocation_ids,
        }
    }

    /// Build from items, choosing the narrowest representation
    pub fn from_items<I: IntoIterator<Item = DataItem>>(items: I) -> Self {
        let items: Vec<DataItem> = items.into_iter().collect();
        let mut builder = DataSliceImplBuilder::new(items.len());
        for (i, item) in items.into_iter().enumerate() {
            builder.insert(i, item);
        }
        builder.build()
    }

    pub fn from_object_ids<I: IntoIterator<Item = Option<ObjectId>>>(ids: I) -> Self {
        Self::from_typed(TypedValues::ObjectId(ids.into_iter().collect()))
    }

    /// All objects of an allocation, in offset order
    pub fn objects_from_allocation(alloc: AllocationId, size: usize) -> Self {
        Self::from_object_ids((0..size).map(|i| Some(alloc.object_id(i as u32))))
    }

    /// Fresh entity objects in a new allocation
    pub fn allocate_empty_objects(size: usize) -> Self {
        Self::objects_from_allocation(allocate_objects(size), size)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_empty_and_unknown(&self) -> bool {
        matches!(self.storage, Storage::EmptyAndUnknown)
    }

    pub fn is_mixed_dtype(&self) -> bool {
        matches!(self.storage, Storage::Mixed(_))
    }

    /// Column dtype; `None` for empty-and-unknown and mixed slices
    pub fn dtype(&self) -> Option<DType> {
        match &self.storage {
            Storage::Typed(values) => Some(values.dtype()),
            _ => None,
        }
    }

    pub fn typed_values(&self) -> Option<&TypedValues> {
        match &self.storage {
            Storage::Typed(values) => Some(values),
            _ => None,
        }
    }

    pub fn mixed_values(&self) -> Option<&[DataItem]> {
        match &self.storage {
            Storage::Mixed(items) => Some(items),
            _ => None,
        }
    }

    pub fn allocation_ids(&self) -> &AllocationIdSet {
        &self.allocation_ids
    }

    /// Item at position `i` (missing when out of range)
    pub fn get(&self, i: usize) -> DataItem {
        if i >= self.size {
            return DataItem::Missing;
        }
        match &self.storage {
            Storage::EmptyAndUnknown => DataItem::Missing,
            Storage::Typed(values) => values.get(i),
            Storage::Mixed(items) => items[i].clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = DataItem> + '_ {
        (0..self.size).map(move |i| self.get(i))
    }

    pub fn present_count(&self) -> usize {
        self.iter().filter(DataItem::has_value).count()
    }

    /// Present object ids with their positions
    pub fn object_ids(&self) -> Vec<(usize, ObjectId)> {
        match &self.storage {
            Storage::EmptyAndUnknown => Vec::new(),
            Storage::Typed(TypedValues::ObjectId(ids)) => ids
                .iter()
                .enumerate()
                .filter_map(|(i, id)| id.map(|id| (i, id)))
                .collect(),
            Storage::Typed(_) => Vec::new(),
            Storage::Mixed(items) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| item.as_object_id().map(|id| (i, id)))
                .collect(),
        }
    }
}

impl PartialEq for DataSliceImpl {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.iter().eq(other.iter())
    }
}

impl From<DataItem> for DataSliceImpl {
    fn from(item: DataItem) -> Self {
        DataSliceImpl::from_items([item])
    }
}

/// Incremental slice construction by position
#[derive(Debug, Clone)]
pub struct DataSliceImplBuilder {
    items: Vec<DataItem>,
}

impl DataSliceImplBuilder {
    pub fn new(size: usize) -> Self {
        DataSliceImplBuilder {
            items: vec![DataItem::Missing; size],
        }
    }

    pub fn insert(&mut self, i: usize, item: DataItem) {
        self.items[i] = item;
    }

    /// Finish, choosing typed storage when all present items share a variant
    pub fn build(self) -> DataSliceImpl {
        let size = self.items.len();
        let mut dtype: Option<DType> = None;
        let mut mixed = false;
        for item in &self.items {
            if let Some(item_dtype) = item.dtype() {
                match dtype {
                    None => dtype = Some(item_dtype),
                    Some(d) if d != item_dtype => {
                        mixed = true;
                        break;
                    }
                    Some(_) => {}
                }
            }
        }
        let Some(dtype) = dtype else {
            return DataSliceImpl::create_empty_and_unknown_type(size);
        };
        if mixed {
            let mut allocation_ids = AllocationIdSet::default();
            for id in self.items.iter().filter_map(DataItem::as_object_id) {
                allocation_ids.insert(id.allocation_id());
            }
            return DataSliceImpl {
                size,
                storage: Storage::Mixed(self.items),
                allocation_ids,
            };
        }
        DataSliceImpl::from_typed(typed_from_items(dtype, self.items))
    }
}

fn typed_from_items(dtype: DType, items: Vec<DataItem>) -> TypedValues {
    macro_rules! collect {
        ($variant:ident) => {
            TypedValues::$variant(
                items
                    .into_iter()
                    .map(|item| match item {
                        DataItem::$variant(v) => Some(v),
                        _ => None,
                    })
                    .collect(),
            )
        };
    }
    match dtype {
        DType::Bool => collect!(Bool),
        DType::Int32 => collect!(Int32),
        DType::Int64 => collect!(Int64),
        DType::Float32 => collect!(Float32),
        DType::Float64 => collect!(Float64),
        DType::Text => collect!(Text),
        DType::Bytes => collect!(Bytes),
        DType::ItemId => collect!(ObjectId),
        DType::Schema => collect!(DType),
        DType::Expr => collect!(Expr),
        // Items never report these dtypes.
        DType::None | DType::Object | DType::Any => {
            unreachable!("item dtype is never {dtype}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::allocate_lists;

    #[test]
    fn test_builder_typed() {
        let ds = DataSliceImpl::from_items([DataItem::from(1), DataItem::Missing, DataItem::from(3)]);
        assert_eq!(ds.dtype(), Some(DType::Int32));
        assert!(!ds.is_mixed_dtype());
        assert_eq!(ds.get(1), DataItem::Missing);
        assert_eq!(ds.get(2), DataItem::from(3));
        assert_eq!(ds.present_count(), 2);
    }

    #[test]
    fn test_builder_mixed() {
        let ds = DataSliceImpl::from_items([DataItem::from(1), DataItem::text("a")]);
        assert!(ds.is_mixed_dtype());
        assert_eq!(ds.dtype(), None);
        assert_eq!(ds.get(1), DataItem::text("a"));
    }

    #[test]
    fn test_builder_empty_and_unknown() {
        let ds = DataSliceImpl::from_items([DataItem::Missing, DataItem::Missing]);
        assert!(ds.is_empty_and_unknown());
        assert_eq!(ds.size(), 2);
        assert_eq!(ds.present_count(), 0);
    }

    #[test]
    fn test_allocation_ids() {
        let alloc = allocate_lists(3);
        let ds = DataSliceImpl::objects_from_allocation(alloc, 3);
        assert_eq!(ds.allocation_ids().len(), 1);
        assert!(ds.allocation_ids().contains(&alloc));
        assert_eq!(ds.object_ids().len(), 3);
        assert!(ds.get(0).as_object_id().is_some_and(|id| id.is_list()));
    }

    #[test]
    fn test_equality_across_representations() {
        let typed = DataSliceImpl::from_typed(TypedValues::Int32(vec![Some(1), None]));
        let built = DataSliceImpl::from_items([DataItem::from(1), DataItem::Missing]);
        assert_eq!(typed, built);
    }

    #[test]
    fn test_get_out_of_range_is_missing() {
        let ds = DataSliceImpl::from_items([DataItem::from(1)]);
        assert_eq!(ds.get(5), DataItem::Missing);
    }

    #[test]
    fn test_signed_zero_shares_key() {
        assert_eq!(0.0f32.key(), (-0.0f32).key());
        assert_eq!(0.0f64.key(), (-0.0f64).key());
        assert_ne!(1.0f32.key(), (-1.0f32).key());
        assert_eq!(f64::NAN.key(), f64::NAN.key());
        assert_eq!(
            DataItem::Float32(-0.0).key(),
            DataItem::Float32(0.0).key()
        );
        assert_ne!(DataItem::Float32(0.0).key(), DataItem::Float64(0.0).key());
    }
}
