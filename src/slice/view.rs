//! `DataSlice`: a slice, its shape, its schema and an optional bag.

use super::{DataSliceImpl, JaggedShape};
use crate::data_bag::DataBag;
use crate::error::{DataError, DataResult};
use crate::schema;
use crate::value::{DType, DataItem};
use std::fmt;
use std::sync::Arc;

/// Payload of a [`DataSlice`]: a single item for rank 0, a flat slice otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum SliceContent {
    Item(DataItem),
    Slice(DataSliceImpl),
}

/// User-facing slice
#[derive(Debug, Clone)]
pub struct DataSlice {
    content: SliceContent,
    shape: JaggedShape,
    schema: DataItem,
    bag: Option<Arc<DataBag>>,
}

impl DataSlice {
    /// Rank-0 slice holding one item
    pub fn from_item(item: DataItem, schema: DataItem) -> Self {
        DataSlice {
            content: SliceContent::Item(item),
            shape: JaggedShape::scalar(),
            schema,
            bag: None,
        }
    }

    /// Slice with the given shape; a rank-0 shape stores the single item
    pub fn from_impl(ds: DataSliceImpl, shape: JaggedShape, schema: DataItem) -> DataResult<Self> {
        if shape.size() != ds.size() {
            return Err(DataError::invalid_argument(format!(
                "shape size {} does not match slice size {}",
                shape.size(),
                ds.size()
            )));
        }
        let content = if shape.rank() == 0 {
            SliceContent::Item(ds.get(0))
        } else {
            SliceContent::Slice(ds)
        };
        Ok(DataSlice {
            content,
            shape,
            schema,
            bag: None,
        })
    }

    /// Rank-1 slice over `ds`
    pub fn flat(ds: DataSliceImpl, schema: DataItem) -> Self {
        DataSlice {
            shape: JaggedShape::flat(ds.size()),
            content: SliceContent::Slice(ds),
            schema,
            bag: None,
        }
    }

    pub fn with_bag(mut self, bag: Option<Arc<DataBag>>) -> Self {
        self.bag = bag;
        self
    }

    pub fn with_schema(mut self, schema: DataItem) -> Self {
        self.schema = schema;
        self
    }

    pub fn content(&self) -> &SliceContent {
        &self.content
    }

    pub fn item(&self) -> Option<&DataItem> {
        match &self.content {
            SliceContent::Item(item) => Some(item),
            SliceContent::Slice(_) => None,
        }
    }

    pub fn slice(&self) -> Option<&DataSliceImpl> {
        match &self.content {
            SliceContent::Item(_) => None,
            SliceContent::Slice(ds) => Some(ds),
        }
    }

    /// Flat view of the contents (a one-element slice for items)
    pub fn to_slice_impl(&self) -> DataSliceImpl {
        match &self.content {
            SliceContent::Item(item) => DataSliceImpl::from(item.clone()),
            SliceContent::Slice(ds) => ds.clone(),
        }
    }

    pub fn shape(&self) -> &JaggedShape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn size(&self) -> usize {
        self.shape.size()
    }

    pub fn schema(&self) -> &DataItem {
        &self.schema
    }

    pub fn bag(&self) -> Option<&Arc<DataBag>> {
        self.bag.as_ref()
    }

    /// Same contents and shape, schema switched to its NoFollow form
    pub fn nofollow_schema(&self) -> DataResult<DataSlice> {
        let schema = schema::nofollow_schema_item(&self.schema)?;
        Ok(self.clone().with_schema(schema))
    }

    /// Same contents and shape, schema switched back from its NoFollow form
    pub fn follow(&self) -> DataResult<DataSlice> {
        let schema = schema::get_nofollowed_schema_item(&self.schema)?;
        Ok(self.clone().with_schema(schema))
    }

    /// The schema as a rank-0 slice of schema `SCHEMA`
    pub fn schema_slice(&self) -> DataSlice {
        DataSlice::from_item(self.schema.clone(), DataItem::DType(DType::Schema))
            .with_bag(self.bag.clone())
    }
}

impl fmt::Display for DataSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            SliceContent::Item(item) => write!(f, "DataItem({item}, schema: {})", self.schema),
            SliceContent::Slice(ds) => {
                write!(f, "DataSlice([")?;
                for (i, item) in ds.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "], rank: {}, schema: {})", self.rank(), self.schema)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::Edge;
    use crate::value::allocate_explicit_schema;

    #[test]
    fn test_from_impl_checks_size() {
        let ds = DataSliceImpl::from_items([1, 2, 3].map(DataItem::from));
        let shape = JaggedShape::flat(2);
        assert!(DataSlice::from_impl(ds.clone(), shape, DType::Int32.into()).is_err());

        let shape = JaggedShape::flat(1)
            .add_dims(vec![Edge::from_split_points(vec![0, 3]).unwrap()])
            .unwrap();
        let slice = DataSlice::from_impl(ds, shape, DType::Int32.into()).unwrap();
        assert_eq!(slice.rank(), 2);
        assert_eq!(slice.size(), 3);
    }

    #[test]
    fn test_rank_zero_holds_item() {
        let ds = DataSliceImpl::from_items([DataItem::from(5)]);
        let slice = DataSlice::from_impl(ds, JaggedShape::scalar(), DType::Int32.into()).unwrap();
        assert_eq!(slice.item(), Some(&DataItem::from(5)));
        assert!(slice.slice().is_none());
    }

    #[test]
    fn test_nofollow_and_follow() {
        let schema = DataItem::from(allocate_explicit_schema());
        let slice = DataSlice::from_item(DataItem::Missing, schema.clone());
        let nofollow = slice.nofollow_schema().unwrap();
        assert!(schema::is_nofollow_schema(nofollow.schema()));
        assert_eq!(nofollow.follow().unwrap().schema(), &schema);
        assert!(slice.follow().is_err());
    }

    #[test]
    fn test_display() {
        let slice = DataSlice::flat(
            DataSliceImpl::from_items([DataItem::from(1), DataItem::Missing]),
            DType::Int32.into(),
        );
        assert_eq!(slice.to_string(), "DataSlice([1, None], rank: 1, schema: INT32)");
    }
}
