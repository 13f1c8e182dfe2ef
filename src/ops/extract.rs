//! # Extraction and Shallow Clone
//!
//! Both operations walk the object graph reachable from a slice, guided by a
//! schema, and write what they find into a brand-new [`DataBagImpl`].
//!
//! The walk is an explicit work queue of tasks. A task is a set of objects,
//! the schema they are typed with, and the store that schema is read from
//! (the data store, or a separate schema store). Schemas reached through a
//! schema-declared attribute inherit the store of their parent; schemas
//! reached through an object's `__schema__` attribute are always read from the
//! data store. Data is always read from the data store.
//!
//! Cycles terminate through two memo tables:
//!
//! - `(object, schema, source)` triples already processed are skipped
//! - schema triples are copied once per `(schema, source)`
//!
//! Shallow clone runs the same walk but only copies the first level of data:
//! top-level objects get fresh ids, their attributes, list items and dict
//! entries are copied by reference, and child tasks carry no objects so that
//! only the reachable schema is copied further down.

use crate::config::StoreConfig;
use crate::data_bag::{DataBag, DataBagImpl, FallbackSpan, FlattenFallbackFinder};
use crate::error::{DataError, DataResult};
use crate::schema::{
    self, DICT_KEYS_SCHEMA_ATTR, DICT_VALUES_SCHEMA_ATTR, LIST_ITEMS_SCHEMA_ATTR, SCHEMA_ATTR,
};
use crate::slice::{DataSlice, DataSliceImpl, DataSliceImplBuilder, SliceContent};
use crate::value::{AllocationId, DType, DataItem, ObjectId, ObjectKind};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// A store together with its fallback span
#[derive(Clone, Copy)]
pub struct BagRef<'a> {
    pub bag: &'a DataBagImpl,
    pub fallbacks: FallbackSpan<'a>,
}

impl<'a> BagRef<'a> {
    pub fn new(bag: &'a DataBagImpl, fallbacks: FallbackSpan<'a>) -> Self {
        BagRef { bag, fallbacks }
    }
}

/// Which store a schema is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Source {
    Data,
    Schema,
}

struct Task {
    objects: Vec<ObjectId>,
    schema: DataItem,
    source: Source,
}

/// Explicit schema classified by its attribute set
#[derive(Clone)]
enum SchemaLayout {
    Entity(Vec<(Arc<str>, DataItem)>),
    List(DataItem),
    Dict { keys: DataItem, values: DataItem },
}

struct Traversal<'a> {
    data: BagRef<'a>,
    schema_data: Option<BagRef<'a>>,
    result: DataBagImpl,
    queue: VecDeque<Task>,
    visited: HashSet<(ObjectId, DataItem, Source)>,
    layouts: HashMap<(ObjectId, Source), SchemaLayout>,
    /// Fresh ids of cloned top-level objects; empty when extracting
    renames: HashMap<ObjectId, ObjectId>,
    shallow: bool,
}

impl<'a> Traversal<'a> {
    fn new(data: BagRef<'a>, schema_data: Option<BagRef<'a>>, capacity: usize) -> Self {
        Traversal {
            data,
            schema_data,
            result: DataBagImpl::with_capacity(capacity),
            queue: VecDeque::new(),
            visited: HashSet::new(),
            layouts: HashMap::new(),
            renames: HashMap::new(),
            shallow: false,
        }
    }

    fn shallow(mut self, renames: HashMap<ObjectId, ObjectId>) -> Self {
        self.renames = renames;
        self.shallow = true;
        self
    }

    fn run(mut self, objects: Vec<ObjectId>, schema: &DataItem) -> DataResult<DataBagImpl> {
        let source = if self.schema_data.is_some() {
            Source::Schema
        } else {
            Source::Data
        };
        self.queue.push_back(Task {
            objects,
            schema: schema.clone(),
            source,
        });
        while let Some(task) = self.queue.pop_front() {
            self.process(task)?;
        }
        Ok(self.result)
    }

    fn schema_store(&self, source: Source) -> BagRef<'a> {
        match (source, self.schema_data) {
            (Source::Schema, Some(schema_data)) => schema_data,
            _ => self.data,
        }
    }

    fn target(&self, obj: ObjectId) -> ObjectId {
        self.renames.get(&obj).copied().unwrap_or(obj)
    }

    fn push_children(&mut self, children: Vec<ObjectId>, schema: DataItem, source: Source) {
        let objects = if self.shallow { Vec::new() } else { children };
        self.queue.push_back(Task {
            objects,
            schema,
            source,
        });
    }

    fn process(&mut self, task: Task) -> DataResult<()> {
        match &task.schema {
            DataItem::DType(DType::Any) => Err(DataError::internal(
                "clone/extract not supported for kAny schema",
            )),
            DataItem::DType(DType::Object) => self.process_objects(task.objects, task.source),
            DataItem::DType(_) => Ok(()),
            DataItem::ObjectId(id) if id.is_nofollow_schema() => Ok(()),
            DataItem::ObjectId(id) if id.is_schema() => {
                self.process_explicit(*id, task.objects, task.source)
            }
            _ => Err(DataError::internal("unsupported schema type")),
        }
    }

    /// Objects typed `OBJECT`: dispatch on the embedded `__schema__`
    fn process_objects(&mut self, objects: Vec<ObjectId>, source: Source) -> DataResult<()> {
        let object_schema = DataItem::DType(DType::Object);
        let mut groups: Vec<(ObjectId, Vec<ObjectId>)> = Vec::new();
        let mut group_index: HashMap<ObjectId, usize> = HashMap::new();
        for obj in objects {
            if obj.is_schema() || !self.visited.insert((obj, object_schema.clone(), source)) {
                continue;
            }
            let embedded = self.data.bag.get_attr(obj, SCHEMA_ATTR, self.data.fallbacks);
            let Some(embedded_id) = embedded.as_object_id().filter(ObjectId::is_schema) else {
                return Err(DataError::invalid_argument(format!(
                    "object {obj} is expected to have a schema ObjectId in __schema__ attribute"
                )));
            };
            let target = self.target(obj);
            self.result.set_attr(target, SCHEMA_ATTR, embedded);
            if embedded_id.is_nofollow_schema() {
                continue;
            }
            let index = *group_index.entry(embedded_id).or_insert_with(|| {
                groups.push((embedded_id, Vec::new()));
                groups.len() - 1
            });
            groups[index].1.push(obj);
        }
        for (embedded_id, objects) in groups {
            self.queue.push_back(Task {
                objects,
                schema: DataItem::ObjectId(embedded_id),
                source: Source::Data,
            });
        }
        Ok(())
    }

    fn process_explicit(
        &mut self,
        schema_id: ObjectId,
        objects: Vec<ObjectId>,
        source: Source,
    ) -> DataResult<()> {
        let first_visit = !self.layouts.contains_key(&(schema_id, source));
        if first_visit {
            let layout = self.copy_schema(schema_id, source)?;
            self.layouts.insert((schema_id, source), layout);
        }
        let schema_item = DataItem::ObjectId(schema_id);
        let objects: Vec<ObjectId> = objects
            .into_iter()
            .filter(|obj| self.visited.insert((*obj, schema_item.clone(), source)))
            .collect();
        if !first_visit && objects.is_empty() {
            return Ok(());
        }
        let Some(layout) = self.layouts.get(&(schema_id, source)).cloned() else {
            return Err(DataError::internal(format!(
                "schema {schema_id} was not loaded"
            )));
        };
        match layout {
            SchemaLayout::Entity(attrs) => {
                for (name, attr_schema) in attrs {
                    let children = self.copy_attr(&objects, &name);
                    if schema::is_nofollow_schema(&attr_schema) {
                        continue;
                    }
                    self.push_children(children, attr_schema, source);
                }
            }
            SchemaLayout::List(items) => {
                let children = self.copy_lists(&objects)?;
                self.push_children(children, items, source);
            }
            SchemaLayout::Dict { keys, values } => {
                let (key_children, value_children) = self.copy_dicts(&objects)?;
                self.push_children(key_children, keys, source);
                self.push_children(value_children, values, source);
            }
        }
        Ok(())
    }

    /// Copy the schema's own triples into the result and classify it
    fn copy_schema(&mut self, schema_id: ObjectId, source: Source) -> DataResult<SchemaLayout> {
        let store = self.schema_store(source);
        let attrs: Vec<(Arc<str>, DataItem)> = store
            .bag
            .get_schema_attr_names(schema_id, store.fallbacks)
            .into_iter()
            .map(|name| {
                let value = store.bag.get_schema_attr(schema_id, &name, store.fallbacks);
                (name, value)
            })
            .collect();

        let layout = classify(schema_id, attrs.clone())?;
        for (name, value) in attrs {
            let existing = self.result.get_attr(schema_id, &name, &[]);
            if existing.has_value() && existing != value {
                return Err(DataError::invalid_argument(format!(
                    "conflicting values for schema {schema_id}: {name}: {existing} != {value}"
                )));
            }
            self.result.set_attr(schema_id, &name, value);
        }
        Ok(layout)
    }

    /// Copy `name` of every object; returns the object values found
    fn copy_attr(&mut self, objects: &[ObjectId], name: &str) -> Vec<ObjectId> {
        let mut children = Vec::new();
        for &obj in objects {
            let value = self.data.bag.get_attr(obj, name, self.data.fallbacks);
            if value.is_missing() {
                continue;
            }
            if let Some(child) = value.as_object_id().filter(|id| !id.is_schema()) {
                children.push(child);
            }
            let target = self.target(obj);
            self.result.set_attr(target, name, value);
        }
        children
    }

    fn copy_lists(&mut self, lists: &[ObjectId]) -> DataResult<Vec<ObjectId>> {
        let mut children = Vec::new();
        for &list in lists.iter().filter(|id| id.is_list()) {
            let Some(items) = self.data.bag.get_list(list, self.data.fallbacks) else {
                continue;
            };
            children.extend(items.iter().filter_map(object_child));
            let target = self.target(list);
            self.result.set_list(target, items.to_vec())?;
        }
        Ok(children)
    }

    fn copy_dicts(&mut self, dicts: &[ObjectId]) -> DataResult<(Vec<ObjectId>, Vec<ObjectId>)> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for &dict in dicts.iter().filter(|id| id.is_dict()) {
            let target = self.target(dict);
            for (key, value) in self.data.bag.get_dict_entries(dict, self.data.fallbacks) {
                keys.extend(object_child(&key));
                values.extend(object_child(&value));
                self.result.set_in_dict(target, key, value)?;
            }
        }
        Ok((keys, values))
    }
}

fn object_child(item: &DataItem) -> Option<ObjectId> {
    item.as_object_id().filter(|id| !id.is_schema())
}

fn classify(schema_id: ObjectId, attrs: Vec<(Arc<str>, DataItem)>) -> DataResult<SchemaLayout> {
    let find = |name: &str| {
        attrs
            .iter()
            .find(|(attr, _)| &**attr == name)
            .map(|(_, value)| value.clone())
    };
    let names = || {
        attrs
            .iter()
            .map(|(name, _)| name.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    if let Some(items) = find(LIST_ITEMS_SCHEMA_ATTR) {
        if attrs.len() != 1 {
            return Err(DataError::invalid_argument(format!(
                "list schema {schema_id} has unexpected attributes: {}",
                names()
            )));
        }
        return Ok(SchemaLayout::List(items));
    }
    let keys = find(DICT_KEYS_SCHEMA_ATTR);
    let values = find(DICT_VALUES_SCHEMA_ATTR);
    if keys.is_some() || values.is_some() {
        return match (keys, values) {
            (Some(keys), Some(values)) if attrs.len() == 2 => Ok(SchemaLayout::Dict { keys, values }),
            _ => Err(DataError::invalid_argument(format!(
                "dict schema {schema_id} has unexpected attributes: {}",
                names()
            ))),
        };
    }
    Ok(SchemaLayout::Entity(attrs))
}

/// Root objects of a slice: present, non-schema object ids in position order
fn root_objects(ds: &DataSliceImpl) -> Vec<ObjectId> {
    ds.object_ids()
        .into_iter()
        .map(|(_, id)| id)
        .filter(|id| !id.is_schema())
        .collect()
}

/// Copies the graph reachable from a slice into a new store
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOp {
    capacity: usize,
}

impl ExtractOp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the output store
    pub fn with_capacity(capacity: usize) -> Self {
        ExtractOp { capacity }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::with_capacity(config.initial_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `ds` with a new bag holding only the data reachable through `schema`
    pub fn eval(&self, ds: &DataSlice, schema: &DataSlice) -> DataResult<DataSlice> {
        let (bag, schema_bag, schema_item) =
            prepare(ds, schema, "cannot extract without a DataBag")?;
        let result = with_stores(bag, schema_bag, |data, schema_data| match ds.content() {
            SliceContent::Item(item) => self.extract_item(item, schema_item, data, schema_data),
            SliceContent::Slice(slice) => self.extract(slice, schema_item, data, schema_data),
        })?;
        Ok(ds
            .clone()
            .with_schema(schema_item.clone())
            .with_bag(Some(DataBag::from_impl(result))))
    }

    /// Extract everything reachable from `ds` typed with `schema`
    ///
    /// `schema_data`, when given, is where the root schema is looked up.
    pub fn extract(
        &self,
        ds: &DataSliceImpl,
        schema: &DataItem,
        data: BagRef<'_>,
        schema_data: Option<BagRef<'_>>,
    ) -> DataResult<DataBagImpl> {
        let objects = root_objects(ds);
        debug!(objects = objects.len(), schema = %schema, "extract_start");
        let result = Traversal::new(data, schema_data, self.capacity).run(objects, schema)?;
        debug!(
            triples = result.triple_count(),
            lists = result.list_count(),
            dicts = result.dict_count(),
            "extract_done"
        );
        Ok(result)
    }

    pub fn extract_item(
        &self,
        item: &DataItem,
        schema: &DataItem,
        data: BagRef<'_>,
        schema_data: Option<BagRef<'_>>,
    ) -> DataResult<DataBagImpl> {
        self.extract(&DataSliceImpl::from(item.clone()), schema, data, schema_data)
    }
}

/// Fresh ids for top-level objects, one allocation per object kind
struct Renamer {
    size: usize,
    allocations: HashMap<ObjectKind, AllocationId>,
    renames: HashMap<ObjectId, ObjectId>,
}

impl Renamer {
    fn new(size: usize) -> Self {
        Renamer {
            size,
            allocations: HashMap::new(),
            renames: HashMap::new(),
        }
    }

    fn rename(&mut self, position: usize, obj: ObjectId) -> ObjectId {
        if let Some(renamed) = self.renames.get(&obj) {
            return *renamed;
        }
        debug_assert!(position < self.size);
        let kind = obj.kind();
        let allocation = *self
            .allocations
            .entry(kind)
            .or_insert_with(|| AllocationId::new(kind));
        let renamed = allocation.object_id(position as u32);
        self.renames.insert(obj, renamed);
        renamed
    }

    fn rename_item(&mut self, position: usize, item: DataItem) -> DataItem {
        match item {
            DataItem::ObjectId(id) if !id.is_schema() => {
                DataItem::ObjectId(self.rename(position, id))
            }
            other => other,
        }
    }
}

/// Copies the first level of a slice's object graph under fresh ids
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowCloneOp {
    capacity: usize,
}

impl ShallowCloneOp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ShallowCloneOp { capacity }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::with_capacity(config.initial_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `ds` re-identified with fresh ids, first level copied into a new bag
    pub fn eval(&self, ds: &DataSlice, schema: &DataSlice) -> DataResult<DataSlice> {
        let (bag, schema_bag, schema_item) =
            prepare(ds, schema, "cannot clone without a DataBag")?;
        let (result, content, schema_item) =
            with_stores(bag, schema_bag, |data, schema_data| match ds.content() {
                SliceContent::Item(item) => {
                    let (result, item, schema) =
                        self.shallow_clone_item(item, schema_item, data, schema_data)?;
                    Ok((result, SliceContent::Item(item), schema))
                }
                SliceContent::Slice(slice) => {
                    let (result, slice, schema) =
                        self.shallow_clone(slice, schema_item, data, schema_data)?;
                    Ok((result, SliceContent::Slice(slice), schema))
                }
            })?;
        let cloned = match content {
            SliceContent::Item(item) => DataSlice::from_item(item, schema_item),
            SliceContent::Slice(slice) => {
                DataSlice::from_impl(slice, ds.shape().clone(), schema_item)?
            }
        };
        Ok(cloned.with_bag(Some(DataBag::from_impl(result))))
    }

    /// Returns the new store, the slice of fresh ids, and the schema
    pub fn shallow_clone(
        &self,
        ds: &DataSliceImpl,
        schema: &DataItem,
        data: BagRef<'_>,
        schema_data: Option<BagRef<'_>>,
    ) -> DataResult<(DataBagImpl, DataSliceImpl, DataItem)> {
        let mut renamer = Renamer::new(ds.size());
        let mut builder = DataSliceImplBuilder::new(ds.size());
        for (i, item) in ds.iter().enumerate() {
            builder.insert(i, renamer.rename_item(i, item));
        }
        let objects = root_objects(ds);
        debug!(
            objects = objects.len(),
            renamed = renamer.renames.len(),
            schema = %schema,
            "shallow_clone_start"
        );
        let result = Traversal::new(data, schema_data, self.capacity)
            .shallow(renamer.renames)
            .run(objects, schema)?;
        debug!(triples = result.triple_count(), "shallow_clone_done");
        Ok((result, builder.build(), schema.clone()))
    }

    pub fn shallow_clone_item(
        &self,
        item: &DataItem,
        schema: &DataItem,
        data: BagRef<'_>,
        schema_data: Option<BagRef<'_>>,
    ) -> DataResult<(DataBagImpl, DataItem, DataItem)> {
        let (result, ds, schema) =
            self.shallow_clone(&DataSliceImpl::from(item.clone()), schema, data, schema_data)?;
        Ok((result, ds.get(0), schema))
    }
}

// DataSlice-level operators

/// Run `f` with read access to `bag` and, if given, a distinct schema bag
///
/// Fallback chains are flattened once and stay read-locked for the call.
fn with_stores<R>(
    bag: &DataBag,
    schema_bag: Option<&DataBag>,
    f: impl FnOnce(BagRef<'_>, Option<BagRef<'_>>) -> DataResult<R>,
) -> DataResult<R> {
    let finder = FlattenFallbackFinder::new(bag);
    let guards = finder.read_all();
    let span = guards.span();
    let main = bag.read();
    let data = BagRef::new(&main, &span);
    match schema_bag {
        None => f(data, None),
        Some(schema_bag) => {
            let schema_finder = FlattenFallbackFinder::new(schema_bag);
            let schema_guards = schema_finder.read_all();
            let schema_span = schema_guards.span();
            let schema_main = schema_bag.read();
            f(data, Some(BagRef::new(&schema_main, &schema_span)))
        }
    }
}

/// Bag and schema item of an operator call; fails without a bag
fn prepare<'d>(
    ds: &'d DataSlice,
    schema: &'d DataSlice,
    missing_bag: &str,
) -> DataResult<(&'d Arc<DataBag>, Option<&'d DataBag>, &'d DataItem)> {
    let bag = ds
        .bag()
        .ok_or_else(|| DataError::invalid_argument(missing_bag.to_string()))?;
    let schema_item = schema
        .item()
        .ok_or_else(|| DataError::invalid_argument("schema must be a DataItem"))?;
    schema::verify_is_schema(schema_item)?;
    let schema_bag = schema
        .bag()
        .filter(|schema_bag| !Arc::ptr_eq(schema_bag, bag))
        .map(|schema_bag| &**schema_bag);
    Ok((bag, schema_bag, schema_item))
}

/// `ds` with a new bag holding only the data reachable from it
pub fn extract(ds: &DataSlice) -> DataResult<DataSlice> {
    extract_with_schema(ds, &ds.schema_slice())
}

/// Like [`extract`], with the schema taken from `schema` (and its bag)
pub fn extract_with_schema(ds: &DataSlice, schema: &DataSlice) -> DataResult<DataSlice> {
    ExtractOp::new().eval(ds, schema)
}

/// `ds` re-identified with fresh ids, first level copied into a new bag
pub fn shallow_clone(ds: &DataSlice) -> DataResult<DataSlice> {
    shallow_clone_with_schema(ds, &ds.schema_slice())
}

pub fn shallow_clone_with_schema(ds: &DataSlice, schema: &DataSlice) -> DataResult<DataSlice> {
    ShallowCloneOp::new().eval(ds, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::{allocate_dicts, allocate_explicit_schema, allocate_lists};

    fn no_fallbacks(bag: &DataBagImpl) -> BagRef<'_> {
        BagRef::new(bag, &[])
    }

    #[test]
    fn test_extract_entity_drops_unreachable() {
        let objs = DataSliceImpl::allocate_empty_objects(3);
        let schema = allocate_explicit_schema();
        let mut db = DataBagImpl::new();
        db.set_schema_attr(schema, "x", DType::Int32.into()).unwrap();
        let mut expected = db.clone();
        for (i, obj) in objs.object_ids() {
            db.set_attr(obj, "x", DataItem::from(i as i32));
            expected.set_attr(obj, "x", DataItem::from(i as i32));
            db.set_attr(obj, "unreachable", DataItem::from(0));
        }
        let noise = allocate_explicit_schema();
        db.set_schema_attr(noise, "y", DType::Text.into()).unwrap();

        let result = ExtractOp::new()
            .extract(&objs, &schema.into(), no_fallbacks(&db), None)
            .unwrap();
        assert_eq!(result.fingerprint(), expected.fingerprint());
    }

    #[test]
    fn test_self_loop_terminates() {
        let objs = DataSliceImpl::allocate_empty_objects(2);
        let ids: Vec<ObjectId> = objs.object_ids().into_iter().map(|(_, id)| id).collect();
        let schema = allocate_explicit_schema();
        let mut db = DataBagImpl::new();
        db.set_schema_attr(schema, "next", schema.into()).unwrap();
        db.set_attr(ids[0], "next", ids[1].into());
        db.set_attr(ids[1], "next", ids[0].into());
        let expected = db.clone();

        let result = ExtractOp::new()
            .extract_item(&ids[0].into(), &schema.into(), no_fallbacks(&db), None)
            .unwrap();
        assert_eq!(result.fingerprint(), expected.fingerprint());
    }

    #[test]
    fn test_schema_copied_without_data() {
        let outer = allocate_explicit_schema();
        let inner = allocate_explicit_schema();
        let mut db = DataBagImpl::new();
        db.set_schema_attr(outer, "child", inner.into()).unwrap();
        db.set_schema_attr(inner, "v", DType::Int64.into()).unwrap();
        let expected = db.clone();

        let result = ExtractOp::new()
            .extract_item(&DataItem::Missing, &outer.into(), no_fallbacks(&db), None)
            .unwrap();
        assert_eq!(result.fingerprint(), expected.fingerprint());
    }

    #[test]
    fn test_container_schema_validation() {
        let list_schema = allocate_explicit_schema();
        let mut db = DataBagImpl::new();
        db.set_schema_attr(list_schema, LIST_ITEMS_SCHEMA_ATTR, DType::Int32.into())
            .unwrap();
        db.set_schema_attr(list_schema, "extra", DType::Int32.into()).unwrap();
        let err = ExtractOp::new()
            .extract_item(&DataItem::Missing, &list_schema.into(), no_fallbacks(&db), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("list schema"));
        assert!(err.to_string().contains("has unexpected attributes"));

        let dict_schema = allocate_explicit_schema();
        db.set_schema_attr(dict_schema, DICT_KEYS_SCHEMA_ATTR, DType::Int32.into())
            .unwrap();
        let err = ExtractOp::new()
            .extract_item(&DataItem::Missing, &dict_schema.into(), no_fallbacks(&db), None)
            .unwrap_err();
        assert!(err.to_string().contains("dict schema"));
    }

    #[test]
    fn test_invalid_schemas() {
        let db = DataBagImpl::new();
        let objs = DataSliceImpl::allocate_empty_objects(1);
        let err = ExtractOp::new()
            .extract(&objs, &DataItem::from(1), no_fallbacks(&db), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "unsupported schema type");

        let err = ExtractOp::new()
            .extract(&objs, &DType::Any.into(), no_fallbacks(&db), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "clone/extract not supported for kAny schema");
    }

    #[test]
    fn test_shallow_clone_lists_and_dicts() {
        let lists = allocate_lists(1).object_id(0);
        let dicts = allocate_dicts(1).object_id(0);
        let list_schema = allocate_explicit_schema();
        let dict_schema = allocate_explicit_schema();
        let mut db = DataBagImpl::new();
        db.set_schema_attr(list_schema, LIST_ITEMS_SCHEMA_ATTR, DType::Int32.into())
            .unwrap();
        db.set_schema_attr(dict_schema, DICT_KEYS_SCHEMA_ATTR, DType::Text.into())
            .unwrap();
        db.set_schema_attr(dict_schema, DICT_VALUES_SCHEMA_ATTR, DType::Int32.into())
            .unwrap();
        db.set_list(lists, vec![1.into(), 2.into()]).unwrap();
        db.set_in_dict(dicts, DataItem::text("a"), 7.into()).unwrap();

        let (result, item, schema) = ShallowCloneOp::new()
            .shallow_clone_item(&lists.into(), &list_schema.into(), no_fallbacks(&db), None)
            .unwrap();
        let new_list = item.as_object_id().unwrap();
        assert_ne!(new_list, lists);
        assert!(new_list.is_list());
        assert_eq!(schema, DataItem::from(list_schema));
        assert_eq!(result.get_list(new_list, &[]).unwrap().len(), 2);
        assert!(result.get_list(lists, &[]).is_none());

        let (result, item, _) = ShallowCloneOp::new()
            .shallow_clone_item(&dicts.into(), &dict_schema.into(), no_fallbacks(&db), None)
            .unwrap();
        let new_dict = item.as_object_id().unwrap();
        assert!(new_dict.is_dict());
        assert_eq!(
            result.get_from_dict(new_dict, &DataItem::text("a"), &[]),
            DataItem::from(7)
        );
    }

    #[test]
    fn test_shallow_clone_dedups_repeated_objects() {
        let schema = allocate_explicit_schema();
        let entity = DataSliceImpl::allocate_empty_objects(1).get(0);
        let ds =
            DataSliceImpl::from_items([entity.clone(), DataItem::from(3), entity, schema.into()]);
        let mut db = DataBagImpl::new();
        db.set_schema_attr(schema, "a", DType::Int32.into()).unwrap();
        let (_, cloned, _) = ShallowCloneOp::new()
            .shallow_clone(&ds, &schema.into(), no_fallbacks(&db), None)
            .unwrap();
        assert_eq!(cloned.get(0), cloned.get(2));
        assert_ne!(cloned.get(0), ds.get(0));
        assert_eq!(cloned.get(1), DataItem::from(3));
        assert_eq!(cloned.get(3), DataItem::from(schema));
    }
}
