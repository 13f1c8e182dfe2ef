//! # Object Graph Store
//!
//! [`DataBagImpl`] stores three tables:
//!
//! - attribute triples `(object, name) -> DataItem`, for entities and schema
//!   objects alike
//! - list contents keyed by list id
//! - dict contents keyed by dict id
//!
//! Every read takes a *fallback span*: an ordered list of subordinate stores
//! consulted, highest priority first, when the local table has no entry. A
//! locally stored [`DataItem::Missing`] is an entry and masks the fallbacks.
//!
//! [`DataBag`] is the shared handle: a lock around one `DataBagImpl` plus a
//! list of fallback handles. [`FlattenFallbackFinder`] turns a handle's nested
//! fallbacks into the flat span the store expects.

pub mod dict;
pub mod handle;

pub use dict::{validate_dict_key, Dict};
pub use handle::{DataBag, FlattenFallbackFinder, ReadGuards};

use crate::error::{DataError, DataResult};
use crate::schema;
use crate::slice::{DataSliceImpl, DataSliceImplBuilder, Edge};
use crate::value::{DataItem, Fingerprint, ObjectId, StableHasher};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Ordered read-only subordinate stores
pub type FallbackSpan<'a> = &'a [&'a DataBagImpl];

type Attrs = HashMap<Arc<str>, DataItem>;

/// Mutable triple store with list and dict tables
#[derive(Debug, Clone, Default)]
pub struct DataBagImpl {
    attrs: HashMap<ObjectId, Attrs>,
    lists: HashMap<ObjectId, Vec<DataItem>>,
    dicts: HashMap<ObjectId, Dict>,
}

impl DataBagImpl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with tables pre-sized for `capacity` objects
    pub fn with_capacity(capacity: usize) -> Self {
        DataBagImpl {
            attrs: HashMap::with_capacity(capacity),
            lists: HashMap::with_capacity(capacity),
            dicts: HashMap::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.lists.is_empty() && self.dicts.is_empty()
    }

    /// Number of stored attribute triples (schema triples included)
    pub fn triple_count(&self) -> usize {
        self.attrs.values().map(HashMap::len).sum()
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    pub fn dict_count(&self) -> usize {
        self.dicts.len()
    }

    // Attributes

    fn local_attr(&self, obj: ObjectId, attr: &str) -> Option<&DataItem> {
        self.attrs.get(&obj).and_then(|attrs| attrs.get(attr))
    }

    /// Value of `obj.attr`, consulting fallbacks on a local miss
    pub fn get_attr(&self, obj: ObjectId, attr: &str, fallbacks: FallbackSpan<'_>) -> DataItem {
        std::iter::once(self)
            .chain(fallbacks.iter().copied())
            .find_map(|bag| bag.local_attr(obj, attr))
            .cloned()
            .unwrap_or_default()
    }

    /// `attr` of every object in `objs`; non-object items yield missing
    pub fn get_attr_slice(
        &self,
        objs: &DataSliceImpl,
        attr: &str,
        fallbacks: FallbackSpan<'_>,
    ) -> DataSliceImpl {
        let mut builder = DataSliceImplBuilder::new(objs.size());
        for (i, obj) in objs.object_ids() {
            builder.insert(i, self.get_attr(obj, attr, fallbacks));
        }
        builder.build()
    }

    pub fn set_attr(&mut self, obj: ObjectId, attr: &str, value: DataItem) {
        self.attrs
            .entry(obj)
            .or_default()
            .insert(Arc::from(attr), value);
    }

    /// Set `attr` on every object of `objs` to the value at the same position
    pub fn set_attr_slice(
        &mut self,
        objs: &DataSliceImpl,
        attr: &str,
        values: &DataSliceImpl,
    ) -> DataResult<()> {
        if objs.size() != values.size() {
            return Err(DataError::invalid_argument(format!(
                "size mismatch: {} objects, {} values",
                objs.size(),
                values.size()
            )));
        }
        for (i, obj) in objs.object_ids() {
            self.set_attr(obj, attr, values.get(i));
        }
        Ok(())
    }

    /// Attribute names with a present value on `obj`, sorted
    pub fn get_attr_names(&self, obj: ObjectId, fallbacks: FallbackSpan<'_>) -> Vec<Arc<str>> {
        let mut names = BTreeSet::new();
        for bag in std::iter::once(self).chain(fallbacks.iter().copied()) {
            if let Some(attrs) = bag.attrs.get(&obj) {
                names.extend(attrs.keys().cloned());
            }
        }
        names
            .into_iter()
            .filter(|name| self.get_attr(obj, name, fallbacks).has_value())
            .collect()
    }

    /// Names and values stored in this store only (fallbacks ignored)
    pub fn local_attrs(&self, obj: ObjectId) -> impl Iterator<Item = (&Arc<str>, &DataItem)> {
        self.attrs.get(&obj).into_iter().flatten()
    }

    // Schema attributes

    /// Declare `schema.attr` to have schema `value`
    pub fn set_schema_attr(
        &mut self,
        schema: ObjectId,
        attr: &str,
        value: DataItem,
    ) -> DataResult<()> {
        if !schema.is_schema() {
            return Err(DataError::invalid_argument(format!(
                "cannot set schema attribute '{attr}' on non-schema object {schema}"
            )));
        }
        if value.has_value() {
            schema::verify_is_schema(&value)?;
        }
        self.set_attr(schema, attr, value);
        Ok(())
    }

    pub fn get_schema_attr(
        &self,
        schema: ObjectId,
        attr: &str,
        fallbacks: FallbackSpan<'_>,
    ) -> DataItem {
        self.get_attr(schema, attr, fallbacks)
    }

    /// Declared attribute names of an explicit schema, sorted
    pub fn get_schema_attr_names(
        &self,
        schema: ObjectId,
        fallbacks: FallbackSpan<'_>,
    ) -> Vec<Arc<str>> {
        self.get_attr_names(schema, fallbacks)
    }

    // Lists

    /// Contents of `list`, from the highest-priority store that has it
    pub fn get_list<'a>(&'a self, list: ObjectId, fallbacks: &[&'a DataBagImpl]) -> Option<&'a [DataItem]> {
        std::iter::once(self)
            .chain(fallbacks.iter().copied())
            .find_map(|bag| bag.lists.get(&list))
            .map(Vec::as_slice)
    }

    pub fn list_size(&self, list: ObjectId, fallbacks: FallbackSpan<'_>) -> usize {
        self.get_list(list, fallbacks).map_or(0, <[DataItem]>::len)
    }

    /// Sizes of every list in `lists`, as an INT64 slice
    pub fn get_list_sizes(&self, lists: &DataSliceImpl, fallbacks: FallbackSpan<'_>) -> DataSliceImpl {
        let mut builder = DataSliceImplBuilder::new(lists.size());
        for (i, list) in lists.object_ids() {
            builder.insert(i, DataItem::Int64(self.list_size(list, fallbacks) as i64));
        }
        builder.build()
    }

    pub fn set_list(&mut self, list: ObjectId, items: Vec<DataItem>) -> DataResult<()> {
        check_kind(list, ObjectId::is_list, "list")?;
        self.lists.insert(list, items);
        Ok(())
    }

    fn local_list_mut(&mut self, list: ObjectId, fallbacks: FallbackSpan<'_>) -> &mut Vec<DataItem> {
        if !self.lists.contains_key(&list) {
            let inherited = fallbacks
                .iter()
                .find_map(|bag| bag.lists.get(&list))
                .cloned()
                .unwrap_or_default();
            self.lists.insert(list, inherited);
        }
        self.lists.entry(list).or_default()
    }

    pub fn append_to_list(
        &mut self,
        list: ObjectId,
        item: DataItem,
        fallbacks: FallbackSpan<'_>,
    ) -> DataResult<()> {
        check_kind(list, ObjectId::is_list, "list")?;
        self.local_list_mut(list, fallbacks).push(item);
        Ok(())
    }

    /// Append `values[edge.range(i)]` to the i-th list of `lists`
    pub fn extend_lists(
        &mut self,
        lists: &DataSliceImpl,
        values: &DataSliceImpl,
        edge: &Edge,
        fallbacks: FallbackSpan<'_>,
    ) -> DataResult<()> {
        if edge.parent_size() != lists.size() || edge.child_size() != values.size() {
            return Err(DataError::invalid_argument(format!(
                "extend_lists: edge {}->{} does not match {} lists and {} values",
                edge.parent_size(),
                edge.child_size(),
                lists.size(),
                values.size()
            )));
        }
        for (i, list) in lists.object_ids() {
            check_kind(list, ObjectId::is_list, "list")?;
            let target = self.local_list_mut(list, fallbacks);
            target.extend(edge.range(i).map(|j| values.get(j)));
        }
        Ok(())
    }

    /// Items of all `lists`, flattened, with the edge of per-list sizes
    pub fn explode_lists(&self, lists: &DataSliceImpl, fallbacks: FallbackSpan<'_>) -> (DataSliceImpl, Edge) {
        let mut items = Vec::new();
        let mut sizes = vec![0usize; lists.size()];
        for (i, list) in lists.object_ids() {
            if let Some(values) = self.get_list(list, fallbacks) {
                sizes[i] = values.len();
                items.extend_from_slice(values);
            }
        }
        (DataSliceImpl::from_items(items), Edge::from_sizes(sizes))
    }

    // Dicts

    pub fn set_in_dict(&mut self, dict: ObjectId, key: DataItem, value: DataItem) -> DataResult<()> {
        check_kind(dict, ObjectId::is_dict, "dict")?;
        validate_dict_key(&key)?;
        self.dicts.entry(dict).or_default().set(key, value);
        Ok(())
    }

    /// Value for `key`, consulting fallbacks on a local miss
    pub fn get_from_dict(&self, dict: ObjectId, key: &DataItem, fallbacks: FallbackSpan<'_>) -> DataItem {
        std::iter::once(self)
            .chain(fallbacks.iter().copied())
            .find_map(|bag| bag.dicts.get(&dict).and_then(|d| d.get(key)))
            .cloned()
            .unwrap_or_default()
    }

    /// Keys with a present value, local keys first, then fallback keys
    pub fn get_dict_keys(&self, dict: ObjectId, fallbacks: FallbackSpan<'_>) -> Vec<DataItem> {
        let mut seen = std::collections::HashSet::new();
        let mut keys = Vec::new();
        for bag in std::iter::once(self).chain(fallbacks.iter().copied()) {
            let Some(d) = bag.dicts.get(&dict) else {
                continue;
            };
            for key in d.keys() {
                if seen.insert(key.clone()) && self.get_from_dict(dict, key, fallbacks).has_value() {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }

    pub fn dict_size(&self, dict: ObjectId, fallbacks: FallbackSpan<'_>) -> usize {
        self.get_dict_keys(dict, fallbacks).len()
    }

    /// Present `(key, value)` pairs of `dict` in key order
    pub fn get_dict_entries(&self, dict: ObjectId, fallbacks: FallbackSpan<'_>) -> Vec<(DataItem, DataItem)> {
        self.get_dict_keys(dict, fallbacks)
            .into_iter()
            .map(|key| {
                let value = self.get_from_dict(dict, &key, fallbacks);
                (key, value)
            })
            .collect()
    }

    /// Order-independent digest of the store's contents
    ///
    /// Two stores with the same triples, lists and dicts have the same
    /// fingerprint regardless of insertion order.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut entries: Vec<Fingerprint> = Vec::new();
        for (obj, attrs) in &self.attrs {
            for (name, value) in attrs {
                let mut h = StableHasher::new("attr");
                DataItem::ObjectId(*obj).combine_into(&mut h);
                h.combine_str(name);
                value.combine_into(&mut h);
                entries.push(h.finish());
            }
        }
        for (list, items) in &self.lists {
            let mut h = StableHasher::new("list");
            DataItem::ObjectId(*list).combine_into(&mut h);
            h.combine_u64(items.len() as u64);
            for item in items {
                item.combine_into(&mut h);
            }
            entries.push(h.finish());
        }
        for (dict, contents) in &self.dicts {
            for key in contents.keys() {
                let mut h = StableHasher::new("dict");
                DataItem::ObjectId(*dict).combine_into(&mut h);
                key.combine_into(&mut h);
                contents.get(key).cloned().unwrap_or_default().combine_into(&mut h);
                entries.push(h.finish());
            }
        }
        entries.sort_unstable();
        let mut hasher = StableHasher::new("data_bag");
        hasher.combine_u64(entries.len() as u64);
        for entry in &entries {
            hasher.combine_fingerprint(entry);
        }
        hasher.finish()
    }
}

fn check_kind(obj: ObjectId, pred: fn(&ObjectId) -> bool, kind: &str) -> DataResult<()> {
    if pred(&obj) {
        Ok(())
    } else {
        Err(DataError::invalid_argument(format!("{obj} is not a {kind}")))
    }
}
