//! # Group-By Indices and Unique
//!
//! Both operators work on the last dimension of a jagged shape. Each parent
//! segment of the last edge is grouped on its own; group ids are numbered
//! globally across segments.
//!
//! `group_by_indices` returns, for every group, the positions (relative to the
//! start of the segment) of the items in that group. Groups are ordered by
//! first appearance or, when sorted, by key. The result has one more
//! dimension than the input: `[.., groups, items]`.
//!
//! Homogeneous columns run through a monomorphized path per element type;
//! mixed slices run the same algorithm over [`DataItem`]s.

use crate::error::{DataError, DataResult};
use crate::slice::{
    DataSlice, DataSliceImpl, Edge, JaggedShape, SliceValue, TypedValues, TypedVisitor,
};
use crate::value::{DType, DataItem};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::trace;

const UNDEFINED_GROUP: usize = usize::MAX;

/// Computes grouping indices over one or more key slices
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupByIndicesOp {
    sort: bool,
}

impl GroupByIndicesOp {
    /// Groups in order of first appearance
    pub fn new() -> Self {
        GroupByIndicesOp { sort: false }
    }

    /// Groups in ascending key order
    pub fn sorted() -> Self {
        GroupByIndicesOp { sort: true }
    }

    pub fn is_sorted(&self) -> bool {
        self.sort
    }

    /// Group positions of the last dimension by the tuple of `keys`
    ///
    /// Items missing in any key belong to no group. All keys must share one
    /// shape of rank at least 1.
    pub fn eval(&self, keys: &[DataSlice]) -> DataResult<DataSlice> {
        let first = keys
            .first()
            .ok_or_else(|| DataError::invalid_argument("requires at least 1 argument"))?;
        let shape = first.shape();
        let Some(last_edge) = shape.edges().last() else {
            return Err(DataError::invalid_argument(
                "group_by is not supported for scalar data",
            ));
        };

        let mut processor = GroupByIndicesProcessor::new(last_edge.split_points(), self.sort);
        for key in keys {
            if !key.shape().is_equivalent_to(shape) {
                return Err(DataError::invalid_argument(
                    "all arguments must have the same shape",
                ));
            }
            let values = key.to_slice_impl();
            if self.sort {
                check_sortable(&values)?;
            }
            processor.process_key(&values);
        }

        let (indices, group_edge, item_edge) = processor.finish()?;
        trace!(
            groups = group_edge.child_size(),
            items = indices.len(),
            "group_by_indices"
        );
        let new_shape = shape
            .remove_dims(shape.rank() - 1)
            .add_dims(vec![group_edge, item_edge])?;
        let values = TypedValues::Int64(indices.into_iter().map(Some).collect());
        DataSlice::from_impl(
            DataSliceImpl::from_typed(values),
            new_shape,
            DataItem::DType(DType::Int64),
        )
    }
}

fn check_sortable(values: &DataSliceImpl) -> DataResult<()> {
    if values.is_mixed_dtype() {
        return Err(DataError::invalid_argument(
            "sort is not supported for mixed dtype",
        ));
    }
    match values.dtype() {
        Some(dtype) if !dtype.is_sortable() => Err(DataError::invalid_argument(format!(
            "sort is not supported for {dtype}"
        ))),
        _ => Ok(()),
    }
}

/// Running group assignment, refined by one key at a time
struct GroupByIndicesProcessor<'a> {
    split_points: &'a [i64],
    group_id: Vec<usize>,
    sort: bool,
}

impl<'a> GroupByIndicesProcessor<'a> {
    fn new(split_points: &'a [i64], sort: bool) -> Self {
        let size = split_points.last().map_or(0, |&last| last as usize);
        GroupByIndicesProcessor {
            split_points,
            group_id: vec![0; size],
            sort,
        }
    }

    fn process_key(&mut self, values: &DataSliceImpl) {
        if values.is_empty_and_unknown() {
            self.group_id.fill(UNDEFINED_GROUP);
        } else if let Some(items) = values.mixed_values() {
            self.process_values(|i| Some(&items[i]).filter(|item| item.has_value()));
        } else if let Some(typed) = values.typed_values() {
            typed.visit(ProcessKey(self));
        }
    }

    /// Split every existing group by the value at each position
    fn process_values<'v, T: SliceValue>(&mut self, get: impl Fn(usize) -> Option<&'v T>) {
        let (sort, split_points) = (self.sort, self.split_points);
        let mut key_to_group: HashMap<(usize, T::Key), usize> = HashMap::new();
        let mut to_sort: Vec<(usize, T)> = Vec::new();
        let mut next_group = 0usize;
        for segment in split_points.windows(2) {
            let (begin, end) = (segment[0] as usize, segment[1] as usize);
            key_to_group.clear();
            to_sort.clear();
            let first_group = next_group;
            for i in begin..end {
                let previous = self.group_id[i];
                let value = get(i).filter(|_| previous != UNDEFINED_GROUP);
                let Some(value) = value else {
                    self.group_id[i] = UNDEFINED_GROUP;
                    continue;
                };
                let group = *key_to_group
                    .entry((previous, value.key()))
                    .or_insert_with(|| {
                        if sort {
                            to_sort.push((previous, value.clone()));
                        }
                        next_group += 1;
                        next_group - 1
                    });
                self.group_id[i] = group;
            }
            if sort {
                self.sort_segment(first_group, begin..end, &to_sort);
            }
        }
    }

    /// Renumber the groups of one segment in (previous group, value) order
    fn sort_segment<T: SliceValue>(
        &mut self,
        first_group: usize,
        positions: std::ops::Range<usize>,
        to_sort: &[(usize, T)],
    ) {
        let mut order: Vec<usize> = (0..to_sort.len()).collect();
        order.sort_by(|&a, &b| {
            let (group_a, value_a) = &to_sort[a];
            let (group_b, value_b) = &to_sort[b];
            group_a
                .cmp(group_b)
                .then_with(|| value_a.sort_cmp(value_b).unwrap_or(Ordering::Equal))
        });
        let mut rank = vec![0usize; order.len()];
        for (position, &group) in order.iter().enumerate() {
            rank[group] = position;
        }
        for group in &mut self.group_id[positions] {
            if *group != UNDEFINED_GROUP {
                *group = first_group + rank[*group - first_group];
            }
        }
    }

    /// Indices grouped per group, plus the group and item edges
    fn finish(self) -> DataResult<(Vec<i64>, Edge, Edge)> {
        let size = self.group_id.len();
        let mut indices = vec![0i64; size];
        let mut group_split_points = vec![0i64; self.split_points.len()];
        let mut item_split_points = vec![0i64];
        // Per group: item count, then the next output slot of the group
        let mut slots = vec![0usize; size];
        let mut output_end = 0usize;
        let mut group_count = 0usize;

        for (split_id, segment) in self.split_points.windows(2).enumerate() {
            let (begin, end) = (segment[0] as usize, segment[1] as usize);
            let mut local_groups = 0usize;
            let mut min_group = usize::MAX;
            let mut max_group = 0usize;
            for &group in &self.group_id[begin..end] {
                if group == UNDEFINED_GROUP {
                    continue;
                }
                if slots[group] == 0 {
                    local_groups += 1;
                }
                slots[group] += 1;
                min_group = min_group.min(group);
                max_group = max_group.max(group + 1);
            }
            group_count += local_groups;
            group_split_points[split_id + 1] = group_count as i64;
            if local_groups == 0 {
                continue;
            }

            let mut running = output_end;
            for slot in &mut slots[min_group..max_group] {
                let count = *slot;
                if count != 0 {
                    running += count;
                    item_split_points.push(running as i64);
                }
                *slot = running - count;
            }
            for (offset, &group) in self.group_id[begin..end].iter().enumerate() {
                if group == UNDEFINED_GROUP {
                    continue;
                }
                indices[slots[group]] = offset as i64;
                slots[group] += 1;
            }
            output_end = running;
        }

        indices.truncate(output_end);
        Ok((
            indices,
            Edge::from_split_points(group_split_points)?,
            Edge::from_split_points(item_split_points)?,
        ))
    }
}

struct ProcessKey<'p, 'a>(&'p mut GroupByIndicesProcessor<'a>);

impl TypedVisitor for ProcessKey<'_, '_> {
    type Output = ();

    fn visit<T: SliceValue>(self, values: &[Option<T>]) {
        self.0.process_values(|i| values[i].as_ref());
    }
}

/// Distinct values of the last dimension, per parent segment
///
/// Values keep their first-appearance order unless `sort` (a BOOLEAN scalar)
/// is true. Scalars are returned unchanged.
pub fn unique(x: &DataSlice, sort: &DataSlice) -> DataResult<DataSlice> {
    let Some(last_edge) = x.shape().edges().last() else {
        return Ok(x.clone());
    };
    let sort = sort
        .item()
        .and_then(DataItem::as_bool)
        .ok_or_else(|| DataError::invalid_argument("sort must be a boolean scalar"))?;
    let values = x.to_slice_impl();
    if sort {
        check_sortable(&values)?;
    }

    let split_points = last_edge.split_points();
    let (unique_values, sizes) = if values.is_empty_and_unknown() {
        (
            DataSliceImpl::create_empty_and_unknown_type(0),
            vec![0; split_points.len() - 1],
        )
    } else if let Some(items) = values.mixed_values() {
        unique_values(split_points, sort, |i| {
            Some(&items[i]).filter(|item| item.has_value())
        })
    } else if let Some(typed) = values.typed_values() {
        typed.visit(UniqueVisitor { split_points, sort })
    } else {
        return Err(DataError::internal("slice has no storage"));
    };

    let shape: JaggedShape = x
        .shape()
        .remove_dims(x.rank() - 1)
        .add_dims(vec![Edge::from_sizes(sizes)])?;
    Ok(DataSlice::from_impl(unique_values, shape, x.schema().clone())?.with_bag(x.bag().cloned()))
}

fn unique_values<'v, T: SliceValue>(
    split_points: &[i64],
    sort: bool,
    get: impl Fn(usize) -> Option<&'v T>,
) -> (DataSliceImpl, Vec<usize>) {
    let mut seen: HashSet<T::Key> = HashSet::new();
    let mut out: Vec<DataItem> = Vec::new();
    let mut sizes = Vec::with_capacity(split_points.len().saturating_sub(1));
    for segment in split_points.windows(2) {
        seen.clear();
        let mut group: Vec<&T> = Vec::new();
        for i in segment[0] as usize..segment[1] as usize {
            if let Some(value) = get(i) {
                if seen.insert(value.key()) {
                    group.push(value);
                }
            }
        }
        if sort {
            group.sort_by(|a, b| a.sort_cmp(b).unwrap_or(Ordering::Equal));
        }
        sizes.push(group.len());
        out.extend(group.into_iter().map(SliceValue::to_item));
    }
    (DataSliceImpl::from_items(out), sizes)
}

struct UniqueVisitor<'a> {
    split_points: &'a [i64],
    sort: bool,
}

impl TypedVisitor for UniqueVisitor<'_> {
    type Output = (DataSliceImpl, Vec<usize>);

    fn visit<T: SliceValue>(self, values: &[Option<T>]) -> Self::Output {
        unique_values(self.split_points, self.sort, |i| values[i].as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn edge(points: &[i64]) -> Edge {
        Edge::from_split_points(points.to_vec()).unwrap()
    }

    fn jagged(values: DataSliceImpl, points: &[i64]) -> DataSlice {
        let parents = points.len() - 1;
        let shape = JaggedShape::flat(parents).add_dims(vec![edge(points)]).unwrap();
        DataSlice::from_impl(values, shape, DType::Int32.into()).unwrap()
    }

    fn ints(values: &[Option<i32>]) -> DataSliceImpl {
        DataSliceImpl::from_typed(TypedValues::Int32(values.to_vec()))
    }

    fn as_i64(ds: &DataSlice) -> Vec<i64> {
        ds.to_slice_impl()
            .iter()
            .filter_map(|item| item.as_i64())
            .collect()
    }

    #[test]
    fn test_group_by_flat() {
        let x = DataSlice::flat(
            ints(&[Some(5), Some(7), Some(5), Some(1), Some(7), None]),
            DType::Int32.into(),
        );
        let result = GroupByIndicesOp::new().eval(&[x.clone()]).unwrap();
        assert_eq!(as_i64(&result), vec![0, 2, 1, 4, 3]);
        assert_eq!(result.rank(), 2);
        assert_eq!(result.shape().edges()[0].split_points(), &[0, 3]);
        assert_eq!(result.shape().edges()[1].split_points(), &[0, 2, 4, 5]);

        let sorted = GroupByIndicesOp::sorted().eval(&[x]).unwrap();
        assert_eq!(as_i64(&sorted), vec![3, 0, 2, 1, 4]);
    }

    #[test]
    fn test_group_by_segments_are_independent() {
        let x = jagged(ints(&[Some(1), Some(2), Some(1), Some(2), Some(2)]), &[0, 3, 5]);
        let result = GroupByIndicesOp::new().eval(&[x]).unwrap();
        assert_eq!(result.rank(), 3);
        assert_eq!(as_i64(&result), vec![0, 2, 1, 0, 1]);
        assert_eq!(result.shape().edges()[1].split_points(), &[0, 2, 3]);
        assert_eq!(result.shape().edges()[2].split_points(), &[0, 2, 3, 5]);
    }

    #[test]
    fn test_group_by_errors() {
        let err = GroupByIndicesOp::new().eval(&[]).unwrap_err();
        assert_eq!(err.to_string(), "requires at least 1 argument");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let scalar = DataSlice::from_item(1.into(), DType::Int32.into());
        let err = GroupByIndicesOp::new().eval(&[scalar]).unwrap_err();
        assert_eq!(err.to_string(), "group_by is not supported for scalar data");

        let a = DataSlice::flat(ints(&[Some(1), Some(2)]), DType::Int32.into());
        let b = DataSlice::flat(ints(&[Some(1)]), DType::Int32.into());
        let err = GroupByIndicesOp::new().eval(&[a, b]).unwrap_err();
        assert_eq!(err.to_string(), "all arguments must have the same shape");

        let mixed = DataSlice::flat(
            DataSliceImpl::from_items([DataItem::from(1), DataItem::text("a")]),
            DType::Object.into(),
        );
        assert!(GroupByIndicesOp::new().eval(&[mixed.clone()]).is_ok());
        let err = GroupByIndicesOp::sorted().eval(&[mixed]).unwrap_err();
        assert_eq!(err.to_string(), "sort is not supported for mixed dtype");

        let exprs = DataSlice::flat(
            DataSliceImpl::from_items([DataItem::expr("a")]),
            DType::Expr.into(),
        );
        let err = GroupByIndicesOp::sorted().eval(&[exprs]).unwrap_err();
        assert_eq!(err.to_string(), "sort is not supported for EXPR");
    }

    #[test]
    fn test_unique() {
        let x = jagged(
            ints(&[Some(3), Some(1), Some(3), None, Some(2), Some(2)]),
            &[0, 4, 6],
        );
        let no_sort = DataSlice::from_item(false.into(), DType::Bool.into());
        let result = unique(&x, &no_sort).unwrap();
        assert_eq!(as_i64(&result), vec![3, 1, 2]);
        assert_eq!(result.shape().edges()[1].split_points(), &[0, 2, 3]);

        let with_sort = DataSlice::from_item(true.into(), DType::Bool.into());
        let result = unique(&x, &with_sort).unwrap();
        assert_eq!(as_i64(&result), vec![1, 3, 2]);
        assert_eq!(result.schema(), &DataItem::from(DType::Int32));
    }

    #[test]
    fn test_unique_scalar_and_bad_sort() {
        let x = DataSlice::from_item(1.into(), DType::Int32.into());
        let no_sort = DataSlice::from_item(false.into(), DType::Bool.into());
        assert_eq!(unique(&x, &no_sort).unwrap().item(), Some(&DataItem::from(1)));

        let bad = DataSlice::from_item(1.into(), DType::Int32.into());
        assert_eq!(unique(&x, &bad).unwrap().item(), Some(&DataItem::from(1)));

        let flat = DataSlice::flat(ints(&[Some(1)]), DType::Int32.into());
        let err = unique(&flat, &bad).unwrap_err();
        assert_eq!(err.to_string(), "sort must be a boolean scalar");
    }
}
