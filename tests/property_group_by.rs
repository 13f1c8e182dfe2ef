//! Property-based tests for grouping, unique and extraction (proptest).

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};

use databag::value::{allocate_explicit_schema, allocate_objects};
use databag::{
    extract, unique, DType, DataBag, DataBagImpl, DataItem, DataSlice, DataSliceImpl, Edge,
    GroupByIndicesOp, JaggedShape,
};

/// Rank-2 slice with one segment per inner vector
fn jagged(segments: &[Vec<Option<i32>>]) -> DataSlice {
    let edge = Edge::from_sizes(segments.iter().map(Vec::len));
    let shape = JaggedShape::flat(segments.len())
        .add_dims(vec![edge])
        .expect("sizes match");
    let items = segments
        .iter()
        .flatten()
        .map(|v| DataItem::from(*v))
        .collect::<Vec<_>>();
    DataSlice::from_impl(DataSliceImpl::from_items(items), shape, DType::Int32.into())
        .expect("shape matches")
}

/// Per segment, per group: positions within the segment
fn decode_groups(result: &DataSlice, segments: usize) -> Vec<Vec<Vec<usize>>> {
    let edges = result.shape().edges();
    let (group_edge, item_edge) = (&edges[1], &edges[2]);
    let values = result.to_slice_impl();
    (0..segments)
        .map(|s| {
            group_edge
                .range(s)
                .map(|g| {
                    item_edge
                        .range(g)
                        .map(|i| values.get(i).as_i64().expect("INT64 index") as usize)
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn segments_strategy() -> impl Strategy<Value = Vec<Vec<Option<i32>>>> {
    prop::collection::vec(
        prop::collection::vec(prop::option::weighted(0.8, -5i32..5), 0..12),
        1..5,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Groups partition the present positions and share one key
    #[test]
    fn prop_groups_partition_present_positions(segments in segments_strategy()) {
        let x = jagged(&segments);
        let result = GroupByIndicesOp::new().eval(&[x]).expect("group_by succeeds");
        prop_assert_eq!(result.rank(), 3);

        for (segment, groups) in segments.iter().zip(decode_groups(&result, segments.len())) {
            let mut seen: Vec<usize> = groups.iter().flatten().copied().collect();
            seen.sort_unstable();
            let present: Vec<usize> = segment
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|_| i))
                .collect();
            prop_assert_eq!(seen, present);

            let mut keys = HashSet::new();
            let mut previous_first = None;
            for group in &groups {
                prop_assert!(!group.is_empty());
                prop_assert!(group.windows(2).all(|w| w[0] < w[1]));
                let key = segment[group[0]];
                prop_assert!(group.iter().all(|&i| segment[i] == key));
                prop_assert!(keys.insert(key), "key {:?} split over two groups", key);
                // Unsorted groups follow first appearance
                prop_assert!(previous_first < Some(group[0]));
                previous_first = Some(group[0]);
            }
        }
    }

    /// Sorted grouping orders groups by ascending key
    #[test]
    fn prop_sorted_groups_ascend(segments in segments_strategy()) {
        let x = jagged(&segments);
        let result = GroupByIndicesOp::sorted().eval(&[x]).expect("group_by succeeds");
        for (segment, groups) in segments.iter().zip(decode_groups(&result, segments.len())) {
            let keys: Vec<i32> = groups
                .iter()
                .filter_map(|group| segment[group[0]])
                .collect();
            prop_assert_eq!(keys.len(), groups.len());
            prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }
    }

    /// Unique agrees with a per-segment distinct pass
    #[test]
    fn prop_unique_matches_distinct(segments in segments_strategy(), sort in any::<bool>()) {
        let x = jagged(&segments);
        let sort_arg = DataSlice::from_item(sort.into(), DType::Bool.into());
        let result = unique(&x, &sort_arg).expect("unique succeeds");

        let mut expected = Vec::new();
        let mut sizes = Vec::new();
        for segment in &segments {
            let mut seen = HashSet::new();
            let mut distinct: Vec<i32> = segment
                .iter()
                .flatten()
                .copied()
                .filter(|v| seen.insert(*v))
                .collect();
            if sort {
                distinct.sort_unstable();
            }
            sizes.push(distinct.len());
            expected.extend(distinct.into_iter().map(DataItem::from));
        }
        prop_assert_eq!(result.shape().edges()[1].clone(), Edge::from_sizes(sizes));
        let actual: Vec<DataItem> = result.to_slice_impl().iter().collect();
        prop_assert_eq!(actual, expected);
    }

    /// Extraction keeps exactly the objects reachable from the root
    #[test]
    fn prop_extract_keeps_reachable(
        links in prop::collection::vec(prop::option::of(0usize..8), 8),
    ) {
        let alloc = allocate_objects(8);
        let schema = allocate_explicit_schema();
        let mut db = DataBagImpl::new();
        db.set_schema_attr(schema, "next", schema.into()).expect("schema attr");
        for (i, link) in links.iter().enumerate() {
            db.set_attr(alloc.object_id(i as u32), "id", DataItem::from(i as i32));
            if let Some(target) = link {
                db.set_attr(alloc.object_id(i as u32), "next", alloc.object_id(*target as u32).into());
            }
        }

        let mut reachable = HashSet::new();
        let mut queue = VecDeque::from([0usize]);
        while let Some(i) = queue.pop_front() {
            if reachable.insert(i) {
                queue.extend(links[i]);
            }
        }

        let root = DataSlice::from_item(alloc.object_id(0).into(), schema.into())
            .with_bag(Some(DataBag::from_impl(db)));
        let extracted = extract(&root).expect("extract succeeds");
        let store = extracted.bag().expect("extract attaches a bag").read();
        for (i, link) in links.iter().enumerate() {
            let next = store.get_attr(alloc.object_id(i as u32), "next", &[]);
            if reachable.contains(&i) {
                let expected = link.map_or(DataItem::Missing, |t| alloc.object_id(t as u32).into());
                prop_assert_eq!(next, expected);
            } else {
                prop_assert!(next.is_missing());
            }
            // `id` is not declared by the schema
            prop_assert!(store.get_attr(alloc.object_id(i as u32), "id", &[]).is_missing());
        }
    }
}
