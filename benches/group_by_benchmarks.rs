//! Group-by, unique and extraction benchmarks at growing slice sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use databag::value::{allocate_explicit_schema, allocate_objects};
use databag::{
    extract, unique, DType, DataBag, DataBagImpl, DataItem, DataSlice, DataSliceImpl, Edge,
    GroupByIndicesOp, JaggedShape,
};
use std::hint::black_box;
use std::time::Duration;

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

/// `size` ints with `size / 10` distinct keys, split into segments of 100
fn make_keys(size: usize) -> DataSlice {
    let items = (0..size).map(|i| DataItem::from(((i * 7919) % (size / 10).max(1)) as i32));
    let segments = size / 100;
    let shape = JaggedShape::flat(segments)
        .add_dims(vec![Edge::uniform(segments, 100)])
        .expect("uniform edge");
    DataSlice::from_impl(DataSliceImpl::from_items(items), shape, DType::Int32.into())
        .expect("shape matches")
}

fn bench_group_by(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_by_indices");
    for &size in &SIZES {
        let keys = make_keys(size);
        group.bench_with_input(BenchmarkId::new("unsorted", size), &keys, |b, keys| {
            b.iter(|| GroupByIndicesOp::new().eval(black_box(std::slice::from_ref(keys))))
        });
        group.bench_with_input(BenchmarkId::new("sorted", size), &keys, |b, keys| {
            b.iter(|| GroupByIndicesOp::sorted().eval(black_box(std::slice::from_ref(keys))))
        });
    }
    group.finish();
}

fn bench_unique(c: &mut Criterion) {
    let mut group = c.benchmark_group("unique");
    let sort = DataSlice::from_item(true.into(), DType::Bool.into());
    for &size in &SIZES {
        let keys = make_keys(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &keys, |b, keys| {
            b.iter(|| unique(black_box(keys), &sort))
        });
    }
    group.finish();
}

/// A chain of `size` objects linked through `next`, half of them noise
fn make_chain(size: usize) -> DataSlice {
    let alloc = allocate_objects(size * 2);
    let schema = allocate_explicit_schema();
    let mut db = DataBagImpl::with_capacity(size * 2);
    db.set_schema_attr(schema, "next", schema.into())
        .expect("schema attr");
    db.set_schema_attr(schema, "v", DType::Int64.into())
        .expect("schema attr");
    for i in 0..size * 2 {
        let obj = alloc.object_id(i as u32);
        db.set_attr(obj, "v", DataItem::Int64(i as i64));
        if i + 1 != size && i + 1 < size * 2 {
            db.set_attr(obj, "next", alloc.object_id(i as u32 + 1).into());
        }
    }
    DataSlice::from_item(alloc.object_id(0).into(), schema.into())
        .with_bag(Some(DataBag::from_impl(db)))
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_chain");
    for &size in &SIZES {
        let root = make_chain(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &root, |b, root| {
            b.iter(|| extract(black_box(root)))
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_group_by, bench_unique, bench_extract
}
criterion_main!(benches);
