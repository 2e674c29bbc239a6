//! Performance benchmarks for shard mapping and offset reconciliation.
//!
//! Measures the operations run on every shard bootstrap.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use shard_recovery_core::offsets::{load_offsets_from_tree, merge_offsets, parse_offset};
use shard_recovery_core::{
    journals_for_shard, num_shards, shards_for_journal, JournalName, JournalOffsetMap, Node,
    ShardId, TopicDescription,
};

/// Topics whose partition counts are powers of two up to `max`.
fn create_topics(max: u32) -> Vec<TopicDescription> {
    let mut topics = Vec::new();
    let mut partitions = 1;
    while partitions <= max {
        topics.push(TopicDescription::new(format!("topic-{partitions}"), partitions));
        partitions *= 2;
    }
    topics
}

/// Offsets for `count` journals, every other one offset by `skew`.
fn create_offsets(count: u32, skew: i64) -> JournalOffsetMap {
    (0..count)
        .map(|p| {
            let offset = i64::from(p) * 1000 + if p % 2 == 0 { skew } else { 0 };
            (JournalName::for_partition("events", p), offset)
        })
        .collect()
}

/// Benchmark shard count derivation.
fn bench_num_shards(c: &mut Criterion) {
    let mut group = c.benchmark_group("num_shards");

    for max in [16, 256, 4096] {
        let topics = create_topics(max);

        group.bench_with_input(BenchmarkId::new("topics", max), &topics, |b, t| {
            b.iter(|| black_box(num_shards(t).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark resolving every shard's journals.
fn bench_journals_for_shard(c: &mut Criterion) {
    let mut group = c.benchmark_group("journals_for_shard");

    for max in [16, 256] {
        let topics = create_topics(max);

        group.throughput(Throughput::Elements(u64::from(max)));
        group.bench_with_input(BenchmarkId::new("all_shards", max), &topics, |b, t| {
            b.iter(|| {
                for shard in 0..max {
                    black_box(journals_for_shard(t, ShardId(shard)));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark the reverse ownership lookup.
fn bench_shards_for_journal(c: &mut Criterion) {
    let mut group = c.benchmark_group("shards_for_journal");

    let topics = create_topics(1024);
    let journal = JournalName::for_partition("topic-4", 3);

    group.bench_function("lookup", |b| {
        b.iter(|| black_box(shards_for_journal(&topics, &journal)));
    });

    group.finish();
}

/// Benchmark merging local-store and mirrored offsets.
fn bench_merge_offsets(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_offsets");

    for count in [100u32, 10_000] {
        let db = create_offsets(count, 7);
        let mirrored = create_offsets(count, 0);

        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(
            BenchmarkId::new("journals", count),
            &(db, mirrored),
            |b, (db, mirrored)| {
                b.iter(|| black_box(merge_offsets(db, mirrored)));
            },
        );
    }

    group.finish();
}

/// Benchmark loading mirrored offsets out of a tree snapshot.
fn bench_load_offsets_from_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_offsets_from_tree");

    for count in [100u32, 10_000] {
        let leaves = (0..count)
            .map(|p| {
                Node::leaf(
                    format!("/root/offsets/events/part-{p:03}"),
                    format!("{:x}", p * 1000),
                )
            })
            .collect();
        let tree = Node::dir(
            "/root",
            vec![Node::dir(
                "/root/offsets",
                vec![Node::dir("/root/offsets/events", leaves)],
            )],
        );

        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(BenchmarkId::new("leaves", count), &tree, |b, t| {
            b.iter(|| black_box(load_offsets_from_tree(t).unwrap()));
        });
    }

    group.bench_function("parse_offset", |b| {
        b.iter(|| black_box(parse_offset(black_box("2a0000ff")).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_num_shards,
    bench_journals_for_shard,
    bench_shards_for_journal,
    bench_merge_offsets,
    bench_load_offsets_from_tree,
);
criterion_main!(benches);
