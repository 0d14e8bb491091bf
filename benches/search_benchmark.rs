use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::Rng;
use std::collections::HashMap;

use textindex::core::types::FieldTokens;
use textindex::index::searcher::{TokenSetSearcher, single_field_query};
use textindex::storage::const_array::{ConstArrayReader, ConstArrayWriter};

/// Index 100k documents where one in `selectivity` carries both tokens and
/// the rest only the common one.
fn build_searcher(selectivity: u32) -> (TokenSetSearcher<u32>, FieldTokens) {
    let mut rng = rand::thread_rng();
    let common = single_field_query("text", ["A"]);
    let rare = single_field_query("text", ["A", "B"]);

    let mut searcher = TokenSetSearcher::new();
    for i in 0..100_000u32 {
        if rng.gen_range(0..selectivity) == 0 {
            searcher.add_doc(&rare, i);
        } else {
            searcher.add_doc(&common, i);
        }
    }
    (searcher, rare)
}

/// Conjunctive search over posting lists of increasingly skewed lengths.
fn bench_conjunctive_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("conjunctive_search");

    for selectivity in [1u32, 2, 10, 100, 1000] {
        let (searcher, query) = build_searcher(selectivity);
        group.bench_with_input(
            BenchmarkId::from_parameter(selectivity),
            &selectivity,
            |b, _| {
                b.iter(|| {
                    let mut hits = 0usize;
                    searcher
                        .search(&query, |doc_id, _| {
                            hits += 1;
                            black_box(doc_id);
                            Ok(())
                        })
                        .unwrap();
                    hits
                });
            },
        );
    }
    group.finish();
}

/// The match-all walk over a half-tombstoned searcher.
fn bench_match_all(c: &mut Criterion) {
    let (mut searcher, _) = build_searcher(2);
    for id in (0..100_000i32).step_by(2) {
        searcher.delete(id.into()).unwrap();
    }
    let empty = HashMap::new();

    c.bench_function("match_all_with_tombstones", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            searcher
                .search(&empty, |doc_id, _| {
                    hits += 1;
                    black_box(doc_id);
                    Ok(())
                })
                .unwrap();
            hits
        });
    });
}

fn bench_const_array_append(c: &mut Criterion) {
    c.bench_function("const_array_append", |b| {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ConstArrayWriter::create(dir.path()).unwrap();
        let mut i = 0u64;
        b.iter(|| {
            writer.append_value(&i).unwrap();
            i += 1;
        });
        writer.close().unwrap();
    });
}

fn bench_const_array_read(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = ConstArrayWriter::create(dir.path()).unwrap();
    const RECORDS: usize = 10_000;
    for i in 0..RECORDS as u64 {
        writer.append_value(&i).unwrap();
    }
    writer.close().unwrap();
    let reader = ConstArrayReader::open(dir.path()).unwrap();

    c.bench_function("const_array_read", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let value: u64 = reader.get_value(i % RECORDS).unwrap();
            i += 1;
            black_box(value)
        });
    });
}

criterion_group!(
    benches,
    bench_conjunctive_search,
    bench_match_all,
    bench_const_array_append,
    bench_const_array_read
);
criterion_main!(benches);
