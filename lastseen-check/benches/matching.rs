// Pattern Matching Benchmarks
//
// Wildcard resolution scans every recorded name, so matching cost scales
// with the size of the last-seen table.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lastseen_check::TopicPattern;
use std::hint::black_box;

fn topic_names(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("site/{}/sensor/{}", i % 16, i))
        .collect()
}

fn bench_wildcard_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("wildcard_scan");
    let patterns = [
        TopicPattern::parse("site/3/sensor/+").unwrap(),
        TopicPattern::parse("site/+/sensor/42").unwrap(),
        TopicPattern::parse("site/#").unwrap(),
    ];

    for name_count in [100, 10_000].iter() {
        let names = topic_names(*name_count);

        for pattern in &patterns {
            group.bench_with_input(
                BenchmarkId::new(pattern.as_str(), name_count),
                name_count,
                |b, _| {
                    b.iter(|| {
                        names
                            .iter()
                            .filter(|name| pattern.matches(black_box(name)))
                            .count()
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_pattern", |b| {
        b.iter(|| TopicPattern::parse(black_box("home/+/floor/+/temp/#")))
    });
}

criterion_group!(benches, bench_wildcard_scan, bench_compile);
criterion_main!(benches);
