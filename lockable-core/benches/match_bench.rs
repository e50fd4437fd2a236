use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use lockable_core::catalog::Catalog;
use lockable_core::matcher::RequirementMatcher;
use lockable_core::types::Requirements;

fn catalog(size: usize) -> Catalog {
    let entries: Vec<_> = (0..size)
        .map(|i| {
            json!({
                "id": format!("dut-{}", i),
                "hostname": format!("ci-{:02}", i % 8),
                "online": i % 5 != 0,
                "zone": if i % 2 == 0 { "eu" } else { "us" },
            })
        })
        .collect();
    Catalog::from_value(json!(entries)).unwrap()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("requirement_filter");
    let requirements = Requirements::parse("zone=eu")
        .unwrap()
        .with_host_defaults("ci-03");

    for size in [10, 100, 1000] {
        let catalog = catalog(size);
        group.bench_with_input(BenchmarkId::new("resources", size), &catalog, |b, catalog| {
            b.iter(|| RequirementMatcher::filter(black_box(catalog.resources()), black_box(&requirements)))
        });
    }

    group.finish();
}

fn bench_parse_requirements(c: &mut Criterion) {
    c.bench_function("parse_flat_requirements", |b| {
        b.iter(|| Requirements::parse(black_box("online=true&zone=eu&board=nrf52&slots=2")).unwrap())
    });
}

criterion_group!(benches, bench_filter, bench_parse_requirements);
criterion_main!(benches);
