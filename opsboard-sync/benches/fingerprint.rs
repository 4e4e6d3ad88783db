use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opsboard_sync::DeltaDetector;
use opsboard_types::{Dataset, Fingerprint, FingerprintFields};

fn dataset(rows: usize) -> Dataset {
    let mut builder = Dataset::builder().header(["id", "status", "updated_at", "subject", "notes"]);
    for i in 0..rows {
        let status = match i % 4 {
            0 => "open",
            1 => "pending",
            2 => "escalated",
            _ => "closed",
        };
        builder = builder.row([
            format!("T-{:06}", i),
            status.to_string(),
            format!("2024-05-{:02}T10:{:02}:00Z", i % 28 + 1, i % 60),
            format!("Subject line for ticket {}", i),
            "Free-form notes that do not take part in the fingerprint".to_string(),
        ]);
    }
    builder.build()
}

/// Benchmark fingerprinting datasets of increasing size
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    let fields = FingerprintFields::default();

    for rows in [100usize, 1_000, 10_000].iter() {
        let data = dataset(*rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| Fingerprint::of(black_box(data), &fields));
        });
    }
    group.finish();
}

/// Benchmark the unchanged-refetch path of the delta detector
fn bench_unchanged_refetch(c: &mut Criterion) {
    let data = dataset(1_000);
    let mut detector = DeltaDetector::default();
    detector.has_changed(&data);

    c.bench_function("delta_unchanged_1000", |b| {
        b.iter(|| detector.has_changed(black_box(&data)));
    });
}

/// Benchmark decoding a raw values matrix
fn bench_decode(c: &mut Criterion) {
    let values: Vec<Vec<String>> = std::iter::once(
        ["id", "status", "updated_at"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
    .chain((0..1_000).map(|i| vec![i.to_string(), "open".to_string()]))
    .collect();

    c.bench_function("decode_values_1000", |b| {
        b.iter(|| Dataset::from_values(black_box(values.clone())));
    });
}

criterion_group!(
    benches,
    bench_fingerprint,
    bench_unchanged_refetch,
    bench_decode
);
criterion_main!(benches);
