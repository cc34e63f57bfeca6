use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;

use fuserank::sample;
use fuserank::{Config, FusionPipeline, ListMerger};

fn bench_fusion(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let pipeline = FusionPipeline::with_mock_transport(&Config::default()).unwrap();

    let mut inputs = HashMap::new();
    inputs.insert("bge".to_string(), sample::retrieval_results("bge", 24));
    inputs.insert("snowflake".to_string(), sample::retrieval_results("sf", 24));

    c.bench_function("fuse_48_candidates", |b| {
        b.iter(|| {
            runtime
                .block_on(pipeline.fuse(black_box("mocked local query"), black_box(&inputs)))
                .unwrap()
        })
    });
}

fn bench_merge(c: &mut Criterion) {
    let merger = ListMerger::default();
    let first = sample::ranked_list("A", 90, 0.99);
    let second = sample::ranked_list("B", 90, 0.98);

    c.bench_function("merge_90_x_90", |b| {
        b.iter(|| merger.merge(black_box(&first), black_box(&second)))
    });
}

criterion_group!(benches, bench_fusion, bench_merge);
criterion_main!(benches);
