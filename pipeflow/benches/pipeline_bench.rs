//! Benchmarks for pipeline throughput and fan-in.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipeflow::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

fn context() -> StageContext {
    StageContext::new(Arc::new(CancellationToken::new())).expect("context")
}

async fn run_chain(items: u64, buffer_size: usize) -> u64 {
    let config = PipelineConfig::default()
        .with_buffer_size(buffer_size)
        .with_events(false);
    let token = Arc::new(CancellationToken::new());
    let ctx = StageContext::with_config(token, config).expect("context");

    let doubled = map(&ctx, generate(&ctx, 0..items).expect("generate"), |v| v * 2).expect("map");
    let plus_one = map(&ctx, doubled, |v| v + 1).expect("map");
    let sum = plus_one.collect_all().await.into_iter().sum();
    ctx.join().await;
    sum
}

fn pipeline_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("map_chain_10k");
    for buffer_size in [1, 16, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &buffer_size,
            |b, &size| b.iter(|| rt.block_on(run_chain(black_box(10_000), size))),
        );
    }
    group.finish();
}

fn or_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("or_combine");
    for count in [4_usize, 64] {
        group.bench_with_input(BenchmarkId::new("flat", count), &count, |b, &n| {
            b.iter(|| {
                rt.block_on(async {
                    let ctx = context();
                    let mut signals: Vec<Signal> = (1..n).map(|_| Signal::never()).collect();
                    signals.push(Signal::after(Duration::ZERO));
                    or_combine(&ctx, signals).expect("or").wait().await;
                    ctx.join().await;
                });
            });
        });
        group.bench_with_input(BenchmarkId::new("recursive", count), &count, |b, &n| {
            b.iter(|| {
                rt.block_on(async {
                    let ctx = context();
                    let mut signals: Vec<Signal> = (1..n).map(|_| Signal::never()).collect();
                    signals.push(Signal::after(Duration::ZERO));
                    or_combine_recursive(&ctx, signals).expect("or").wait().await;
                    ctx.join().await;
                });
            });
        });
    }
    group.finish();
}

criterion_group!(benches, pipeline_benchmark, or_benchmark);
criterion_main!(benches);
