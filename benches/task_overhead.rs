use criterion::{criterion_group, criterion_main, Criterion};
use strand_rs::prelude::*;
use std::time::Duration;

fn bench_spawn_settle(c: &mut Criterion) {
    enable_runtime().unwrap();

    c.bench_function("spawn_immediate", |b| {
        b.iter(|| sync_wait(spawn(async { 1 })))
    });

    c.bench_function("promise_prefired", |b| {
        b.iter(|| {
            let promise = AsyncPromise::new();
            let consumer = promise.clone();
            promise.set_value(1);
            sync_wait(spawn(async move { consumer.await.unwrap_or(0) }))
        })
    });
}

fn bench_timer_latency(c: &mut Criterion) {
    enable_runtime().unwrap();

    let mut group = c.benchmark_group("timer");
    group.sample_size(20);
    group.bench_function("sleep_1ms", |b| {
        b.iter(|| {
            sync_wait(spawn(async {
                sleep_for(Duration::from_millis(1)).await;
                1
            }))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_spawn_settle, bench_timer_latency);
criterion_main!(benches);
