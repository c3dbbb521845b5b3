use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use patchbay::{MultiPlug, Plug, Provider, Store, Subject};

fn subject_emit_benchmark(c: &mut Criterion) {
    let subject: Subject<i32> = Subject::new();
    let _subs: Vec<_> = (0..8).map(|_| subject.subscribe(|v| {
        black_box(*v);
    })).collect();

    c.bench_function("subject_emit_fanout_8", |b| {
        let mut i = 0;
        b.iter(|| {
            subject.next(black_box(i));
            i += 1;
        });
    });
}

fn subscribe_unsubscribe_benchmark(c: &mut Criterion) {
    let subject: Subject<i32> = Subject::new();

    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            let sub = subject.subscribe(|v| {
                black_box(*v);
            });
            sub.unsubscribe();
        });
    });
}

fn plug_activation_benchmark(c: &mut Criterion) {
    let subject: Subject<i32> = Subject::behavior(1);
    let store = Store::builder().stream("nums", subject).build();
    let provider = Provider::new(store).unwrap();
    let scope = provider.scope();
    let plug = Plug::new(|s| s.stream::<i32>("nums"));

    c.bench_function("plug_activate_deactivate", |b| {
        b.iter(|| {
            let active = plug.activate(&scope).unwrap();
            black_box(active.value());
        });
    });
}

fn plug_delivery_benchmark(c: &mut Criterion) {
    let subject: Subject<i32> = Subject::new();
    let store = Store::builder().stream("nums", subject.clone()).build();
    let provider = Provider::new(store).unwrap();
    let plug = Plug::new(|s| s.stream::<i32>("nums"));
    let active = plug.activate(&provider.scope()).unwrap();

    c.bench_function("plug_value_delivery", |b| {
        let mut i = 0;
        b.iter(|| {
            subject.next(black_box(i));
            black_box(active.value());
            i += 1;
        });
    });
}

fn multi_plug_combined_update_benchmark(c: &mut Criterion) {
    let left: Subject<i32> = Subject::behavior(0);
    let right: Subject<i32> = Subject::behavior(0);
    let store = Store::builder()
        .stream("left", left.clone())
        .stream("right", right)
        .build();
    let provider = Provider::new(store).unwrap();

    let plug = MultiPlug::new()
        .plug("left", |s: &Store| s.stream::<i32>("left"))
        .plug("right", |s: &Store| s.stream::<i32>("right"));
    let active = plug.activate(&provider.scope()).unwrap();

    c.bench_function("multi_plug_combined_update", |b| {
        let mut i = 0;
        b.iter(|| {
            left.next(black_box(i));
            black_box(active.values());
            i += 1;
        });
    });
}

fn first_value_cache_hit_benchmark(c: &mut Criterion) {
    let subject: Subject<i32> = Subject::behavior(42);
    let store = Store::builder().stream("nums", subject).build();
    let provider = Provider::new(store).unwrap();
    let scope = provider.scope();
    let plug = Arc::new(Plug::new(|s: &Store| s.stream::<i32>("nums")));

    // Prime the cache.
    let _ = plug.first_value(&scope).unwrap();

    c.bench_function("first_value_cache_hit", |b| {
        b.iter(|| {
            let first = plug.first_value(&scope).unwrap();
            black_box(first.try_get());
        });
    });
}

criterion_group!(
    benches,
    subject_emit_benchmark,
    subscribe_unsubscribe_benchmark,
    plug_activation_benchmark,
    plug_delivery_benchmark,
    multi_plug_combined_update_benchmark,
    first_value_cache_hit_benchmark
);
criterion_main!(benches);
