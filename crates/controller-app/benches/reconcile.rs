//! Reconciliation Benchmarks
//!
//! Measures folding a server snapshot into a held collection at the sizes a
//! controller sees: a handful of pushed records against a large held set, and
//! a full refresh after reconnect.

use controller_app::views::{Contact, ContactsState};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::Map;

fn contact(id: u64, minute: u64) -> Contact {
    Contact {
        contact_id: id,
        label: Some(format!("contact-{id}")),
        created_at: Some(format!("2021-01-01T{:02}:{:02}:00Z", (minute / 60) % 24, minute % 60)),
        extra: Map::new(),
    }
}

fn held(size: u64) -> ContactsState {
    ContactsState::from_records((0..size).map(|id| contact(id, id)))
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_push");
    for size in [100u64, 1_000, 10_000] {
        let state = held(size);
        let pushed = vec![contact(size / 2, size * 2), contact(size + 1, size * 2 + 1)];
        group.bench_with_input(BenchmarkId::from_parameter(size), &state, |b, state| {
            b.iter(|| black_box(state.reconciled(black_box(&pushed))));
        });
    }
    group.finish();
}

fn bench_full_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_full_refresh");
    for size in [100u64, 1_000, 10_000] {
        let state = held(size);
        let snapshot: Vec<Contact> = (0..size).map(|id| contact(id, id + size)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &state, |b, state| {
            b.iter(|| black_box(state.reconciled(black_box(&snapshot))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_push, bench_full_refresh);
criterion_main!(benches);
