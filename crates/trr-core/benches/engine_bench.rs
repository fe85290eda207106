//! # Engine Benchmarks
//!
//! Performance benchmarks for readiness evaluation, approval progress, and
//! filtered listing.
//!
//! Run with: `cargo bench -p trr-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use trr_core::{
    ApprovalDecision, ApprovalRequest, DorEvaluator, FixedClock, InMemoryRepository, NewTrr,
    Priority, SdwRole, SdwStatus, Timestamp, Trr, TrrEngine, TrrFilter, TrrId,
};

fn sample_trr() -> Trr {
    Trr::draft(
        TrrId(1),
        NewTrr {
            title: "Benchmark".into(),
            description: "A description that satisfies the readiness gate".into(),
            assignee: Some("bench".into()),
            expected_outcome: Some("Numbers".into()),
            acceptance_criteria: (0..20).map(|i| format!("criterion {i}")).collect(),
            ..NewTrr::default()
        },
        "bench",
        Timestamp(0),
    )
}

/// Engine holding `size` records, every third one high priority.
fn populated_engine(size: u64) -> TrrEngine<InMemoryRepository, FixedClock> {
    let mut engine = TrrEngine::with_clock(InMemoryRepository::new(), FixedClock::at(0));
    for i in 0..size {
        let priority = if i % 3 == 0 {
            Priority::High
        } else {
            Priority::Low
        };
        let fields = NewTrr {
            priority,
            ..NewTrr::titled(format!("trr {i}"))
        };
        engine.create_trr(fields, "bench").expect("create");
    }
    engine
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_dor(c: &mut Criterion) {
    let trr = sample_trr();
    c.bench_function("dor_evaluate", |b| {
        b.iter(|| DorEvaluator::evaluate(black_box(&trr)));
    });
}

fn bench_sdw_progress(c: &mut Criterion) {
    let sdw = SdwStatus::new();
    c.bench_function("sdw_progress", |b| b.iter(|| black_box(&sdw).progress()));
}

fn bench_approval(c: &mut Criterion) {
    c.bench_function("set_approval", |b| {
        b.iter_batched(
            || populated_engine(1),
            |mut engine| {
                engine
                    .set_approval(
                        TrrId(1),
                        ApprovalRequest {
                            role: SdwRole::ProductOwner,
                            decision: ApprovalDecision::Approve,
                            approver_id: "bench".into(),
                            note: None,
                            expected_version: 1,
                        },
                    )
                    .expect("approve")
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_filtered");
    let filter = TrrFilter {
        priorities: vec![Priority::High],
        ..TrrFilter::default()
    };
    for size in [100u64, 1_000] {
        let engine = populated_engine(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &engine, |b, engine| {
            b.iter(|| engine.list_trrs(black_box(&filter)).expect("list"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dor, bench_sdw_progress, bench_approval, bench_list);
criterion_main!(benches);
