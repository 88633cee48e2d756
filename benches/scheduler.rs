use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tokio::sync::watch;
use zonepace::models::SchedulerConfig;
use zonepace::scheduler::UnpacedFrames;
use zonepace::{BoundaryController, ChunkedScheduler, StateManager};

const TOTAL: u64 = 3000;

fn scheduler(total: u64, every: u64) -> ChunkedScheduler {
    ChunkedScheduler::new(
        SchedulerConfig::new(total, every),
        BoundaryController::new(),
        Arc::new(StateManager::new()),
    )
    .expect("valid config")
}

fn bench_checkpoint_cadence(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_to_completion");
    group.throughput(Throughput::Elements(TOTAL));

    for every in [1u64, 50, 500, TOTAL] {
        group.bench_with_input(BenchmarkId::new("every", every), &every, |b, &every| {
            b.iter(|| {
                let mut scheduler = scheduler(TOTAL, every);
                black_box(scheduler.run_to_completion().expect("run"));
            });
        });
    }

    group.finish();
}

fn bench_unpaced_drive(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    let mut group = c.benchmark_group("drive");
    group.throughput(Throughput::Elements(TOTAL));

    group.bench_function("unpaced", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut scheduler = scheduler(TOTAL, 500);
                let (_cancel_tx, cancel_rx) = watch::channel(false);
                let mut frames = UnpacedFrames::new();
                black_box(scheduler.run(&mut frames, cancel_rx).await.expect("run"));
            });
        });
    });

    group.finish();
}

fn bench_boundary_crossing(c: &mut Criterion) {
    let boundary = BoundaryController::new();
    boundary.subscribe_fn(|event| {
        black_box(event.cycle);
    });

    c.bench_function("boundary/run_inside_with_hook", |b| {
        b.iter(|| boundary.run_inside(|| black_box(boundary.is_inside_boundary())));
    });
}

criterion_group!(
    scheduler_benches,
    bench_checkpoint_cadence,
    bench_unpaced_drive,
    bench_boundary_crossing
);
criterion_main!(scheduler_benches);
