//! # Veld runtime 性能基准测试
//!
//! 使用 Criterion.rs 进行性能基准测试。
//!
//! ## 基准测试分组
//! - `heap`: 堆分配和引用计数
//! - `sched`: 协作式调度器
//!
//! ## 使用方法
//! ```bash
//! cargo bench        # 运行所有
//! cargo bench heap   # 只运行堆基准
//! cargo bench sched  # 只运行调度器基准
//! ```

use criterion::{criterion_group, criterion_main, Criterion};

use veld_runtime::sched::{Scheduler, Step};
use veld_runtime::Heap;

// ============================================================================
// Heap benchmarks
// ============================================================================

fn bench_alloc_free(c: &mut Criterion) {
    c.bench_function("heap/alloc_free", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            for _ in 0..1000 {
                let r = heap.alloc(64);
                heap.decref(r, None).unwrap();
            }
            heap.stats().frees
        })
    });
}

fn bench_incref_decref(c: &mut Criterion) {
    c.bench_function("heap/incref_decref", |b| {
        let mut heap = Heap::new();
        let r = heap.alloc(64);
        b.iter(|| {
            for _ in 0..1000 {
                heap.incref(r).unwrap();
                heap.decref(r, None).unwrap();
            }
            r
        })
    });
}

fn bench_alloc_arr(c: &mut Criterion) {
    c.bench_function("heap/alloc_arr", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            for _ in 0..100 {
                let r = heap.alloc_arr(64, 8).unwrap();
                heap.decref_arr(r, None).unwrap();
            }
            heap.stats().frees
        })
    });
}

// ============================================================================
// Scheduler benchmarks
// ============================================================================

fn bench_spawn_run(c: &mut Criterion) {
    c.bench_function("sched/spawn_run", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            let mut sched = Scheduler::new();
            for _ in 0..100 {
                sched.spawn(&mut heap, |_ctx| Step::Done);
            }
            sched.run(&mut heap).unwrap();
            sched.stats().completed
        })
    });
}

fn bench_round_robin(c: &mut Criterion) {
    c.bench_function("sched/round_robin", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            let mut sched = Scheduler::new();
            for _ in 0..10 {
                let mut slices = 0;
                sched.spawn(&mut heap, move |_ctx| {
                    slices += 1;
                    if slices < 100 {
                        Step::Yield
                    } else {
                        Step::Done
                    }
                });
            }
            sched.run(&mut heap).unwrap();
            sched.stats().switches
        })
    });
}

criterion_group!(heap, bench_alloc_free, bench_incref_decref, bench_alloc_arr);
criterion_group!(sched, bench_spawn_run, bench_round_robin);
criterion_main!(heap, sched);
