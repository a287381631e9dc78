// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use ticket_spin::TicketSpinLock;

const CONTENDED_ITERATIONS: u64 = 2_000;

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");

    for tracking in [true, false] {
        let lock = TicketSpinLock::new(tracking);

        group.bench_with_input(
            BenchmarkId::new("enter_exit", tracking),
            &tracking,
            |b, _| {
                b.iter(|| {
                    let mut taken = false;
                    lock.enter(black_box(&mut taken)).unwrap();
                    lock.exit().unwrap();
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("try_enter_exit", tracking),
            &tracking,
            |b, _| {
                b.iter(|| {
                    let mut taken = false;
                    lock.try_enter(black_box(&mut taken)).unwrap();
                    lock.exit_with_barrier(true).unwrap();
                })
            },
        );
    }

    // Guard path, including owner bookkeeping on drop
    let lock = TicketSpinLock::default();
    group.bench_function("guard", |b| {
        b.iter(|| {
            let guard = lock.lock().unwrap();
            black_box(&guard);
        })
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    group.sample_size(20);

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * CONTENDED_ITERATIONS));
        group.bench_with_input(BenchmarkId::new("enter_exit", threads), &threads, |b, &threads| {
            b.iter(|| {
                let lock = TicketSpinLock::new(true);
                let counter = AtomicU64::new(0);
                thread::scope(|scope| {
                    for _ in 0..threads {
                        scope.spawn(|| {
                            for _ in 0..CONTENDED_ITERATIONS {
                                let mut taken = false;
                                lock.enter(&mut taken).unwrap();
                                counter.fetch_add(1, Ordering::Relaxed);
                                lock.exit().unwrap();
                            }
                        });
                    }
                });
                black_box(counter.load(Ordering::Relaxed))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended);
criterion_main!(benches);
