use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::thread;
use std::time::Duration;

use agent_sync::bounded;

// Benchmark 1: Uncontended send + recv pair on one thread
fn bench_send_recv_pair(c: &mut Criterion) {
    c.bench_function("agent_sync_send_recv_pair", |b| {
        let (sender, receiver) = bounded(1024);

        b.iter(|| {
            sender.send(black_box(1u64)).unwrap();
            black_box(receiver.try_recv());
        });
    });

    c.bench_function("std_sync_channel_send_recv_pair", |b| {
        let (sender, receiver) = std::sync::mpsc::sync_channel(1024);

        b.iter(|| {
            sender.send(black_box(1u64)).unwrap();
            black_box(receiver.try_recv().ok());
        });
    });
}

// Benchmark 2: Producer threads against one draining consumer
fn bench_multi_producer(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_producer");
    const PER_SENDER: usize = 1000;

    for num_senders in [1, 2, 4].iter() {
        group.bench_with_input(
            BenchmarkId::new("agent_sync", num_senders),
            num_senders,
            |b, &num_senders| {
                b.iter(|| {
                    let (sender, receiver) = bounded(256);

                    let handles: Vec<_> = (0..num_senders)
                        .map(|_| {
                            let sender = sender.clone();
                            thread::spawn(move || {
                                for i in 0..PER_SENDER {
                                    let mut item = i as u64;
                                    loop {
                                        match sender.send(item) {
                                            Ok(()) => break,
                                            Err(err) => {
                                                item = err.into_inner();
                                                thread::yield_now();
                                            }
                                        }
                                    }
                                }
                            })
                        })
                        .collect();
                    drop(sender);

                    let mut received = 0usize;
                    while receiver.recv_timeout(Duration::from_secs(10)).is_some() {
                        received += 1;
                    }
                    assert_eq!(received, num_senders * PER_SENDER);

                    for handle in handles {
                        let _ = handle.join();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_send_recv_pair, bench_multi_producer);
criterion_main!(benches);
