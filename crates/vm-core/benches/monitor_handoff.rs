//! Monitor wait/notify round trips between two threads.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use vm_core::{Monitor, Mutex, NO_TIMEOUT};

struct PingPong {
    monitor: Monitor,
    turn: AtomicU64,
    stop: AtomicBool,
}

fn bench_uncontended_mutex(c: &mut Criterion) {
    let mutex = Mutex::new();
    c.bench_function("mutex_uncontended", |b| {
        b.iter(|| {
            let _ml = black_box(&mutex).locker();
        });
    });
}

fn bench_monitor_ping_pong(c: &mut Criterion) {
    let state = Arc::new(PingPong {
        monitor: Monitor::new(),
        turn: AtomicU64::new(0),
        stop: AtomicBool::new(false),
    });

    // Echoes every odd turn back as the next even turn.
    let echo = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            let ml = state.monitor.locker();
            loop {
                while state.turn.load(Ordering::Acquire) % 2 == 0
                    && !state.stop.load(Ordering::Acquire)
                {
                    ml.wait(NO_TIMEOUT);
                }
                if state.stop.load(Ordering::Acquire) {
                    break;
                }
                state.turn.fetch_add(1, Ordering::AcqRel);
                ml.notify();
            }
        })
    };

    c.bench_function("monitor_ping_pong", |b| {
        b.iter(|| {
            let ml = state.monitor.locker();
            let sent = state.turn.fetch_add(1, Ordering::AcqRel) + 1;
            ml.notify();
            while state.turn.load(Ordering::Acquire) == sent {
                ml.wait(NO_TIMEOUT);
            }
        });
    });

    {
        let ml = state.monitor.locker();
        state.stop.store(true, Ordering::Release);
        ml.notify_all();
    }
    echo.join().unwrap();
}

criterion_group!(benches, bench_uncontended_mutex, bench_monitor_ping_pong);
criterion_main!(benches);
