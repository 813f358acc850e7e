use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};

use hotel_ac_engine::scheduler::{QueueEntry, Scheduler};
use hotel_ac_protocol::{FanSpeed, Mode};

fn entry(room_id: u32, fan: FanSpeed, serving_secs_ago: i64) -> QueueEntry {
    QueueEntry {
        room_id,
        fan_speed: fan,
        mode: Mode::Cooling,
        target_temp: 22.0,
        serving_time: Some(Utc::now() - Duration::seconds(serving_secs_ago)),
        waiting_time: None,
    }
}

fn fan_for(i: usize) -> FanSpeed {
    match i % 3 {
        0 => FanSpeed::Low,
        1 => FanSpeed::Medium,
        _ => FanSpeed::High,
    }
}

// Priority tie-break selection runs on every schedule pass (after each
// command and once per tick), so its cost scales with however many rooms
// a single plant serves at once.
fn bench_demote_candidate(c: &mut Criterion) {
    c.bench_function("demote_candidate_10_rooms", |b| {
        let mut sched = Scheduler::new();
        for i in 0..10u32 {
            sched.serving.push(entry(i, fan_for(i as usize), (i * 7) as i64));
        }
        let now = Utc::now();
        b.iter(|| std::hint::black_box(sched.demote_candidate(now)));
    });

    c.bench_function("demote_candidate_100_rooms", |b| {
        let mut sched = Scheduler::new();
        for i in 0..100u32 {
            sched.serving.push(entry(i, fan_for(i as usize), (i * 3) as i64));
        }
        let now = Utc::now();
        b.iter(|| std::hint::black_box(sched.demote_candidate(now)));
    });
}

fn bench_rotation_candidates(c: &mut Criterion) {
    c.bench_function("rotation_candidates_100_rooms", |b| {
        let mut sched = Scheduler::new();
        for i in 0..100u32 {
            sched.serving.push(entry(i, fan_for(i as usize), (i * 3) as i64));
        }
        let now = Utc::now();
        b.iter(|| std::hint::black_box(sched.rotation_candidates(now, 120.0)));
    });
}

criterion_group!(benches, bench_demote_candidate, bench_rotation_candidates);
criterion_main!(benches);
