// C1: monotonic logical time source, adjustable rate, pause/jump.
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use hotel_ac_protocol::ClockSnapshot;

/// `now() = l0 + k * (wallNow - w0)`, frozen while paused.
///
/// Every other component reads time only through this type; nothing else
/// in the engine touches `Utc::now()` or `Instant::now()` directly, so a
/// whole scenario can be fast-forwarded deterministically via
/// [`Clock::jump_to`]/[`Clock::set_speed`] instead of sleeping in real
/// time.
#[derive(Debug, Clone)]
pub struct Clock {
    w0: Instant,
    l0: DateTime<Utc>,
    speed: f64,
    paused: bool,
}

impl Clock {
    pub fn new(speed: f64) -> Self {
        Self { w0: Instant::now(), l0: Utc::now(), speed, paused: false }
    }

    pub fn now(&self) -> DateTime<Utc> {
        if self.paused {
            return self.l0;
        }
        let elapsed = self.w0.elapsed().as_secs_f64() * self.speed;
        self.l0 + ChronoDuration::microseconds((elapsed * 1_000_000.0) as i64)
    }

    pub fn set_speed(&mut self, speed: f64) {
        let now = self.now();
        self.l0 = now;
        self.w0 = Instant::now();
        self.speed = speed;
    }

    /// Absolute jump: logical time becomes exactly `t`, continuous
    /// thereafter at the current speed.
    pub fn jump_to(&mut self, t: DateTime<Utc>) {
        self.l0 = t;
        self.w0 = Instant::now();
    }

    /// Relative jump, the shape the wire contract's `add_minutes` uses.
    pub fn jump_by(&mut self, delta: ChronoDuration) {
        let t = self.now() + delta;
        self.jump_to(t);
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.l0 = self.now();
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.w0 = Instant::now();
            self.paused = false;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot { logical_now: self.now(), speed: self.speed, paused: self.paused }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_clock_is_frozen() {
        let mut clock = Clock::new(1.0);
        clock.pause();
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.now();
        assert_eq!(a, b);
    }

    #[test]
    fn jump_by_advances_and_stays_continuous() {
        let mut clock = Clock::new(1.0);
        let before = clock.now();
        clock.jump_by(ChronoDuration::minutes(10));
        let after = clock.now();
        assert!(after - before >= ChronoDuration::minutes(10));
        assert!(after - before < ChronoDuration::minutes(10) + ChronoDuration::seconds(1));
    }

    #[test]
    fn resume_continues_from_paused_instant() {
        let mut clock = Clock::new(1.0);
        clock.pause();
        let paused_at = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(20));
        clock.resume();
        let just_after_resume = clock.now();
        assert!(just_after_resume >= paused_at);
        assert!(just_after_resume - paused_at < ChronoDuration::milliseconds(50));
    }

    #[test]
    fn speed_zero_freezes_progress_without_pausing_flag() {
        let mut clock = Clock::new(0.0);
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.now();
        assert_eq!(a, b);
        assert!(!clock.is_paused());
    }
}
