// C5: the two queues (serving, waiting) and the pure queue-manipulation
// logic around them. Cross-component orchestration (driving C3/C4 during
// Demote/Promote) lives on `Engine` in engine.rs; this module only knows
// about queue membership, ordering, and timing.
use chrono::{DateTime, Utc};

use hotel_ac_protocol::{FanSpeed, Mode};

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub room_id: u32,
    pub fan_speed: FanSpeed,
    pub mode: Mode,
    pub target_temp: f64,
    pub serving_time: Option<DateTime<Utc>>,
    pub waiting_time: Option<DateTime<Utc>>,
}

impl QueueEntry {
    fn priority(&self) -> u8 {
        self.fan_speed.priority()
    }
}

/// Two small `Vec`s, never a hash map — the specification's design notes
/// call this out explicitly: at the scale this engine runs at (serving
/// is bounded by `C`, waiting by total room count) a linear scan is both
/// simpler and cheaper than a hash index, and it makes the deterministic
/// tie-break order (by `roomId`) trivial to implement by construction.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    pub serving: Vec<QueueEntry>,
    pub waiting: Vec<QueueEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_serving(&self, room_id: u32) -> bool {
        self.serving.iter().any(|e| e.room_id == room_id)
    }

    pub fn is_waiting(&self, room_id: u32) -> bool {
        self.waiting.iter().any(|e| e.room_id == room_id)
    }

    /// (S2): a room has at most one entry across both queues.
    pub fn remove_room(&mut self, room_id: u32) {
        self.serving.retain(|e| e.room_id != room_id);
        self.waiting.retain(|e| e.room_id != room_id);
    }

    pub fn insert_serving(&mut self, entry: QueueEntry) {
        self.remove_room(entry.room_id);
        self.serving.push(entry);
    }

    pub fn insert_waiting(&mut self, entry: QueueEntry) {
        self.remove_room(entry.room_id);
        self.waiting.push(entry);
    }

    /// The serving entry the capacity-enforcement / rotation steps would
    /// pick to demote: smallest `(π asc, servingDuration desc, roomId
    /// asc)` — i.e. lowest priority first, and among equal priority the
    /// one that has served longest, and among ties the smaller room id.
    pub fn demote_candidate(&self, now: DateTime<Utc>) -> Option<usize> {
        self.serving.iter().enumerate().min_by(|(_, a), (_, b)| {
            let pa = a.priority();
            let pb = b.priority();
            pa.cmp(&pb)
                .then_with(|| {
                    let da = serving_duration(a, now);
                    let db = serving_duration(b, now);
                    db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.room_id.cmp(&b.room_id))
        }).map(|(idx, _)| idx)
    }

    /// The waiting entry that would be promoted next: largest
    /// `(π desc, waitingDuration desc, roomId asc)`.
    pub fn promote_candidate(&self, now: DateTime<Utc>) -> Option<usize> {
        self.waiting.iter().enumerate().max_by(|(_, a), (_, b)| {
            let pa = a.priority();
            let pb = b.priority();
            pa.cmp(&pb)
                .then_with(|| {
                    let da = waiting_duration(a, now);
                    let db = waiting_duration(b, now);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| b.room_id.cmp(&a.room_id))
        }).map(|(idx, _)| idx)
    }

    /// Serving entries whose time slice has elapsed, in decreasing order
    /// of how long they have served (so the longest-serving room
    /// rotates out first when several are due at once).
    pub fn rotation_candidates(&self, now: DateTime<Utc>, time_slice_seconds: f64) -> Vec<usize> {
        let mut due: Vec<(usize, f64)> = self
            .serving
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| {
                let dur = serving_duration(e, now);
                (dur >= time_slice_seconds).then_some((idx, dur))
            })
            .collect();
        due.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        due.into_iter().map(|(idx, _)| idx).collect()
    }

    /// `argmin(π, -servingDuration)` over serving: the current slot with
    /// the weakest claim on its slot, used by priority preemption.
    pub fn weakest_serving(&self, now: DateTime<Utc>) -> Option<usize> {
        self.demote_candidate(now)
    }

    /// `argmax(π, waitingDuration)` over waiting, used by priority
    /// preemption.
    pub fn strongest_waiting(&self, now: DateTime<Utc>) -> Option<usize> {
        self.promote_candidate(now)
    }

    pub fn priority_of(entry: &QueueEntry) -> u8 {
        entry.priority()
    }
}

pub fn serving_duration(entry: &QueueEntry, now: DateTime<Utc>) -> f64 {
    entry
        .serving_time
        .map(|t| (now - t).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}

pub fn waiting_duration(entry: &QueueEntry, now: DateTime<Utc>) -> f64 {
    entry
        .waiting_time
        .map(|t| (now - t).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

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

    #[test]
    fn demote_candidate_picks_lowest_priority_then_longest_serving() {
        let mut sched = Scheduler::new();
        sched.serving.push(entry(1, FanSpeed::Medium, 10));
        sched.serving.push(entry(2, FanSpeed::Low, 5));
        sched.serving.push(entry(3, FanSpeed::Low, 50));
        let now = Utc::now();
        let idx = sched.demote_candidate(now).unwrap();
        assert_eq!(sched.serving[idx].room_id, 3);
    }

    #[test]
    fn tie_break_falls_back_to_room_id_ascending() {
        let mut sched = Scheduler::new();
        let now = Utc::now();
        sched.serving.push(QueueEntry {
            room_id: 5,
            fan_speed: FanSpeed::Low,
            mode: Mode::Cooling,
            target_temp: 22.0,
            serving_time: Some(now),
            waiting_time: None,
        });
        sched.serving.push(QueueEntry {
            room_id: 2,
            fan_speed: FanSpeed::Low,
            mode: Mode::Cooling,
            target_temp: 22.0,
            serving_time: Some(now),
            waiting_time: None,
        });
        let idx = sched.demote_candidate(now).unwrap();
        assert_eq!(sched.serving[idx].room_id, 2);
    }

    #[test]
    fn rotation_candidates_only_include_entries_past_the_time_slice() {
        let mut sched = Scheduler::new();
        sched.serving.push(entry(1, FanSpeed::Medium, 200));
        sched.serving.push(entry(2, FanSpeed::Medium, 30));
        let due = sched.rotation_candidates(Utc::now(), 120.0);
        assert_eq!(due, vec![0]);
    }

    #[test]
    fn insert_serving_removes_any_stale_entry_first() {
        let mut sched = Scheduler::new();
        sched.waiting.push(entry(1, FanSpeed::Low, 0));
        sched.insert_serving(entry(1, FanSpeed::High, 0));
        assert!(sched.is_serving(1));
        assert!(!sched.is_waiting(1));
        assert_eq!(sched.serving.len() + sched.waiting.len(), 1);
    }
}
