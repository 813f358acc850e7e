// Orchestration: wires C1-C6 behind a single exclusive lock and exposes
// the C7 command surface. No command or tick ever suspends while holding
// that lock (§5): every call below is synchronous end to end.
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use hotel_ac_protocol::{
    ClockSnapshot, DetailRecord, DetailRecordKind, FanSpeed, Mode, QueueState, RoomSnapshot,
    ScheduleEntry, ScheduleStatusSnapshot,
};

use crate::billing::{new_record_id, BillingLog};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::room::{Room, RoomStore};
use crate::scheduler::{serving_duration, waiting_duration, QueueEntry, Scheduler};
use crate::thermal::{self, Signal, ThermalInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOnOutcome {
    Started,
    /// Idempotent re-call while already on: no duplicate room fee, no
    /// queue churn.
    NoOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied,
    /// The requested value matched the current one; no billing segment
    /// was closed and nothing was re-anchored.
    NoOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeTempOutcome {
    Applied,
    OutOfRange { message: String },
}

pub struct EngineState {
    clock: Clock,
    rooms: RoomStore,
    billing: BillingLog,
    scheduler: Scheduler,
    config: Arc<EngineConfig>,
}

impl EngineState {
    fn new(config: Arc<EngineConfig>) -> Self {
        EngineState {
            clock: Clock::new(config.time_acceleration_factor),
            rooms: RoomStore::new(&config),
            billing: BillingLog::new(),
            scheduler: Scheduler::new(),
            config,
        }
    }

    // ---- entry / demote / promote (§4.5) ----

    /// "Entry procedure": used by PowerOn, and re-run after ChangeTemp
    /// clears a pause, after ChangeSpeed/ChangeMode, and after a WAKE
    /// signal.
    fn entry_procedure(&mut self, room_id: u32) {
        let now = self.clock.now();
        let room = match self.rooms.get(room_id) {
            Some(r) => r.clone(),
            None => return,
        };
        self.scheduler.remove_room(room_id);

        if self.scheduler.serving.len() < self.config.capacity {
            self.scheduler.insert_serving(QueueEntry {
                room_id,
                fan_speed: room.fan_speed,
                mode: room.mode,
                target_temp: room.target_temp,
                serving_time: Some(now),
                waiting_time: None,
            });
            self.rooms.update(room_id, |r| {
                r.serving_start = Some(now);
                r.waiting_start = None;
                r.billing_start_temp = Some(r.current_temp);
            });
        } else {
            self.scheduler.insert_waiting(QueueEntry {
                room_id,
                fan_speed: room.fan_speed,
                mode: room.mode,
                target_temp: room.target_temp,
                serving_time: None,
                waiting_time: Some(now),
            });
            self.rooms.update(room_id, |r| {
                r.serving_start = None;
                r.waiting_start = Some(now);
            });
        }
        self.schedule_pass();
    }

    /// Demote(entry, reason): settle, requeue to waiting, clear the
    /// billing anchor.
    fn demote(&mut self, serving_idx: usize) {
        let entry = self.scheduler.serving.remove(serving_idx);
        let now = self.clock.now();
        self.force_advance(entry.room_id, true, now);
        self.settle_segment(entry.room_id, now, false);
        self.rooms.update(entry.room_id, |r| {
            r.serving_start = None;
            r.billing_start_temp = None;
            r.waiting_start = Some(now);
        });
        self.scheduler.waiting.push(QueueEntry {
            waiting_time: Some(now),
            serving_time: None,
            ..entry
        });
    }

    /// Promote(entry): drive temperature up to now, then reanchor
    /// billing at the post-drift reading.
    fn promote(&mut self, waiting_idx: usize) {
        let entry = self.scheduler.waiting.remove(waiting_idx);
        let now = self.clock.now();
        self.force_advance(entry.room_id, false, now);
        self.rooms.update(entry.room_id, |r| {
            r.serving_start = Some(now);
            r.waiting_start = None;
            r.billing_start_temp = Some(r.current_temp);
        });
        self.scheduler.serving.push(QueueEntry {
            serving_time: Some(now),
            waiting_time: None,
            ..entry
        });
    }

    /// `force = true` thermal call used to settle a room's temperature
    /// up to `now` before Demote/Promote reanchor billing. Never
    /// produces a signal (§9's re-entrance guard) and always advances
    /// `lastTempUpdate`.
    fn force_advance(&mut self, room_id: u32, is_serving: bool, now: DateTime<Utc>) {
        let Some(room) = self.rooms.get(room_id) else { return };
        let fan_rate = self.config.fan_rate(room.fan_speed);
        let result = thermal::step(&self.config, thermal_input(room), is_serving, now, true, fan_rate);
        debug_assert!(result.signal.is_none(), "forced thermal step must never signal");
        self.rooms.update(room_id, |r| {
            r.current_temp = result.new_temp;
            r.last_temp_update = Some(now);
        });
    }

    fn settle_segment(&mut self, room_id: u32, now: DateTime<Utc>, is_power_off: bool) {
        let Some(room) = self.rooms.get(room_id) else { return };
        let Some(start) = room.serving_start else {
            if is_power_off {
                self.billing.append(zero_cost_power_off_marker(room, now, now));
            }
            return;
        };
        let anchor = room.billing_start_temp.unwrap_or(room.current_temp);
        let effective = match room.mode {
            Mode::Cooling => (anchor - room.current_temp).max(0.0),
            Mode::Heating => (room.current_temp - anchor).max(0.0),
        };
        if effective > 0.0 {
            let cost = effective * self.config.billing_unit_price;
            self.billing.append(DetailRecord {
                id: new_record_id(),
                room_id,
                kind: DetailRecordKind::Ac,
                start_time: start,
                end_time: now,
                fan_speed: room.fan_speed,
                mode: room.mode,
                rate: self.config.billing_unit_price,
                cost,
                customer_id: None,
            });
        } else if is_power_off {
            self.billing.append(zero_cost_power_off_marker(room, start, now));
        }
    }

    /// The 4-step schedule pass (§4.5), run after every state-changing
    /// command and once per tick.
    fn schedule_pass(&mut self) {
        let now = self.clock.now();

        // 1. Enforce capacity.
        while self.scheduler.serving.len() > self.config.capacity {
            match self.scheduler.demote_candidate(now) {
                Some(idx) => self.demote(idx),
                None => break,
            }
        }

        // 2. Priority preemption.
        loop {
            if self.scheduler.serving.len() < self.config.capacity {
                break;
            }
            let (Some(w_idx), Some(s_idx)) =
                (self.scheduler.strongest_waiting(now), self.scheduler.weakest_serving(now))
            else {
                break;
            };
            let w_prio = Scheduler::priority_of(&self.scheduler.waiting[w_idx]);
            let s_prio = Scheduler::priority_of(&self.scheduler.serving[s_idx]);
            if w_prio > s_prio {
                self.demote(s_idx);
                // index into waiting may have shifted only if s_idx < w_idx
                // in the same vec, which cannot happen (different queues);
                // re-resolve defensively anyway since demote can reorder
                // waiting via `push`.
                let now = self.clock.now();
                if let Some(w_idx) = self.scheduler.strongest_waiting(now) {
                    self.promote(w_idx);
                }
            } else {
                break;
            }
        }

        // 3. Time-slice rotation, bounded by how many rooms are waiting to
        // rotate in: with nothing waiting, demoting a serving room only
        // resets its billing anchor for no gain, so it never happens. When
        // several rooms are past their slice, only the longest-serving ones
        // up to the number of waiting rooms are rotated out (§4.5 step 3).
        let rotation_limit = self.scheduler.waiting.len();
        if rotation_limit > 0 {
            let due_room_ids: Vec<u32> = self
                .scheduler
                .rotation_candidates(now, self.config.time_slice_seconds)
                .into_iter()
                .map(|idx| self.scheduler.serving[idx].room_id)
                .take(rotation_limit)
                .collect();
            for room_id in due_room_ids {
                // Indices shift as earlier rooms in this loop are demoted;
                // re-resolve the room's current index before acting on it.
                if let Some(idx) = self.scheduler.serving.iter().position(|e| e.room_id == room_id)
                {
                    self.demote(idx);
                }
            }
        }

        // 4. Fill slots.
        while self.scheduler.serving.len() < self.config.capacity {
            match self.scheduler.promote_candidate(now) {
                Some(idx) => self.promote(idx),
                None => break,
            }
        }
    }

    fn apply_signal(&mut self, room_id: u32, signal: Signal, now: DateTime<Utc>) {
        match signal {
            Signal::Reached => {
                self.settle_segment(room_id, now, false);
                self.scheduler.remove_room(room_id);
                self.rooms.update(room_id, |r| {
                    r.cooling_paused = true;
                    r.pause_start_temp = Some(r.target_temp);
                    r.serving_start = None;
                    r.waiting_start = None;
                    r.billing_start_temp = None;
                });
                info!(room_id, "target reached, room paused");
                self.schedule_pass();
            }
            Signal::Wake => {
                self.rooms.update(room_id, |r| r.cooling_paused = false);
                info!(room_id, "rewarm threshold crossed, room re-entering scheduler");
                self.entry_procedure(room_id);
            }
        }
    }

    // ---- C6: ticker ----

    /// One ticker iteration (§4.6). Per-room failures are logged and
    /// skipped; they never abort the rest of the iteration.
    fn tick(&mut self) {
        let now = self.clock.now();
        let ac_on_rooms: Vec<u32> =
            self.rooms.list().iter().filter(|r| r.ac_on).map(|r| r.id).collect();

        for room_id in ac_on_rooms {
            let is_serving = self.scheduler.is_serving(room_id);
            let Some(room) = self.rooms.get(room_id) else {
                warn!(room_id, "room vanished mid-tick, skipping");
                continue;
            };
            let fan_rate = self.config.fan_rate(room.fan_speed);
            let result =
                thermal::step(&self.config, thermal_input(room), is_serving, now, false, fan_rate);
            self.rooms.update(room_id, |r| {
                r.current_temp = result.new_temp;
                r.last_temp_update = Some(now);
            });
            if let Some(signal) = result.signal {
                debug!(room_id, ?signal, "thermal signal");
                self.apply_signal(room_id, signal, now);
            }
        }

        self.schedule_pass();
    }

    // ---- C7 commands ----

    fn power_on(&mut self, room_id: u32, current_temp: Option<f64>) -> Result<PowerOnOutcome, EngineError> {
        let room = self.rooms.get(room_id).ok_or(EngineError::NotFound { room_id })?;
        if room.ac_on {
            return Ok(PowerOnOutcome::NoOp);
        }
        let t = self.clock.now();
        let daily_rate = room.daily_rate;
        self.rooms.update(room_id, |r| {
            if let Some(temp) = current_temp {
                r.current_temp = temp;
            }
            r.ac_on = true;
            r.ac_session_start = Some(t);
            r.last_temp_update = Some(t);
            r.cooling_paused = false;
        });
        if self.config.enable_ac_cycle_daily_fee && daily_rate > 0.0 {
            self.billing.append(DetailRecord {
                id: new_record_id(),
                room_id,
                kind: DetailRecordKind::RoomFee,
                start_time: t,
                end_time: t,
                fan_speed: self.rooms.get(room_id).unwrap().fan_speed,
                mode: self.rooms.get(room_id).unwrap().mode,
                rate: daily_rate,
                cost: daily_rate,
                customer_id: None,
            });
        }
        self.entry_procedure(room_id);
        Ok(PowerOnOutcome::Started)
    }

    fn power_off(&mut self, room_id: u32) -> Result<(), EngineError> {
        let room = self.rooms.get(room_id).ok_or(EngineError::NotFound { room_id })?;
        if !room.ac_on {
            return Err(EngineError::Precondition(format!("room {room_id} AC is already off")));
        }
        let t = self.clock.now();
        let is_serving = self.scheduler.is_serving(room_id);
        self.force_advance(room_id, is_serving, t);
        self.settle_segment(room_id, t, true);
        self.scheduler.remove_room(room_id);
        let mode = self.rooms.get(room_id).unwrap().mode;
        self.rooms.update(room_id, |r| {
            r.ac_on = false;
            r.ac_session_start = None;
            r.serving_start = None;
            r.waiting_start = None;
            r.billing_start_temp = None;
            r.cooling_paused = false;
            r.pause_start_temp = None;
            r.fan_speed = FanSpeed::Medium;
            r.target_temp = self.config.default_target(mode);
            r.current_temp = self.config.default_temp;
            r.last_temp_update = None;
        });
        self.schedule_pass();
        Ok(())
    }

    fn change_temp(&mut self, room_id: u32, target: f64) -> Result<ChangeTempOutcome, EngineError> {
        let room = self.rooms.get(room_id).ok_or(EngineError::NotFound { room_id })?;
        if !room.ac_on {
            return Err(EngineError::Precondition(format!("room {room_id} AC is off")));
        }
        let mode = room.mode;
        let current_target = room.target_temp;
        let (min, max) = (self.config.min_temp(mode), self.config.max_temp(mode));
        if target < min || target > max {
            return Ok(ChangeTempOutcome::OutOfRange {
                message: format!(
                    "target {target} outside [{min}, {max}] for {mode:?}; current target is {current_target}"
                ),
            });
        }
        let was_paused = room.cooling_paused;
        self.rooms.update(room_id, |r| r.target_temp = target);
        if was_paused {
            self.rooms.update(room_id, |r| r.cooling_paused = false);
            self.entry_procedure(room_id);
        }
        Ok(ChangeTempOutcome::Applied)
    }

    fn change_speed(&mut self, room_id: u32, fan: FanSpeed) -> Result<ChangeOutcome, EngineError> {
        let room = self.rooms.get(room_id).ok_or(EngineError::NotFound { room_id })?;
        if !room.ac_on {
            return Err(EngineError::Precondition(format!("room {room_id} AC is off")));
        }
        if room.fan_speed == fan {
            return Ok(ChangeOutcome::NoOp);
        }
        let t = self.clock.now();
        if room.serving_start.is_some() {
            let is_serving = true;
            self.force_advance(room_id, is_serving, t);
            self.settle_segment(room_id, t, false);
            self.rooms.update(room_id, |r| {
                r.billing_start_temp = Some(r.current_temp);
                r.serving_start = Some(t);
            });
        }
        self.rooms.update(room_id, |r| r.fan_speed = fan);
        self.entry_procedure(room_id);
        Ok(ChangeOutcome::Applied)
    }

    fn change_mode(&mut self, room_id: u32, mode: Mode) -> Result<ChangeOutcome, EngineError> {
        let room = self.rooms.get(room_id).ok_or(EngineError::NotFound { room_id })?;
        if !room.ac_on {
            return Err(EngineError::Precondition(format!("room {room_id} AC is off")));
        }
        if room.mode == mode {
            return Ok(ChangeOutcome::NoOp);
        }
        let t = self.clock.now();
        if room.serving_start.is_some() {
            self.force_advance(room_id, true, t);
            self.settle_segment(room_id, t, false);
            self.rooms.update(room_id, |r| {
                r.billing_start_temp = Some(r.current_temp);
                r.serving_start = Some(t);
            });
        }
        let target = self.config.default_target(mode);
        self.rooms.update(room_id, |r| {
            r.mode = mode;
            r.target_temp = target;
        });
        self.entry_procedure(room_id);
        Ok(ChangeOutcome::Applied)
    }

    fn request_state(&self, room_id: u32) -> Result<RoomSnapshot, EngineError> {
        let room = self.rooms.get(room_id).ok_or(EngineError::NotFound { room_id })?;
        let now = self.clock.now();
        Ok(self.snapshot_of(room, now))
    }

    fn schedule_status(&self) -> ScheduleStatusSnapshot {
        let now = self.clock.now();
        ScheduleStatusSnapshot {
            capacity: self.config.capacity,
            time_slice_seconds: self.config.time_slice_seconds,
            serving: self
                .scheduler
                .serving
                .iter()
                .map(|e| ScheduleEntry {
                    room_id: e.room_id,
                    fan_speed: e.fan_speed,
                    seconds: serving_duration(e, now),
                })
                .collect(),
            waiting: self
                .scheduler
                .waiting
                .iter()
                .map(|e| ScheduleEntry {
                    room_id: e.room_id,
                    fan_speed: e.fan_speed,
                    seconds: waiting_duration(e, now),
                })
                .collect(),
        }
    }

    fn snapshot_of(&self, room: &Room, now: DateTime<Utc>) -> RoomSnapshot {
        let queue_state = if !room.ac_on {
            QueueState::Idle
        } else if room.cooling_paused {
            QueueState::Paused
        } else if self.scheduler.is_serving(room.id) {
            QueueState::Serving
        } else if self.scheduler.is_waiting(room.id) {
            QueueState::Waiting
        } else {
            QueueState::Idle
        };

        let serving_seconds = room
            .serving_start
            .map(|t| (now - t).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0)
            .unwrap_or(0.0);
        let waiting_seconds = room
            .waiting_start
            .map(|t| (now - t).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0)
            .unwrap_or(0.0);

        let pending_ac = room
            .serving_start
            .zip(room.billing_start_temp)
            .map(|(_, anchor)| {
                let effective = match room.mode {
                    Mode::Cooling => (anchor - room.current_temp).max(0.0),
                    Mode::Heating => (room.current_temp - anchor).max(0.0),
                };
                effective * self.config.billing_unit_price
            })
            .unwrap_or(0.0);

        let settled = self.billing.settled_cost(room.id);
        let daily_display =
            if self.config.enable_ac_cycle_daily_fee { 0.0 } else { room.daily_rate };
        let total_cost = settled + pending_ac + daily_display;

        RoomSnapshot {
            room_id: room.id,
            status: room.status,
            ac_on: room.ac_on,
            mode: room.mode,
            fan_speed: room.fan_speed,
            current_temp: room.current_temp,
            target_temp: room.target_temp,
            default_temp: room.default_temp,
            daily_rate: room.daily_rate,
            queue_state,
            serving_seconds,
            waiting_seconds,
            total_cost,
        }
    }
}

fn thermal_input(room: &Room) -> ThermalInput {
    ThermalInput {
        mode: room.mode,
        ac_on: room.ac_on,
        cooling_paused: room.cooling_paused,
        current_temp: room.current_temp,
        target_temp: room.target_temp,
        default_temp: room.default_temp,
        pause_start_temp: room.pause_start_temp,
        last_temp_update: room.last_temp_update,
    }
}

fn zero_cost_power_off_marker(room: &Room, start: DateTime<Utc>, end: DateTime<Utc>) -> DetailRecord {
    DetailRecord {
        id: new_record_id(),
        room_id: room.id,
        kind: DetailRecordKind::PowerOffCycle,
        start_time: start,
        end_time: end,
        fan_speed: room.fan_speed,
        mode: room.mode,
        rate: 0.0,
        cost: 0.0,
        customer_id: None,
    }
}

/// The lock-holding handle every caller (binding layer, ticker, library
/// consumers, tests) goes through. Cloning is cheap: it shares the same
/// `Mutex<EngineState>`.
#[derive(Clone)]
pub struct Engine {
    state: Arc<Mutex<EngineState>>,
    pub config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Engine { state: Arc::new(Mutex::new(EngineState::new(config.clone()))), config }
    }

    pub async fn power_on(&self, room_id: u32, current_temp: Option<f64>) -> Result<PowerOnOutcome, EngineError> {
        self.state.lock().await.power_on(room_id, current_temp)
    }

    pub async fn power_off(&self, room_id: u32) -> Result<(), EngineError> {
        self.state.lock().await.power_off(room_id)
    }

    pub async fn change_temp(&self, room_id: u32, target: f64) -> Result<ChangeTempOutcome, EngineError> {
        self.state.lock().await.change_temp(room_id, target)
    }

    pub async fn change_speed(&self, room_id: u32, fan: FanSpeed) -> Result<ChangeOutcome, EngineError> {
        self.state.lock().await.change_speed(room_id, fan)
    }

    pub async fn change_mode(&self, room_id: u32, mode: Mode) -> Result<ChangeOutcome, EngineError> {
        self.state.lock().await.change_mode(room_id, mode)
    }

    pub async fn request_state(&self, room_id: u32) -> Result<RoomSnapshot, EngineError> {
        self.state.lock().await.request_state(room_id)
    }

    pub async fn schedule_status(&self) -> ScheduleStatusSnapshot {
        self.state.lock().await.schedule_status()
    }

    pub async fn tick(&self) {
        self.state.lock().await.tick();
    }

    pub async fn set_time_speed(&self, speed: f64) -> ClockSnapshot {
        let mut state = self.state.lock().await;
        state.clock.set_speed(speed);
        state.clock.snapshot()
    }

    pub async fn jump_time_minutes(&self, add_minutes: f64) -> ClockSnapshot {
        let mut state = self.state.lock().await;
        state.clock.jump_by(ChronoDuration::milliseconds((add_minutes * 60_000.0) as i64));
        state.clock.snapshot()
    }

    pub async fn pause_time(&self) -> ClockSnapshot {
        let mut state = self.state.lock().await;
        state.clock.pause();
        state.clock.snapshot()
    }

    pub async fn resume_time(&self) -> ClockSnapshot {
        let mut state = self.state.lock().await;
        state.clock.resume();
        state.clock.snapshot()
    }

    pub async fn time_status(&self) -> ClockSnapshot {
        self.state.lock().await.clock.snapshot()
    }

    /// Test-only room seeding, mirroring `/test/initRoom` in §6.
    pub async fn init_room(
        &self,
        room_id: u32,
        temperature: Option<f64>,
        default_temp: Option<f64>,
        daily_rate: Option<f64>,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        let found = state.rooms.update(room_id, |r| {
            if let Some(t) = temperature {
                r.current_temp = t;
            }
            if let Some(d) = default_temp {
                r.default_temp = d;
            }
            if let Some(rate) = daily_rate {
                r.daily_rate = rate;
            }
        });
        if found {
            Ok(())
        } else {
            Err(EngineError::NotFound { room_id })
        }
    }
}
