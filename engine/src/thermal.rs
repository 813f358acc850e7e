// C4: pure step function. No lock, no I/O, no side effects — takes a
// snapshot of the fields it needs and returns a new temperature plus an
// optional signal.
use chrono::{DateTime, Utc};

use hotel_ac_protocol::Mode;

use crate::config::EngineConfig;

const REACHED_EPSILON: f64 = 0.01;
const WAKE_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Reached,
    Wake,
}

#[derive(Debug, Clone, Copy)]
pub struct ThermalInput {
    pub mode: Mode,
    pub ac_on: bool,
    pub cooling_paused: bool,
    pub current_temp: f64,
    pub target_temp: f64,
    pub default_temp: f64,
    pub pause_start_temp: Option<f64>,
    pub last_temp_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub struct StepResult {
    pub new_temp: f64,
    pub signal: Option<Signal>,
}

/// `step(room, isServing, Δlogical)` from §4.4.
///
/// `forced` is the re-entrance guard from §9's design notes: Demote and
/// Promote call this to settle a room's temperature up to `now` before
/// reanchoring billing, and that settling call must never itself produce
/// a `Reached`/`Wake` signal — only the ticker's own, non-forced call is
/// allowed to. Without this guard, `Demote -> settle -> step -> signal ->
/// schedule pass -> Demote` can recur.
pub fn step(
    config: &EngineConfig,
    input: ThermalInput,
    is_serving: bool,
    now: DateTime<Utc>,
    forced: bool,
    fan_rate: f64,
) -> StepResult {
    let Some(last_update) = input.last_temp_update else {
        return StepResult { new_temp: input.current_temp, signal: None };
    };

    let delta_logical = (now - last_update).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0;
    if delta_logical <= 0.0 {
        return StepResult { new_temp: input.current_temp, signal: None };
    }
    let delta_minutes = delta_logical / 60.0;

    if is_serving && input.ac_on {
        let step_size = fan_rate * delta_minutes;
        let new_temp = move_toward(input.current_temp, input.target_temp, step_size);
        if (new_temp - input.target_temp).abs() < REACHED_EPSILON {
            let signal = if forced { None } else { Some(Signal::Reached) };
            return StepResult { new_temp: input.target_temp, signal };
        }
        return StepResult { new_temp, signal: None };
    }

    if input.ac_on && input.cooling_paused {
        let step_size = config.rewarm_rate * delta_minutes;
        let new_temp = move_toward(input.current_temp, input.default_temp, step_size);
        let anchor = input.pause_start_temp.unwrap_or(new_temp);
        if (new_temp - anchor).abs() >= WAKE_THRESHOLD {
            let signal = if forced { None } else { Some(Signal::Wake) };
            return StepResult { new_temp, signal };
        }
        return StepResult { new_temp, signal: None };
    }

    if input.ac_on {
        // waiting queue: drifting, no signal
        let step_size = config.rewarm_rate * delta_minutes;
        let new_temp = move_toward(input.current_temp, input.default_temp, step_size);
        return StepResult { new_temp, signal: None };
    }

    // acOn = false: the reference implementation freezes at defaultTemp on
    // PowerOff rather than drifting there, so there is nothing to step.
    StepResult { new_temp: input.current_temp, signal: None }
}

fn move_toward(current: f64, target: f64, max_step: f64) -> f64 {
    let diff = target - current;
    if diff.abs() <= max_step {
        target
    } else {
        current + max_step * diff.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cfg() -> EngineConfig {
        crate::config::Cli {
            capacity: 3,
            time_slice: 120.0,
            room_count: 5,
            default_temp: 32.0,
            cooling_min_temp: 16.0,
            cooling_max_temp: 30.0,
            cooling_default_target_temp: 22.0,
            heating_min_temp: 16.0,
            heating_max_temp: 30.0,
            heating_default_target_temp: 22.0,
            time_acceleration_factor: 1.0,
            enable_ac_cycle_daily_fee: false,
            bind_addr: "127.0.0.1:7979".into(),
        }
        .into_config()
    }

    #[test]
    fn first_call_after_boot_only_sets_no_change() {
        let cfg = cfg();
        let now = Utc::now();
        let input = ThermalInput {
            mode: Mode::Cooling,
            ac_on: true,
            cooling_paused: false,
            current_temp: 32.0,
            target_temp: 22.0,
            default_temp: 32.0,
            pause_start_temp: None,
            last_temp_update: None,
        };
        let result = step(&cfg, input, true, now, false, cfg.fan_rate_high);
        assert_eq!(result.new_temp, 32.0);
        assert!(result.signal.is_none());
    }

    #[test]
    fn serving_high_fan_reaches_target_in_ten_minutes() {
        let cfg = cfg();
        let start = Utc::now();
        let input = ThermalInput {
            mode: Mode::Cooling,
            ac_on: true,
            cooling_paused: false,
            current_temp: 32.0,
            target_temp: 22.0,
            default_temp: 32.0,
            pause_start_temp: None,
            last_temp_update: Some(start),
        };
        let now = start + Duration::seconds(600);
        let result = step(&cfg, input, true, now, false, cfg.fan_rate_high);
        assert_eq!(result.new_temp, 22.0);
        assert_eq!(result.signal, Some(Signal::Reached));
    }

    #[test]
    fn forced_step_never_emits_a_signal() {
        let cfg = cfg();
        let start = Utc::now();
        let input = ThermalInput {
            mode: Mode::Cooling,
            ac_on: true,
            cooling_paused: false,
            current_temp: 32.0,
            target_temp: 22.0,
            default_temp: 32.0,
            pause_start_temp: None,
            last_temp_update: Some(start),
        };
        let now = start + Duration::seconds(600);
        let result = step(&cfg, input, true, now, true, cfg.fan_rate_high);
        assert_eq!(result.new_temp, 22.0);
        assert!(result.signal.is_none());
    }

    #[test]
    fn paused_room_wakes_after_one_degree_of_rewarm() {
        let cfg = cfg();
        let start = Utc::now();
        let input = ThermalInput {
            mode: Mode::Cooling,
            ac_on: true,
            cooling_paused: true,
            current_temp: 24.0,
            target_temp: 24.0,
            default_temp: 32.0,
            pause_start_temp: Some(24.0),
            last_temp_update: Some(start),
        };
        // 0.5 C/min rewarm: at 120s -> +1.0C, right at the wake threshold.
        let now = start + Duration::seconds(120);
        let result = step(&cfg, input, false, now, false, 0.0);
        assert_eq!(result.new_temp, 25.0);
        assert_eq!(result.signal, Some(Signal::Wake));
    }

    #[test]
    fn waiting_room_drifts_without_signal() {
        let cfg = cfg();
        let start = Utc::now();
        let input = ThermalInput {
            mode: Mode::Cooling,
            ac_on: true,
            cooling_paused: false,
            current_temp: 24.0,
            target_temp: 22.0,
            default_temp: 32.0,
            pause_start_temp: None,
            last_temp_update: Some(start),
        };
        let now = start + Duration::seconds(60);
        let result = step(&cfg, input, false, now, false, 0.0);
        assert!(result.new_temp > 24.0);
        assert!(result.signal.is_none());
    }
}
