// runtime configuration: capacity, temperature bounds, billing + time knobs
use clap::Parser;

use hotel_ac_protocol::{FanSpeed, Mode};

/// Process-wide, immutable-after-boot configuration (§3 `EngineConfig`).
///
/// Every field here is read by some component through an `&` reference;
/// nothing mutates it after [`Cli::parse_and_build_config`] returns.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub capacity: usize,
    pub time_slice_seconds: f64,
    pub room_count: usize,
    pub default_temp: f64,

    pub cooling_min_temp: f64,
    pub cooling_max_temp: f64,
    pub cooling_default_target: f64,
    pub heating_min_temp: f64,
    pub heating_max_temp: f64,
    pub heating_default_target: f64,

    pub time_acceleration_factor: f64,
    pub enable_ac_cycle_daily_fee: bool,

    /// °C per logical minute, by fan speed (ρ_fan in §4.4).
    pub fan_rate_low: f64,
    pub fan_rate_medium: f64,
    pub fan_rate_high: f64,
    /// Passive rewarm/re-cool rate toward `defaultTemp` (ρ_rw in §4.4).
    pub rewarm_rate: f64,

    /// Currency units per °C of effective change (§4.7 settlement rule).
    pub billing_unit_price: f64,
    /// Seeded onto every room at boot; reported by `RequestState` and
    /// charged as a `ROOM_FEE` record when `enable_ac_cycle_daily_fee`.
    pub default_daily_rate: f64,

    /// Listen address for the binding layer (A4); not part of the core
    /// engine contract, purely a convenience for running the daemon.
    pub bind_addr: String,
}

impl EngineConfig {
    pub fn min_temp(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Cooling => self.cooling_min_temp,
            Mode::Heating => self.heating_min_temp,
        }
    }

    pub fn max_temp(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Cooling => self.cooling_max_temp,
            Mode::Heating => self.heating_max_temp,
        }
    }

    pub fn default_target(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Cooling => self.cooling_default_target,
            Mode::Heating => self.heating_default_target,
        }
    }

    /// ρ_fan: conditioning rate in °C per logical minute for a fan speed.
    pub fn fan_rate(&self, speed: FanSpeed) -> f64 {
        match speed {
            FanSpeed::Low => self.fan_rate_low,
            FanSpeed::Medium => self.fan_rate_medium,
            FanSpeed::High => self.fan_rate_high,
        }
    }
}

/// CLI surface mirroring the environment contract in the specification's
/// external-interfaces section. Every flag also reads its named
/// environment variable, so `HOTEL_AC_TOTAL_COUNT=5 hotel-ac-daemon` and
/// `hotel-ac-daemon --capacity 5` are equivalent; the explicit flag wins
/// when both are given.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    #[arg(long, env = "HOTEL_AC_TOTAL_COUNT", default_value_t = 3)]
    pub capacity: usize,

    #[arg(long, env = "HOTEL_TIME_SLICE", default_value_t = 120.0)]
    pub time_slice: f64,

    #[arg(long, env = "HOTEL_ROOM_COUNT", default_value_t = 5)]
    pub room_count: usize,

    #[arg(long, env = "HOTEL_DEFAULT_TEMP", default_value_t = 25.0)]
    pub default_temp: f64,

    #[arg(long, env = "COOLING_MIN_TEMP", default_value_t = 16.0)]
    pub cooling_min_temp: f64,
    #[arg(long, env = "COOLING_MAX_TEMP", default_value_t = 30.0)]
    pub cooling_max_temp: f64,
    #[arg(long, env = "COOLING_DEFAULT_TARGET_TEMP", default_value_t = 22.0)]
    pub cooling_default_target_temp: f64,

    #[arg(long, env = "HEATING_MIN_TEMP", default_value_t = 16.0)]
    pub heating_min_temp: f64,
    #[arg(long, env = "HEATING_MAX_TEMP", default_value_t = 30.0)]
    pub heating_max_temp: f64,
    #[arg(long, env = "HEATING_DEFAULT_TARGET_TEMP", default_value_t = 22.0)]
    pub heating_default_target_temp: f64,

    #[arg(long, env = "TIME_ACCELERATION_FACTOR", default_value_t = 1.0)]
    pub time_acceleration_factor: f64,

    #[arg(long, env = "ENABLE_AC_CYCLE_DAILY_FEE", default_value_t = false)]
    pub enable_ac_cycle_daily_fee: bool,

    #[arg(long, env = "HOTEL_AC_BIND_ADDR", default_value = "127.0.0.1:7979")]
    pub bind_addr: String,
}

impl Cli {
    pub fn parse_and_build_config() -> EngineConfig {
        <Cli as Parser>::parse().into_config()
    }

    pub fn into_config(self) -> EngineConfig {
        EngineConfig {
            capacity: self.capacity,
            time_slice_seconds: self.time_slice,
            room_count: self.room_count,
            default_temp: self.default_temp,
            cooling_min_temp: self.cooling_min_temp,
            cooling_max_temp: self.cooling_max_temp,
            cooling_default_target: self.cooling_default_target_temp,
            heating_min_temp: self.heating_min_temp,
            heating_max_temp: self.heating_max_temp,
            heating_default_target: self.heating_default_target_temp,
            time_acceleration_factor: self.time_acceleration_factor,
            enable_ac_cycle_daily_fee: self.enable_ac_cycle_daily_fee,
            fan_rate_low: 1.0 / 3.0,
            fan_rate_medium: 1.0 / 2.0,
            fan_rate_high: 1.0,
            rewarm_rate: 1.0 / 2.0,
            billing_unit_price: 1.0,
            default_daily_rate: 100.0,
            bind_addr: self.bind_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EngineConfig {
        EngineConfig {
            capacity: 3,
            time_slice_seconds: 120.0,
            room_count: 5,
            default_temp: 25.0,
            cooling_min_temp: 16.0,
            cooling_max_temp: 30.0,
            cooling_default_target: 22.0,
            heating_min_temp: 16.0,
            heating_max_temp: 30.0,
            heating_default_target: 22.0,
            time_acceleration_factor: 1.0,
            enable_ac_cycle_daily_fee: false,
            fan_rate_low: 1.0 / 3.0,
            fan_rate_medium: 1.0 / 2.0,
            fan_rate_high: 1.0,
            rewarm_rate: 1.0 / 2.0,
            billing_unit_price: 1.0,
            default_daily_rate: 100.0,
            bind_addr: "127.0.0.1:7979".into(),
        }
    }

    #[test]
    fn fan_rate_ordering_matches_priority_ordering() {
        let cfg = sample();
        assert!(cfg.fan_rate(FanSpeed::High) > cfg.fan_rate(FanSpeed::Medium));
        assert!(cfg.fan_rate(FanSpeed::Medium) > cfg.fan_rate(FanSpeed::Low));
    }

    #[test]
    fn per_mode_bounds_select_the_right_side() {
        let cfg = sample();
        assert_eq!(cfg.min_temp(Mode::Cooling), 16.0);
        assert_eq!(cfg.default_target(Mode::Heating), 22.0);
    }
}
