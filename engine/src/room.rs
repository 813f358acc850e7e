// C2: room records + atomic field updates.
use chrono::{DateTime, Utc};

use hotel_ac_protocol::{FanSpeed, Mode, RoomStatus};

use crate::config::EngineConfig;

#[derive(Debug, Clone)]
pub struct Room {
    pub id: u32,
    pub status: RoomStatus,
    pub ac_on: bool,
    pub mode: Mode,
    pub fan_speed: FanSpeed,
    pub current_temp: f64,
    pub target_temp: f64,
    pub default_temp: f64,
    pub daily_rate: f64,
    pub ac_session_start: Option<DateTime<Utc>>,
    pub serving_start: Option<DateTime<Utc>>,
    pub waiting_start: Option<DateTime<Utc>>,
    pub billing_start_temp: Option<f64>,
    pub last_temp_update: Option<DateTime<Utc>>,
    pub cooling_paused: bool,
    pub pause_start_temp: Option<f64>,
}

impl Room {
    fn new(id: u32, config: &EngineConfig) -> Self {
        Room {
            id,
            status: RoomStatus::Available,
            ac_on: false,
            mode: Mode::Cooling,
            fan_speed: FanSpeed::Medium,
            current_temp: config.default_temp,
            target_temp: config.cooling_default_target,
            default_temp: config.default_temp,
            daily_rate: config.default_daily_rate,
            ac_session_start: None,
            serving_start: None,
            waiting_start: None,
            billing_start_temp: None,
            last_temp_update: None,
            cooling_paused: false,
            pause_start_temp: None,
        }
    }

    /// (I1)-(I5) from §3. Checked in tests and debug assertions at
    /// transition points, not on every read.
    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) {
        if self.serving_start.is_some() {
            debug_assert!(self.billing_start_temp.is_some(), "I1 violated for room {}", self.id);
        }
        debug_assert!(
            !(self.serving_start.is_some() && self.waiting_start.is_some()),
            "I2 violated for room {}",
            self.id
        );
        if self.cooling_paused {
            debug_assert!(self.serving_start.is_none() && self.waiting_start.is_none() && self.ac_on, "I3 violated for room {}", self.id);
        }
        if !self.ac_on {
            debug_assert!(
                self.serving_start.is_none()
                    && self.waiting_start.is_none()
                    && self.billing_start_temp.is_none()
                    && self.ac_session_start.is_none()
                    && !self.cooling_paused,
                "I5 violated for room {}",
                self.id
            );
        }
    }
}

/// Fixed-capacity room table, indexed by `roomId`. No hash map: the
/// specification's design notes call for keeping the critical path to a
/// plain array plus the scheduler's two small slices.
#[derive(Debug, Clone)]
pub struct RoomStore {
    rooms: Vec<Room>,
}

impl RoomStore {
    pub fn new(config: &EngineConfig) -> Self {
        let rooms = (1..=config.room_count as u32).map(|id| Room::new(id, config)).collect();
        RoomStore { rooms }
    }

    pub fn get(&self, id: u32) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.id == id)
    }

    pub fn list(&self) -> &[Room] {
        &self.rooms
    }

    /// Apply a column-level patch to one room in place. Callers mutate
    /// the fields they need through `&mut Room` and never hold a
    /// separately-read copy of the whole record, which is what caused
    /// lost updates in the source this design replaces.
    pub fn update<F: FnOnce(&mut Room)>(&mut self, id: u32, f: F) -> bool {
        match self.get_mut(id) {
            Some(room) => {
                f(room);
                #[cfg(debug_assertions)]
                room.check_invariants();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        crate::config::Cli {
            capacity: 3,
            time_slice: 120.0,
            room_count: 5,
            default_temp: 25.0,
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
    fn store_is_seeded_with_room_count_rooms_at_default_temp() {
        let store = RoomStore::new(&cfg());
        assert_eq!(store.list().len(), 5);
        assert_eq!(store.get(1).unwrap().current_temp, 25.0);
        assert!(store.get(6).is_none());
    }

    #[test]
    fn update_mutates_in_place_without_whole_row_replace() {
        let mut store = RoomStore::new(&cfg());
        let applied = store.update(2, |room| {
            room.ac_on = true;
            room.fan_speed = FanSpeed::High;
        });
        assert!(applied);
        let room = store.get(2).unwrap();
        assert!(room.ac_on);
        assert_eq!(room.fan_speed, FanSpeed::High);
        assert_eq!(room.current_temp, 25.0);
    }

    #[test]
    fn update_on_unknown_room_is_a_no_op() {
        let mut store = RoomStore::new(&cfg());
        assert!(!store.update(999, |room| room.ac_on = true));
    }
}
