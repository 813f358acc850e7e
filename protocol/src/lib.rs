//! Wire types shared between the hotel-ac engine and its binding layer.
//!
//! These are plain DTOs: they carry no engine behaviour and no lock. The
//! binding layer (in the `engine` crate) translates a `Request` into exactly
//! one engine call and serialises the engine's answer back into a
//! `Response`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Timestamp = DateTime<Utc>;

/// Room occupancy status. Distinct from AC power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Cooling,
    Heating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FanSpeed {
    Low,
    Medium,
    High,
}

impl FanSpeed {
    /// Priority used by the scheduler: higher fan speed wins ties.
    pub fn priority(self) -> u8 {
        match self {
            FanSpeed::Low => 1,
            FanSpeed::Medium => 2,
            FanSpeed::High => 3,
        }
    }
}

/// Where a room currently sits relative to the two scheduler queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueState {
    Idle,
    Serving,
    Waiting,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailRecordKind {
    Ac,
    PowerOffCycle,
    RoomFee,
}

/// A billing-log entry. Append-only, never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub id: Uuid,
    pub room_id: u32,
    pub kind: DetailRecordKind,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub fan_speed: FanSpeed,
    pub mode: Mode,
    pub rate: f64,
    pub cost: f64,
    pub customer_id: Option<String>,
}

/// A snapshot of one room, suitable for returning from `RequestState`.
///
/// Carries both spellings of each field named in the wire contract so
/// existing camelCase and snake_case front-ends both deserialise it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: u32,
    pub status: RoomStatus,
    pub ac_on: bool,
    pub mode: Mode,
    #[serde(alias = "fan_speed")]
    pub fan_speed: FanSpeed,
    #[serde(alias = "current_temp")]
    pub current_temp: f64,
    #[serde(alias = "target_temp")]
    pub target_temp: f64,
    pub default_temp: f64,
    pub daily_rate: f64,
    #[serde(alias = "state")]
    pub queue_state: QueueState,
    pub serving_seconds: f64,
    pub waiting_seconds: f64,
    #[serde(alias = "total_cost")]
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub room_id: u32,
    pub fan_speed: FanSpeed,
    pub seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatusSnapshot {
    pub capacity: usize,
    pub time_slice_seconds: f64,
    pub serving: Vec<ScheduleEntry>,
    pub waiting: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    pub logical_now: Timestamp,
    pub speed: f64,
    pub paused: bool,
}

/// One request frame sent to the binding layer, tagged by `op`.
///
/// Each variant maps onto exactly one C7 (or Clock test-control) call, per
/// the endpoint table in the specification's external-interfaces section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    PowerOn {
        room_id: u32,
        #[serde(default)]
        current_temp: Option<f64>,
    },
    PowerOff {
        room_id: u32,
    },
    ChangeTemp {
        room_id: u32,
        target_temp: f64,
    },
    ChangeSpeed {
        room_id: u32,
        fan_speed: FanSpeed,
    },
    ChangeMode {
        room_id: u32,
        mode: Mode,
    },
    RequestState {
        room_id: u32,
    },
    ScheduleStatus,
    SetTimeSpeed {
        speed: f64,
    },
    JumpTime {
        add_minutes: f64,
    },
    PauseTime,
    ResumeTime,
    TimeStatus,
    InitRoom {
        room_id: u32,
        #[serde(default)]
        temperature: Option<f64>,
        #[serde(default)]
        default_temp: Option<f64>,
        #[serde(default)]
        daily_rate: Option<f64>,
    },
}

/// A wire-level rendering of `EngineError` plus the `OutOfRange` soft
/// result, which the specification treats as a typed outcome rather than
/// an error (see the `OutOfRange` contract on `ChangeTemp`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireError {
    pub kind: String,
    pub message: String,
}

impl WireError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into() }
    }
}

/// The binding layer's reply, one per `Request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Response {
    Ok,
    NoOp,
    OutOfRange { message: String },
    Room { room: RoomSnapshot },
    Schedule { schedule: ScheduleStatusSnapshot },
    Clock { clock: ClockSnapshot },
    Error { error: WireError },
}
