// C3: append-only detail records. Aggregation is left to callers.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use hotel_ac_protocol::DetailRecord;

#[derive(Debug, Clone, Default)]
pub struct BillingLog {
    records: Vec<DetailRecord>,
}

impl BillingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: DetailRecord) {
        self.records.push(record);
    }

    pub fn list_by_room(
        &self,
        room_id: u32,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        customer_id: Option<&str>,
    ) -> Vec<&DetailRecord> {
        self.records
            .iter()
            .filter(|r| r.room_id == room_id)
            .filter(|r| from.map_or(true, |f| r.start_time >= f))
            .filter(|r| to.map_or(true, |t| r.end_time <= t))
            .filter(|r| match customer_id {
                Some(cid) => r.customer_id.as_deref() == Some(cid),
                None => true,
            })
            .collect()
    }

    /// Sum of `cost` across every settled record for a room. Used by
    /// `RequestState` as the non-pending part of `totalCost`.
    pub fn settled_cost(&self, room_id: u32) -> f64 {
        self.records.iter().filter(|r| r.room_id == room_id).map(|r| r.cost).sum()
    }
}

pub fn new_record_id() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_ac_protocol::{DetailRecordKind, FanSpeed, Mode};

    fn record(room_id: u32, cost: f64) -> DetailRecord {
        let now = Utc::now();
        DetailRecord {
            id: new_record_id(),
            room_id,
            kind: DetailRecordKind::Ac,
            start_time: now,
            end_time: now,
            fan_speed: FanSpeed::High,
            mode: Mode::Cooling,
            rate: 1.0,
            cost,
            customer_id: None,
        }
    }

    #[test]
    fn append_is_insertion_ordered_and_total() {
        let mut log = BillingLog::new();
        log.append(record(1, 1.0));
        log.append(record(2, 2.0));
        log.append(record(1, 3.0));
        let room1: Vec<_> = log.list_by_room(1, None, None, None);
        assert_eq!(room1.len(), 2);
        assert_eq!(room1[0].cost, 1.0);
        assert_eq!(room1[1].cost, 3.0);
    }

    #[test]
    fn settled_cost_sums_only_the_named_room() {
        let mut log = BillingLog::new();
        log.append(record(1, 4.0));
        log.append(record(2, 9.0));
        log.append(record(1, 1.5));
        assert_eq!(log.settled_cost(1), 5.5);
        assert_eq!(log.settled_cost(2), 9.0);
        assert_eq!(log.settled_cost(3), 0.0);
    }
}
