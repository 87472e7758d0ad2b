use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::schedule::ScheduleSlot;

pub mod db;

pub static ROOM_COLLECTION_NAME: &str = "rooms";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub reason: String,
    /// Permanent room of the class, restored once the exception ends.
    #[serde(default)]
    pub original_room: Option<ObjectId>,
}

/// One booking of a room by a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyEntry {
    #[serde(default)]
    pub period: Option<String>,
    pub schedule: ScheduleSlot,
    pub class: ObjectId,
    #[serde(default)]
    pub is_temporary: bool,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub current_occupancy: Vec<OccupancyEntry>,
}

impl Room {
    /// Active bookings overlapping `slot`.
    pub fn conflicts(&self, slot: &ScheduleSlot) -> Vec<OccupancyEntry> {
        self.current_occupancy
            .iter()
            .filter(|it| slot.conflicts_with(&it.schedule))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schedule::Weekday;

    fn entry(day: Weekday, start: &str, end: &str, active: bool) -> OccupancyEntry {
        let mut schedule =
            ScheduleSlot::new(day, start.parse().unwrap(), end.parse().unwrap());
        schedule.active = active;
        OccupancyEntry {
            period: None,
            schedule,
            class: ObjectId::new(),
            is_temporary: false,
            exception_details: None,
        }
    }

    #[test]
    fn room_reports_only_active_overlaps() {
        let room = Room {
            id: ObjectId::new(),
            name: "B-12".into(),
            capacity: 30,
            current_occupancy: vec![
                entry(Weekday::Mon, "09:00", "10:00", true),
                entry(Weekday::Mon, "10:00", "11:00", false),
                entry(Weekday::Tue, "09:00", "10:00", true),
            ],
        };
        let proposed = ScheduleSlot::new(
            Weekday::Mon,
            "09:30".parse().unwrap(),
            "10:30".parse().unwrap(),
        );

        let conflicts = room.conflicts(&proposed);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0], room.current_occupancy[0]);
    }
}
