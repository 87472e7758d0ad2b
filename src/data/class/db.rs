use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::schedule::ScheduleSlot;
use crate::error::ServiceError;
use crate::validate::Validator;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotData {
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassCreateData {
    pub name: Option<String>,
    pub section: Option<String>,
    pub code: Option<String>,
    #[serde(default)]
    pub schedule: Vec<SlotData>,
    pub course: Option<String>,
    pub max_capacity: Option<u32>,
    pub waitlist_capacity: Option<u32>,
    pub is_extracurricular: Option<bool>,
}

/// A validated class that still needs a code and an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClass {
    pub name: String,
    pub section: Option<String>,
    pub code: Option<String>,
    pub schedule: Vec<ScheduleSlot>,
    pub course: Option<ObjectId>,
    pub max_capacity: u32,
    pub waitlist_capacity: u32,
    pub is_extracurricular: bool,
}

impl ClassCreateData {
    pub fn validate(&self) -> Result<NewClass, ServiceError> {
        let mut v = Validator::new();

        let name = v.text("name", &self.name, 1, 100);
        let section = v.optional_text("section", &self.section, 20);
        let code = match v.optional_text("code", &self.code, 20) {
            Some(code) if code.is_empty() => None,
            Some(code) => Some(code.to_uppercase()),
            None => None,
        };
        let course = v.optional_id("course", &self.course);

        let mut schedule: Vec<ScheduleSlot> = Vec::with_capacity(self.schedule.len());
        for (i, slot) in self.schedule.iter().enumerate() {
            let prefix = format!("schedule[{}].", i);
            if let Some(mut parsed) = v.slot(&prefix, &slot.day, &slot.start_time, &slot.end_time) {
                parsed.active = slot.active.unwrap_or(true);
                if parsed.active && schedule.iter().any(|it| parsed.conflicts_with(it)) {
                    v.reject(
                        format!("schedule[{}]", i),
                        "Overlaps another slot of this class.",
                    );
                }
                schedule.push(parsed);
            }
        }

        let max_capacity = self.max_capacity.unwrap_or(30);
        if max_capacity > 500 {
            v.reject("maxCapacity", "Can't be larger than 500.");
        }

        let new_class = name.map(|name| NewClass {
            name,
            section,
            code,
            schedule,
            course,
            max_capacity,
            waitlist_capacity: self.waitlist_capacity.unwrap_or(0),
            is_extracurricular: self.is_extracurricular.unwrap_or(false),
        });
        v.finish(new_class)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoomData {
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignCourseData {
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryBookingData {
    pub room_id: Option<String>,
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemporaryBooking {
    pub room: ObjectId,
    pub slot: ScheduleSlot,
    pub reason: String,
    pub period: Option<String>,
}

impl TemporaryBookingData {
    pub fn validate(&self) -> Result<TemporaryBooking, ServiceError> {
        let mut v = Validator::new();

        let room = v.id("roomId", &self.room_id);
        let slot = v.slot("", &self.day, &self.start_time, &self.end_time);
        let reason = v.text("reason", &self.reason, 1, 200);
        let period = v.optional_text("period", &self.period, 50);

        let booking = match (room, slot, reason) {
            (Some(room), Some(slot), Some(reason)) => Some(TemporaryBooking {
                room,
                slot,
                reason,
                period,
            }),
            _ => None,
        };
        v.finish(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_requires_name() {
        let data = ClassCreateData::default();
        match data.validate() {
            Err(ServiceError::Validation(errors)) => assert_eq!(errors[0].field, "name"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn class_defaults_and_code_normalization() {
        let data = ClassCreateData {
            name: Some("  Advanced Math ".into()),
            code: Some("advmat25001".into()),
            ..Default::default()
        };
        let class = data.validate().expect("valid class");
        assert_eq!(class.name, "Advanced Math");
        assert_eq!(class.code.as_deref(), Some("ADVMAT25001"));
        assert_eq!(class.max_capacity, 30);
        assert!(class.schedule.is_empty());
    }

    #[test]
    fn class_schedule_errors_carry_index() {
        let data = ClassCreateData {
            name: Some("Biology".into()),
            schedule: vec![
                SlotData {
                    day: Some("Mon".into()),
                    start_time: Some("09:00".into()),
                    end_time: Some("10:00".into()),
                    active: None,
                },
                SlotData {
                    day: Some("Tue".into()),
                    start_time: Some("9am".into()),
                    end_time: Some("10:00".into()),
                    active: None,
                },
            ],
            ..Default::default()
        };
        match data.validate() {
            Err(ServiceError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "schedule[1].startTime");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn class_schedule_rejects_overlapping_slots() {
        let slot = |day: &str, start: &str, end: &str, active| SlotData {
            day: Some(day.into()),
            start_time: Some(start.into()),
            end_time: Some(end.into()),
            active,
        };
        let data = ClassCreateData {
            name: Some("Physics".into()),
            schedule: vec![
                slot("Mon", "09:00", "10:00", None),
                slot("Mon", "10:00", "11:00", None),
                slot("Mon", "09:30", "10:30", Some(false)),
                slot("Mon", "09:30", "10:30", None),
            ],
            ..Default::default()
        };
        match data.validate() {
            Err(ServiceError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "schedule[3]");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
