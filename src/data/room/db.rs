use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::Room;
use crate::data::schedule::ScheduleSlot;
use crate::error::ServiceError;
use crate::validate::Validator;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreateData {
    pub name: Option<String>,
    pub capacity: Option<u32>,
}

impl RoomCreateData {
    pub fn validate(&self) -> Result<Room, ServiceError> {
        let mut v = Validator::new();
        let name = v.text("name", &self.name, 1, 50);
        let capacity = v.required("capacity", &self.capacity).copied();
        if capacity == Some(0) {
            v.reject("capacity", "Must be at least 1.");
        }

        let room = match (name, capacity) {
            (Some(name), Some(capacity)) => Some(Room {
                id: ObjectId::new(),
                name,
                capacity,
                current_occupancy: vec![],
            }),
            _ => None,
        };
        v.finish(room)
    }
}

/// Body of a permanent room booking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
    pub class_id: Option<String>,
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub period: Option<String>,
}

impl BookingData {
    pub fn validate(&self) -> Result<(ObjectId, ScheduleSlot, Option<String>), ServiceError> {
        let mut v = Validator::new();
        let class = v.id("classId", &self.class_id);
        let slot = v.slot("", &self.day, &self.start_time, &self.end_time);
        let period = v.optional_text("period", &self.period, 50);

        let booking = match (class, slot) {
            (Some(class), Some(slot)) => Some((class, slot, period)),
            _ => None,
        };
        v.finish(booking)
    }
}

/// Query of `GET /rooms/<id>/conflicts`.
#[derive(Debug, Clone, Default, FromForm, IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ConflictQuery {
    pub day: Option<String>,
    #[field(name = "startTime")]
    pub start_time: Option<String>,
    #[field(name = "endTime")]
    pub end_time: Option<String>,
}

impl ConflictQuery {
    pub fn validate(&self) -> Result<ScheduleSlot, ServiceError> {
        let mut v = Validator::new();
        let slot = v.slot("", &self.day, &self.start_time, &self.end_time);
        v.finish(slot)
    }
}
