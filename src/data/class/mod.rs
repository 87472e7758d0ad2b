use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::ScheduleSlot;
use super::true_bool;

pub mod db;

pub static CLASS_COLLECTION_NAME: &str = "classes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Waitlisted,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEnrollment {
    pub student: ObjectId,
    #[serde(
        default = "Utc::now",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub enrollment_date: DateTime<Utc>,
    #[serde(default)]
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub section: Option<String>,
    pub code: String,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,

    #[serde(default)]
    pub course: Option<ObjectId>,
    #[serde(default)]
    pub teacher: Option<ObjectId>,
    #[serde(default)]
    pub room: Option<ObjectId>,
    #[serde(default)]
    pub students: Vec<ClassEnrollment>,

    /// Zero means the class isn't capped.
    #[serde(default)]
    pub max_capacity: u32,
    #[serde(default)]
    pub waitlist_capacity: u32,

    #[serde(default = "true_bool")]
    pub is_active: bool,
    #[serde(default)]
    pub is_extracurricular: bool,
}

impl Class {
    pub fn current_enrollment(&self) -> usize {
        self.students
            .iter()
            .filter(|it| it.status == EnrollmentStatus::Active)
            .count()
    }

    pub fn is_enrolled(&self, student: ObjectId) -> bool {
        self.students.iter().any(|it| it.student == student)
    }

    pub fn is_full(&self) -> bool {
        self.max_capacity > 0 && self.current_enrollment() >= self.max_capacity as usize
    }

    pub fn active_slots(&self) -> impl Iterator<Item = &ScheduleSlot> {
        self.schedule.iter().filter(|it| it.active)
    }
}
