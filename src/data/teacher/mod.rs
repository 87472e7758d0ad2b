use std::str::FromStr;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::true_bool;

pub mod db;

pub static TEACHER_COLLECTION_NAME: &str = "teachers";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeacherStatus {
    #[default]
    FullTime,
    PartTime,
    Substitute,
    OnLeave,
}

impl FromStr for TeacherStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "fullTime" => TeacherStatus::FullTime,
            "partTime" => TeacherStatus::PartTime,
            "substitute" => TeacherStatus::Substitute,
            "onLeave" => TeacherStatus::OnLeave,
            other => {
                return Err(format!(
                    "'{}' isn't one of fullTime, partTime, substitute or onLeave",
                    other
                ))
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub teacher_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "true_bool")]
    pub is_active: bool,
    #[serde(default)]
    pub status: TeacherStatus,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ObjectId>,
    #[serde(default)]
    pub tutored_students: Vec<ObjectId>,
}
