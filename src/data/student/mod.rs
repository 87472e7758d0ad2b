use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::true_bool;

pub mod db;

pub static STUDENT_COLLECTION_NAME: &str = "students";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "true_bool")]
    pub is_enrolled: bool,
    /// 0 is kindergarten.
    pub grade_level: u8,
    #[serde(default)]
    pub homeroom: Option<ObjectId>,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
    #[serde(default)]
    pub enrolled_classes: Vec<ObjectId>,
    #[serde(default)]
    pub advisor: Option<ObjectId>,
}
