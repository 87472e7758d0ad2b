use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ServiceError;
use crate::validate::Validator;

pub static COURSE_COLLECTION_NAME: &str = "courses";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseCreateData {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CourseCreateData {
    pub fn validate(&self) -> Result<Course, ServiceError> {
        let mut v = Validator::new();
        let name = v.text("name", &self.name, 1, 100);
        let description = v.optional_text("description", &self.description, 1000);
        let course = name.map(|name| Course {
            id: ObjectId::new(),
            name,
            description,
        });
        v.finish(course)
    }
}
