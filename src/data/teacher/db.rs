use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Teacher, TeacherStatus};
use crate::error::ServiceError;
use crate::validate::Validator;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherCreateData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub status: Option<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
}

impl TeacherCreateData {
    /// Validates the body and builds a teacher that still lacks its number.
    pub fn validate(&self) -> Result<Teacher, ServiceError> {
        let mut v = Validator::new();

        let first_name = v.text("firstName", &self.first_name, 1, 50);
        let last_name = v.text("lastName", &self.last_name, 1, 50);
        let status = match self.status.as_deref().map(str::parse::<TeacherStatus>) {
            Some(Ok(status)) => status,
            Some(Err(message)) => {
                v.reject("status", message);
                TeacherStatus::default()
            }
            None => TeacherStatus::default(),
        };

        let mut qualifications = Vec::with_capacity(self.qualifications.len());
        for (i, q) in self.qualifications.iter().enumerate() {
            if let Some(q) = v.text(&format!("qualifications[{}]", i), &Some(q.clone()), 1, 100) {
                qualifications.push(q);
            }
        }

        let teacher = match (first_name, last_name) {
            (Some(first_name), Some(last_name)) => Some(Teacher {
                id: ObjectId::new(),
                teacher_number: String::new(),
                first_name,
                last_name,
                is_active: self.is_active.unwrap_or(true),
                status,
                qualifications,
                classes: vec![],
                tutored_students: vec![],
            }),
            _ => None,
        };
        v.finish(teacher)
    }
}

/// Body of `PUT /students/<id>/assign` and `PUT /teachers/<id>/assign`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignTargetData {
    pub target_type: Option<String>,
    pub target_id: Option<String>,
}

impl AssignTargetData {
    /// Checks field presence only, identifiers are checked by the assignment.
    pub fn validate(&self) -> Result<(&str, &str), ServiceError> {
        let mut v = Validator::new();
        let target_type = v.required("targetType", &self.target_type);
        let target_id = v.required("targetId", &self.target_id);
        let target = match (target_type, target_id) {
            (Some(t), Some(id)) => Some((t.as_str(), id.as_str())),
            _ => None,
        };
        v.finish(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teacher_status_is_validated() {
        let data = TeacherCreateData {
            first_name: Some("Iva".into()),
            last_name: Some("Babić".into()),
            status: Some("retired".into()),
            ..Default::default()
        };
        match data.validate() {
            Err(ServiceError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "status");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let data = TeacherCreateData {
            status: Some("partTime".into()),
            ..data
        };
        assert_eq!(data.validate().unwrap().status, TeacherStatus::PartTime);
    }
}
