use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ContactInfo, EmergencyContact, Student};
use crate::error::ServiceError;
use crate::validate::Validator;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContactData {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreateData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub grade_level: Option<u8>,
    pub is_enrolled: Option<bool>,
    pub homeroom: Option<String>,
    pub advisor: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContactData>,
}

impl StudentCreateData {
    /// Validates the body and builds a student that still lacks its number.
    pub fn validate(&self) -> Result<Student, ServiceError> {
        let mut v = Validator::new();

        let first_name = v.text("firstName", &self.first_name, 1, 50);
        let last_name = v.text("lastName", &self.last_name, 1, 50);
        let grade_level = v.required("gradeLevel", &self.grade_level).copied();
        if matches!(grade_level, Some(grade) if grade > 12) {
            v.reject("gradeLevel", "Must be between 0 (kindergarten) and 12.");
        }
        let homeroom = v.optional_id("homeroom", &self.homeroom);
        let advisor = v.optional_id("advisor", &self.advisor);

        let email = v.optional_text("email", &self.email, 100);
        if matches!(&email, Some(email) if !email.contains('@')) {
            v.reject("email", "Not a valid e-mail address.");
        }
        let contact = ContactInfo {
            email,
            phone: v.optional_text("phone", &self.phone, 30),
            address: v.optional_text("address", &self.address, 200),
        };

        let mut emergency_contacts = Vec::with_capacity(self.emergency_contacts.len());
        for (i, c) in self.emergency_contacts.iter().enumerate() {
            let name = v.text(&format!("emergencyContacts[{}].name", i), &c.name, 1, 100);
            let relationship = v.text(
                &format!("emergencyContacts[{}].relationship", i),
                &c.relationship,
                1,
                50,
            );
            let phone = v.text(&format!("emergencyContacts[{}].phone", i), &c.phone, 3, 30);
            if let (Some(name), Some(relationship), Some(phone)) = (name, relationship, phone) {
                emergency_contacts.push(EmergencyContact {
                    name,
                    relationship,
                    phone,
                });
            }
        }

        let student = match (first_name, last_name, grade_level) {
            (Some(first_name), Some(last_name), Some(grade_level)) => Some(Student {
                id: ObjectId::new(),
                student_number: String::new(),
                first_name,
                last_name,
                is_enrolled: self.is_enrolled.unwrap_or(true),
                grade_level,
                homeroom,
                contact,
                emergency_contacts,
                enrolled_classes: vec![],
                advisor,
            }),
            _ => None,
        };
        v.finish(student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_validation_collects_errors() {
        let data = StudentCreateData {
            first_name: Some("Ana".into()),
            grade_level: Some(14),
            email: Some("ana.example.com".into()),
            ..Default::default()
        };
        match data.validate() {
            Err(ServiceError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["lastName", "gradeLevel", "email"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn student_defaults_to_enrolled() {
        let data = StudentCreateData {
            first_name: Some("Ana".into()),
            last_name: Some("Horvat".into()),
            grade_level: Some(0),
            ..Default::default()
        };
        let student = data.validate().expect("valid student");
        assert!(student.is_enrolled);
        assert!(student.enrolled_classes.is_empty());
    }
}
