use bson::oid::ObjectId;
use regex::Regex;

use crate::data::schedule::{ClockTime, ScheduleSlot, Weekday};
use crate::error::{FieldError, ServiceError};

lazy_static! {
    static ref OBJECT_ID: Regex = Regex::new(r"^[a-f\d]{24}$").unwrap();
}

/// Parses a 24 character lowercase hex identifier.
pub fn parse_id(field: impl ToString, raw: impl AsRef<str>) -> Result<ObjectId, ServiceError> {
    let raw = raw.as_ref();
    let invalid = || ServiceError::InvalidIdentifier {
        field: field.to_string(),
        value: raw.to_string(),
    };

    if !OBJECT_ID.is_match(raw) {
        return Err(invalid());
    }
    ObjectId::parse_str(raw).map_err(|_| invalid())
}

/// Collects field errors of a request body so they can be reported together.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Validator {
        Validator::default()
    }

    pub fn reject(&mut self, field: impl ToString, message: impl ToString) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn required<'a, T>(&mut self, field: &str, value: &'a Option<T>) -> Option<&'a T> {
        if value.is_none() {
            self.reject(field, "Field is required.");
        }
        value.as_ref()
    }

    pub fn text(
        &mut self,
        field: &str,
        value: &Option<String>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        let value = self.required(field, value)?.trim();
        let length = value.chars().count();
        if length < min || length > max {
            self.reject(
                field,
                format!("Must be between {} and {} characters long.", min, max),
            );
            return None;
        }
        Some(value.to_string())
    }

    pub fn optional_text(
        &mut self,
        field: &str,
        value: &Option<String>,
        max: usize,
    ) -> Option<String> {
        match value {
            Some(v) if v.chars().count() > max => {
                self.reject(field, format!("Can't be longer than {} characters.", max));
                None
            }
            Some(v) => Some(v.trim().to_string()),
            None => None,
        }
    }

    pub fn id(&mut self, field: &str, value: &Option<String>) -> Option<ObjectId> {
        let raw = self.required(field, value)?;
        self.optional_id(field, &Some(raw.clone()))
    }

    pub fn optional_id(&mut self, field: &str, value: &Option<String>) -> Option<ObjectId> {
        let raw = value.as_ref()?;
        match parse_id(field, raw) {
            Ok(id) => Some(id),
            Err(_) => {
                self.reject(field, "Must be a 24 character hex identifier.");
                None
            }
        }
    }

    pub fn day(&mut self, field: &str, value: &Option<String>) -> Option<Weekday> {
        match self.required(field, value)?.parse() {
            Ok(day) => Some(day),
            Err(message) => {
                self.reject(field, message);
                None
            }
        }
    }

    pub fn time(&mut self, field: &str, value: &Option<String>) -> Option<ClockTime> {
        match self.required(field, value)?.parse() {
            Ok(time) => Some(time),
            Err(message) => {
                self.reject(field, message);
                None
            }
        }
    }

    /// Validates a `{day, startTime, endTime}` triple, with field names
    /// prefixed by `prefix` (e.g. `schedule[0].`).
    pub fn slot(
        &mut self,
        prefix: &str,
        day: &Option<String>,
        start_time: &Option<String>,
        end_time: &Option<String>,
    ) -> Option<ScheduleSlot> {
        let day = self.day(&format!("{}day", prefix), day);
        let start = self.time(&format!("{}startTime", prefix), start_time);
        let end = self.time(&format!("{}endTime", prefix), end_time);

        let (day, start, end) = (day?, start?, end?);
        if start >= end {
            self.reject(
                format!("{}endTime", prefix),
                "End time must be after start time.",
            );
            return None;
        }
        Some(ScheduleSlot::new(day, start, end))
    }

    pub fn finish<T>(self, value: Option<T>) -> Result<T, ServiceError> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(ServiceError::Validation(self.errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_must_be_lowercase_hex() {
        assert!(parse_id("id", "65a1f0c2e4b0a1b2c3d4e5f6").is_ok());
        assert!(parse_id("id", "65A1F0C2E4B0A1B2C3D4E5F6").is_err());
        assert!(parse_id("id", "65a1f0c2e4b0a1b2c3d4e5").is_err());
        assert!(parse_id("id", "not-an-id").is_err());
    }

    #[test]
    fn slot_reports_every_bad_field() {
        let mut v = Validator::new();
        let slot = v.slot("", &Some("Someday".into()), &Some("9:00".into()), &None);
        assert!(slot.is_none());

        let errors = match v.finish(slot) {
            Err(ServiceError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["day", "startTime", "endTime"]);
    }

    #[test]
    fn slot_rejects_reversed_times() {
        let mut v = Validator::new();
        let slot = v.slot(
            "schedule[1].",
            &Some("Mon".into()),
            &Some("10:00".into()),
            &Some("09:00".into()),
        );
        assert!(slot.is_none());
        match v.finish(slot) {
            Err(ServiceError::Validation(errors)) => {
                assert_eq!(errors[0].field, "schedule[1].endTime")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
