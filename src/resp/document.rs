//! JSON shape of the documents returned by the API.
//!
//! Identifiers are written as plain hex strings, dates as RFC 3339 strings
//! and references are replaced with the documents they point to when those
//! were loaded.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::service::{ClassDetails, StudentDetails};

/// Serializes `value`, turning extended JSON `{"$oid": ".."}` identifiers
/// and `{"$date": ..}` dates into plain strings.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(value)?;
    flatten_ids(&mut value);
    Ok(value)
}

fn flatten_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(flat) = object_id(map).or_else(|| date(map)) {
                *value = Value::String(flat);
                return;
            }
            map.values_mut().for_each(flatten_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(flatten_ids),
        _ => {}
    }
}

fn object_id(map: &Map<String, Value>) -> Option<String> {
    if map.len() != 1 {
        return None;
    }
    map.get("$oid").and_then(Value::as_str).map(str::to_string)
}

fn date(map: &Map<String, Value>) -> Option<String> {
    if map.len() != 1 {
        return None;
    }
    match map.get("$date")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(inner) => {
            let millis = inner.get("$numberLong")?.as_str()?.parse::<i64>().ok()?;
            bson::DateTime::from_millis(millis).try_to_rfc3339_string().ok()
        }
        _ => None,
    }
}

fn populate<T: Serialize>(
    object: &mut Map<String, Value>,
    key: &str,
    document: &Option<T>,
) -> Result<(), serde_json::Error> {
    if let Some(document) = document {
        object.insert(key.to_string(), to_json(document)?);
    }
    Ok(())
}

/// Class with teacher, room and course populated and its active enrollment
/// count.
pub fn class_json(details: &ClassDetails) -> Result<Value, serde_json::Error> {
    let mut value = to_json(&details.class)?;
    if let Value::Object(object) = &mut value {
        populate(object, "teacher", &details.teacher)?;
        populate(object, "room", &details.room)?;
        populate(object, "course", &details.course)?;
        object.insert(
            "currentEnrollment".to_string(),
            Value::from(details.class.current_enrollment()),
        );
    }
    Ok(value)
}

/// Student with enrolled classes populated.
pub fn student_json(details: &StudentDetails) -> Result<Value, serde_json::Error> {
    let mut value = to_json(&details.student)?;
    if let Value::Object(object) = &mut value {
        object.insert("enrolledClasses".to_string(), to_json(&details.classes)?);
    }
    Ok(value)
}
