use std::path::PathBuf;
use thiserror::Error;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::data::room::OccupancyEntry;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Cors(#[from] rocket_cors::Error),
}

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl ToString, message: impl ToString) -> FieldError {
        FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request validation failed")]
    Validation(Vec<FieldError>),
    #[error("'{value}' is not a valid identifier for {field}")]
    InvalidIdentifier { field: String, value: String },
    #[error("can't assign to target type '{0}'")]
    InvalidTarget(String),
    #[error("{entity} '{id}' doesn't exist")]
    NotFound { entity: &'static str, id: ObjectId },
    #[error("{field} '{value}' already exists, try again")]
    DuplicateKey { field: String, value: String },
    #[error("room '{room}' is already booked at the requested time")]
    RoomConflict {
        room: ObjectId,
        conflicting: Vec<OccupancyEntry>,
    },
    #[error("class '{0}' has reached its maximum capacity")]
    ClassFull(ObjectId),
    #[error("unable to generate {kind}: {reason}")]
    Generation { kind: &'static str, reason: String },
    #[error("{0} was modified by a concurrent request")]
    WriteConflict(String),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonSerialize(#[from] bson::ser::Error),
    #[error(transparent)]
    BsonDeserialize(#[from] bson::de::Error),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: ObjectId) -> ServiceError {
        ServiceError::NotFound { entity, id }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, ServiceError::DuplicateKey { .. })
    }
}
