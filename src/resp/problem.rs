use std::fmt::{Display, Formatter};
use std::io::Cursor;

use rocket::http::hyper::header::CONTENT_LANGUAGE;
use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::ServiceError;
use crate::resp::document::to_json;

/// Implements [RFC7807](https://tools.ietf.org/html/rfc7807).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Problem {
    #[serde(skip)]
    pub status: Status,
    pub type_uri: String,
    pub title: String,

    pub detail: Option<String>,

    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            type_uri: "about:blank".to_string(),
            title: "Problem".to_string(),
            detail: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    pub fn new_untyped(status: Status, title: impl ToString) -> Problem {
        Problem {
            status,
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn insert_json_value(&mut self, key: impl ToString, value: Value) -> &mut Problem {
        self.body.insert(key.to_string(), value);
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.title)
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut body = self.body;

        // Following are required by rfc7807
        body.insert(String::from("type"), Value::from(self.type_uri));
        body.insert(String::from("title"), Value::from(self.title));

        if let Some(detail) = self.detail {
            body.insert(String::from("detail"), Value::from(detail));
        }
        // Validation failures carry their own textual status.
        body.entry("status")
            .or_insert_with(|| Value::from(self.status.code));

        let body_string = Value::Object(body).to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::new("application", "problem+json"))
            .raw_header(CONTENT_LANGUAGE.as_str(), "en")
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub mod problems {
    use rocket::http::Status;

    use crate::resp::problem::Problem;

    #[inline]
    pub fn parse_problem() -> Problem {
        Problem::new_untyped(
            Status::BadRequest,
            "There was a problem parsing part of the request.",
        )
    }

    #[inline]
    pub fn unprocessable_problem() -> Problem {
        Problem::new_untyped(
            Status::UnprocessableEntity,
            "Request body doesn't have the expected shape.",
        )
    }

    #[inline]
    pub fn not_found_problem() -> Problem {
        Problem::new_untyped(Status::NotFound, "Requested resource doesn't exist.")
    }

    #[inline]
    pub fn internal_problem() -> Problem {
        Problem::new_untyped(
            Status::InternalServerError,
            "Server failed while processing request.",
        )
    }
}

impl From<ServiceError> for Problem {
    fn from(e: ServiceError) -> Self {
        let message = e.to_string();
        let mut problem = match e {
            ServiceError::Validation(errors) => {
                let mut problem =
                    Problem::new_untyped(Status::BadRequest, "Request validation failed.");
                problem
                    .insert_str("status", "fail")
                    .insert_json_value("errors", to_json(&errors).unwrap_or_default());
                return problem;
            }
            ServiceError::InvalidIdentifier { .. } => {
                Problem::new_untyped(Status::BadRequest, "Malformed identifier.")
            }
            ServiceError::InvalidTarget(_) => {
                Problem::new_untyped(Status::BadRequest, "Unsupported assignment target.")
            }
            ServiceError::NotFound { .. } => {
                Problem::new_untyped(Status::NotFound, "Referenced document doesn't exist.")
            }
            ServiceError::DuplicateKey { .. } => {
                Problem::new_untyped(Status::BadRequest, "Unique value is already taken.")
            }
            ServiceError::RoomConflict { conflicting, .. } => {
                let mut problem =
                    Problem::new_untyped(Status::BadRequest, "Room is already booked.");
                problem.insert_json_value("conflicts", to_json(&conflicting).unwrap_or_default());
                problem
            }
            ServiceError::ClassFull(_) => {
                Problem::new_untyped(Status::BadRequest, "Class is full.")
            }
            ServiceError::Generation { .. } => {
                Problem::new_untyped(Status::InternalServerError, "Unable to generate code.")
            }
            ServiceError::WriteConflict(_) => Problem::new_untyped(
                Status::Conflict,
                "Document was modified by a concurrent request.",
            ),
            ServiceError::Database(e) => Problem::from(e),
            ServiceError::BsonSerialize(_) | ServiceError::BsonDeserialize(_) => {
                Problem::new_untyped(
                    Status::InternalServerError,
                    "An error occurred while processing BSON data.",
                )
            }
        };

        if problem.status.code >= 500 {
            tracing::error!("Request failed: {}", message);
        }
        problem.detail(&message).insert_str("error", &message);
        problem
    }
}

impl From<mongodb::error::Error> for Problem {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        fn mongodb_problem() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "MongoDB failed while processing request.",
            )
        }

        fn access_problem() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "Server was unable to access MongoDB.",
            )
        }

        fn bad_db_request() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "MongoDB was unable to process bad server request.",
            )
        }

        match e.kind.as_ref() {
            ErrorKind::InvalidArgument { .. } => bad_db_request(),
            ErrorKind::Authentication { .. } => access_problem(),
            ErrorKind::BulkWrite(_) => bad_db_request(),
            ErrorKind::Command(_) => bad_db_request(),
            ErrorKind::DnsResolve { .. } => access_problem(),
            ErrorKind::ServerSelection { .. } => access_problem(),
            ErrorKind::InvalidTlsConfig { .. } => access_problem(),
            ErrorKind::IncompatibleServer { .. } => access_problem(),
            ErrorKind::SessionsNotSupported => mongodb_problem()
                .detail("Transactions need a replica set deployment.")
                .clone(),
            ErrorKind::Transaction { .. } => mongodb_problem(),
            _ => mongodb_problem(),
        }
    }
}

impl From<serde_json::Error> for Problem {
    fn from(_: serde_json::Error) -> Self {
        Problem::new_untyped(
            Status::InternalServerError,
            "An error occurred while processing JSON data.",
        )
    }
}

#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;

    use super::*;
    use crate::error::FieldError;

    #[test]
    fn service_errors_map_to_statuses() {
        let id = ObjectId::new();
        let cases = vec![
            (ServiceError::InvalidTarget("rooms".into()), Status::BadRequest),
            (ServiceError::not_found("class", id), Status::NotFound),
            (ServiceError::ClassFull(id), Status::BadRequest),
            (ServiceError::WriteConflict("class".into()), Status::Conflict),
            (
                ServiceError::Generation {
                    kind: "class code",
                    reason: "bad pattern".into(),
                },
                Status::InternalServerError,
            ),
        ];

        for (error, status) in cases {
            let message = error.to_string();
            let problem = Problem::from(error);
            assert_eq!(problem.status, status);
            assert_eq!(problem.body.get("error"), Some(&Value::from(message)));
        }
    }

    #[test]
    fn validation_problem_lists_fields() {
        let problem = Problem::from(ServiceError::Validation(vec![FieldError::new(
            "name",
            "is required",
        )]));

        assert_eq!(problem.status, Status::BadRequest);
        assert_eq!(problem.body["status"], "fail");
        assert_eq!(problem.body["errors"][0]["field"], "name");
        assert_eq!(problem.body["errors"][0]["message"], "is required");
    }
}
