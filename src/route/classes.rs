use rocket::http::Status;
use rocket::response::status::Created;
use rocket::serde::json::{json, Json, Value};
use rocket::State;

use super::created;
use crate::data::class::db::{
    AssignCourseData, AssignRoomData, ClassCreateData, TemporaryBookingData,
};
use crate::error::ServiceError;
use crate::middleware::paging::PageState;
use crate::resp::document::{class_json, to_json};
use crate::resp::problem::Problem;
use crate::service::{BookingOptions, Scheduler};
use crate::validate::{parse_id, Validator};

/// List classes
#[utoipa::path(
    params(
        ("page" = Option<u32>, Query, description = "zero based page index"),
        ("len" = Option<u32>, Query, description = "page length"),
    ),
    responses(
        (status = 200, description = "Page of classes ordered by id"),
    )
)]
#[get("/classes")]
#[tracing::instrument(skip(scheduler))]
pub async fn class_list(
    paging: PageState,
    scheduler: &State<Scheduler>,
) -> Result<Json<Value>, Problem> {
    let classes = scheduler.list_classes(paging.skip(), paging.limit()).await?;
    Ok(Json(to_json(&classes)?))
}

/// Create a class
///
/// A class code is generated from the name when the body doesn't carry one.
#[utoipa::path(
    request_body = ClassCreateData,
    responses(
        (status = 201, description = "Created class"),
        (status = 400, description = "Invalid body or duplicate code", body = Problem),
        (status = 404, description = "Referenced course doesn't exist", body = Problem),
    )
)]
#[post("/classes", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn class_create(
    data: Json<ClassCreateData>,
    scheduler: &State<Scheduler>,
) -> Result<Created<Json<Value>>, Problem> {
    let class = scheduler.create_class(data.validate()?).await?;
    let location = format!("/api/v1/classes/{}", class.id);
    let details = scheduler.class_details(class).await?;
    created(location, class_json(&details)?)
}

/// Get a class with its teacher, room and course
#[utoipa::path(
    params(("id", description = "class ID")),
    responses(
        (status = 200, description = "Class information"),
        (status = 400, description = "Malformed ID", body = Problem),
        (status = 404, description = "Class doesn't exist", body = Problem),
    )
)]
#[get("/classes/<id>")]
#[tracing::instrument(skip(scheduler))]
pub async fn class_get(id: &str, scheduler: &State<Scheduler>) -> Result<Json<Value>, Problem> {
    let class = scheduler.get_class(parse_id("id", id)?).await?;
    let details = scheduler.class_details(class).await?;
    Ok(Json(class_json(&details)?))
}

/// Delete a class and every reference to it
#[utoipa::path(
    params(("id", description = "class ID")),
    responses(
        (status = 200, description = "Class deleted"),
        (status = 404, description = "Class doesn't exist", body = Problem),
    )
)]
#[delete("/classes/<id>")]
#[tracing::instrument(skip(scheduler))]
pub async fn class_delete(id: &str, scheduler: &State<Scheduler>) -> Result<(), Problem> {
    scheduler.delete_class(id).await?;
    Ok(())
}

/// Move a class and its permanent bookings into a room
#[utoipa::path(
    params(("id", description = "class ID")),
    request_body = AssignRoomData,
    responses(
        (status = 200, description = "Class with room populated"),
        (status = 400, description = "Malformed ID or room conflict", body = Problem),
        (status = 404, description = "Class or room doesn't exist", body = Problem),
    )
)]
#[put("/classes/<id>/assign-room", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn class_assign_room(
    id: &str,
    data: Json<AssignRoomData>,
    scheduler: &State<Scheduler>,
) -> Result<Json<Value>, Problem> {
    let mut v = Validator::new();
    let room = v.required("roomId", &data.room_id);
    let room = v.finish(room)?;

    let class = scheduler.assign_room_to_class(id, room).await?;
    let details = scheduler.class_details(class).await?;
    Ok(Json(class_json(&details)?))
}

/// Set the course of a class
#[utoipa::path(
    params(("id", description = "class ID")),
    request_body = AssignCourseData,
    responses(
        (status = 200, description = "Class with course populated"),
        (status = 400, description = "Malformed ID", body = Problem),
        (status = 404, description = "Class or course doesn't exist", body = Problem),
    )
)]
#[put("/classes/<id>/assign-course", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn class_assign_course(
    id: &str,
    data: Json<AssignCourseData>,
    scheduler: &State<Scheduler>,
) -> Result<Json<Value>, Problem> {
    let mut v = Validator::new();
    let course = v.required("courseId", &data.course_id);
    let course = v.finish(course)?;

    let class = scheduler.assign_course_to_class(id, course).await?;
    let details = scheduler.class_details(class).await?;
    Ok(Json(class_json(&details)?))
}

/// Book a room for a class temporarily
///
/// The booking remembers the class' permanent room, the class itself is
/// left unchanged. Unknown rooms and classes are reported as bad requests.
#[utoipa::path(
    params(("class_id", description = "class ID")),
    request_body = TemporaryBookingData,
    responses(
        (status = 200, description = "Confirmation with the created occupancy entry"),
        (
            status = 400,
            description = "Invalid body, room conflict or unknown room or class",
            body = Problem
        ),
    )
)]
#[post("/classes/<class_id>/temporary-bookings", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn class_temporary_booking(
    class_id: &str,
    data: Json<TemporaryBookingData>,
    scheduler: &State<Scheduler>,
) -> Result<Json<Value>, Problem> {
    let booking = data.validate()?;
    let entry = scheduler
        .book_room(
            &booking.room.to_hex(),
            class_id,
            booking.slot,
            BookingOptions::temporary(booking.reason, booking.period),
        )
        .await
        .map_err(|e| {
            let not_found = matches!(e, ServiceError::NotFound { .. });
            let mut problem = Problem::from(e);
            if not_found {
                problem.status = Status::BadRequest;
            }
            problem
        })?;

    Ok(Json(json!({
        "message": "Temporary booking created.",
        "booking": to_json(&entry)?,
    })))
}
