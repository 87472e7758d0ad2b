use rocket::response::status::Created;
use rocket::serde::json::{Json, Value};
use rocket::State;

use super::created;
use crate::data::teacher::db::{AssignTargetData, TeacherCreateData};
use crate::resp::document::{class_json, to_json};
use crate::resp::problem::Problem;
use crate::service::{NumberPreview, Scheduler};
use crate::validate::parse_id;

/// Register a teacher
#[utoipa::path(
    request_body = TeacherCreateData,
    responses(
        (status = 201, description = "Teacher with a generated teacher number"),
        (status = 400, description = "Invalid body", body = Problem),
    )
)]
#[post("/teachers", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn teacher_create(
    data: Json<TeacherCreateData>,
    scheduler: &State<Scheduler>,
) -> Result<Created<Json<Value>>, Problem> {
    let teacher = scheduler.create_teacher(data.validate()?).await?;
    created(format!("/api/v1/teachers/{}", teacher.id), to_json(&teacher)?)
}

/// Last issued and next teacher number
#[utoipa::path(
    responses(
        (status = 200, description = "Teacher number preview", body = NumberPreview),
    )
)]
#[get("/teachers/lastTeacherNumber")]
#[tracing::instrument(skip(scheduler))]
pub async fn teacher_last_number(
    scheduler: &State<Scheduler>,
) -> Result<Json<NumberPreview>, Problem> {
    Ok(Json(scheduler.next_teacher_number().await?))
}

#[utoipa::path(
    params(("id", description = "teacher ID")),
    responses(
        (status = 200, description = "Teacher information"),
        (status = 400, description = "Malformed ID", body = Problem),
        (status = 404, description = "Teacher doesn't exist", body = Problem),
    )
)]
#[get("/teachers/<id>")]
#[tracing::instrument(skip(scheduler))]
pub async fn teacher_get(id: &str, scheduler: &State<Scheduler>) -> Result<Json<Value>, Problem> {
    let teacher = scheduler.get_teacher(parse_id("id", id)?).await?;
    Ok(Json(to_json(&teacher)?))
}

#[utoipa::path(
    params(("id", description = "teacher ID")),
    responses(
        (status = 200, description = "Teacher deleted"),
        (status = 404, description = "Teacher doesn't exist", body = Problem),
    )
)]
#[delete("/teachers/<id>")]
#[tracing::instrument(skip(scheduler))]
pub async fn teacher_delete(id: &str, scheduler: &State<Scheduler>) -> Result<(), Problem> {
    scheduler.delete_teacher(id).await?;
    Ok(())
}

/// Make a teacher the teacher of a class
///
/// The class is taken away from the teacher that held it before.
#[utoipa::path(
    params(("id", description = "teacher ID")),
    request_body = AssignTargetData,
    responses(
        (status = 200, description = "Class with teacher populated"),
        (status = 400, description = "Malformed ID or unsupported target", body = Problem),
        (status = 404, description = "Teacher or class doesn't exist", body = Problem),
        (status = 409, description = "Concurrent modification", body = Problem),
    )
)]
#[put("/teachers/<id>/assign", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn teacher_assign(
    id: &str,
    data: Json<AssignTargetData>,
    scheduler: &State<Scheduler>,
) -> Result<Json<Value>, Problem> {
    let (target_type, target_id) = data.validate()?;
    let class = scheduler
        .assign_teacher_to_class(id, target_type, target_id)
        .await?;
    let details = scheduler.class_details(class).await?;
    Ok(Json(class_json(&details)?))
}
