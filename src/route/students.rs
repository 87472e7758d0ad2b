use rocket::response::status::Created;
use rocket::serde::json::{Json, Value};
use rocket::State;

use super::created;
use crate::data::student::db::StudentCreateData;
use crate::data::teacher::db::AssignTargetData;
use crate::resp::document::student_json;
use crate::resp::problem::Problem;
use crate::service::{NumberPreview, Scheduler};
use crate::validate::parse_id;

/// Register a student
#[utoipa::path(
    request_body = StudentCreateData,
    responses(
        (status = 201, description = "Student with a generated student number"),
        (status = 400, description = "Invalid body", body = Problem),
        (
            status = 404,
            description = "Referenced homeroom or advisor doesn't exist",
            body = Problem
        ),
    )
)]
#[post("/students", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn student_create(
    data: Json<StudentCreateData>,
    scheduler: &State<Scheduler>,
) -> Result<Created<Json<Value>>, Problem> {
    let student = scheduler.create_student(data.validate()?).await?;
    let location = format!("/api/v1/students/{}", student.id);
    let details = scheduler.student_details(student).await?;
    created(location, student_json(&details)?)
}

/// Last issued and next student number
#[utoipa::path(
    responses(
        (status = 200, description = "Student number preview", body = NumberPreview),
    )
)]
#[get("/students/lastStudentNumber")]
#[tracing::instrument(skip(scheduler))]
pub async fn student_last_number(
    scheduler: &State<Scheduler>,
) -> Result<Json<NumberPreview>, Problem> {
    Ok(Json(scheduler.next_student_number().await?))
}

/// Get a student with enrolled classes
#[utoipa::path(
    params(("id", description = "student ID")),
    responses(
        (status = 200, description = "Student information"),
        (status = 400, description = "Malformed ID", body = Problem),
        (status = 404, description = "Student doesn't exist", body = Problem),
    )
)]
#[get("/students/<id>")]
#[tracing::instrument(skip(scheduler))]
pub async fn student_get(id: &str, scheduler: &State<Scheduler>) -> Result<Json<Value>, Problem> {
    let student = scheduler.get_student(parse_id("id", id)?).await?;
    let details = scheduler.student_details(student).await?;
    Ok(Json(student_json(&details)?))
}

/// Delete a student and every reference to it
#[utoipa::path(
    params(("id", description = "student ID")),
    responses(
        (status = 200, description = "Student deleted"),
        (status = 404, description = "Student doesn't exist", body = Problem),
    )
)]
#[delete("/students/<id>")]
#[tracing::instrument(skip(scheduler))]
pub async fn student_delete(id: &str, scheduler: &State<Scheduler>) -> Result<(), Problem> {
    scheduler.delete_student(id).await?;
    Ok(())
}

/// Enroll a student in a class
#[utoipa::path(
    params(("id", description = "student ID")),
    request_body = AssignTargetData,
    responses(
        (status = 200, description = "Student with enrolled classes populated"),
        (
            status = 400,
            description = "Malformed ID, unsupported target or full class",
            body = Problem
        ),
        (status = 404, description = "Student or class doesn't exist", body = Problem),
    )
)]
#[put("/students/<id>/assign", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn student_assign(
    id: &str,
    data: Json<AssignTargetData>,
    scheduler: &State<Scheduler>,
) -> Result<Json<Value>, Problem> {
    let (target_type, target_id) = data.validate()?;
    let student = scheduler
        .assign_student_to_class(id, target_type, target_id)
        .await?;
    let details = scheduler.student_details(student).await?;
    Ok(Json(student_json(&details)?))
}
