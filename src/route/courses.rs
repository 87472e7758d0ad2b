use rocket::response::status::Created;
use rocket::serde::json::{Json, Value};
use rocket::State;

use super::created;
use crate::data::course::CourseCreateData;
use crate::resp::document::to_json;
use crate::resp::problem::Problem;
use crate::service::Scheduler;
use crate::validate::parse_id;

#[utoipa::path(
    request_body = CourseCreateData,
    responses(
        (status = 201, description = "Created course"),
        (status = 400, description = "Invalid body", body = Problem),
    )
)]
#[post("/courses", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn course_create(
    data: Json<CourseCreateData>,
    scheduler: &State<Scheduler>,
) -> Result<Created<Json<Value>>, Problem> {
    let course = scheduler.create_course(data.validate()?).await?;
    created(format!("/api/v1/courses/{}", course.id), to_json(&course)?)
}

#[utoipa::path(
    params(("id", description = "course ID")),
    responses(
        (status = 200, description = "Course information"),
        (status = 404, description = "Course doesn't exist", body = Problem),
    )
)]
#[get("/courses/<id>")]
#[tracing::instrument(skip(scheduler))]
pub async fn course_get(id: &str, scheduler: &State<Scheduler>) -> Result<Json<Value>, Problem> {
    let course = scheduler.get_course(parse_id("id", id)?).await?;
    Ok(Json(to_json(&course)?))
}
