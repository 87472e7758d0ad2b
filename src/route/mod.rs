use std::collections::BTreeMap;

use rocket::response::status::Created;
use rocket::serde::json::{Json, Value};
use rocket::{Build, Catcher, Rocket, Route};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod catchers;
pub mod classes;
pub mod courses;
pub mod rooms;
pub mod students;
pub mod teachers;

use classes::*;
use courses::*;
use rooms::*;
use students::*;
use teachers::*;

use crate::data::class::db::{
    AssignCourseData, AssignRoomData, ClassCreateData, SlotData, TemporaryBookingData,
};
use crate::data::course::CourseCreateData;
use crate::data::room::db::{BookingData, RoomCreateData};
use crate::data::student::db::{EmergencyContactData, StudentCreateData};
use crate::data::teacher::db::{AssignTargetData, TeacherCreateData};
use crate::resp::problem::Problem;
use crate::service::NumberPreview;

#[derive(OpenApi)]
#[openapi(
    paths(
        class_list,
        class_create,
        class_get,
        class_delete,
        class_assign_room,
        class_assign_course,
        class_temporary_booking,
        student_create,
        student_last_number,
        student_get,
        student_delete,
        student_assign,
        teacher_create,
        teacher_last_number,
        teacher_get,
        teacher_delete,
        teacher_assign,
        room_create,
        room_get,
        room_book,
        room_conflicts,
        course_create,
        course_get
    ),
    components(schemas(
        SlotData,
        ClassCreateData,
        AssignRoomData,
        AssignCourseData,
        TemporaryBookingData,
        EmergencyContactData,
        StudentCreateData,
        TeacherCreateData,
        AssignTargetData,
        RoomCreateData,
        BookingData,
        CourseCreateData,
        NumberPreview,
        Problem
    )),
    modifiers(&V1_PREFIX)
)]
pub struct ApiDocV1;

pub struct PathPrefix(pub &'static str);
static V1_PREFIX: PathPrefix = PathPrefix("/api/v1");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

pub(crate) fn created(location: String, body: Value) -> Result<Created<Json<Value>>, Problem> {
    Ok(Created::new(location).body(Json(body)))
}

pub fn api_v1() -> Vec<Route> {
    routes![
        class_list,
        class_create,
        class_get,
        class_delete,
        class_assign_room,
        class_assign_course,
        class_temporary_booking,
        student_create,
        student_last_number,
        student_get,
        student_delete,
        student_assign,
        teacher_create,
        teacher_last_number,
        teacher_get,
        teacher_delete,
        teacher_assign,
        room_create,
        room_get,
        room_book,
        room_conflicts,
        course_create,
        course_get
    ]
}

pub fn json_catchers() -> Vec<Catcher> {
    catchers![
        catchers::bad_request,
        catchers::not_found,
        catchers::unprocessable,
        catchers::internal_error
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api/v1", api_v1())
        .mount(
            "/",
            SwaggerUi::new("/swagger/<_..>").url("/api/v1/openapi.json", ApiDocV1::openapi()),
        )
        .register("/", json_catchers())
}
