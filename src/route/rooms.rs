use rocket::response::status::Created;
use rocket::serde::json::{Json, Value};
use rocket::State;

use super::created;
use crate::data::room::db::{BookingData, ConflictQuery, RoomCreateData};
use crate::resp::document::to_json;
use crate::resp::problem::Problem;
use crate::service::{BookingOptions, Scheduler};
use crate::validate::parse_id;

#[utoipa::path(
    request_body = RoomCreateData,
    responses(
        (status = 201, description = "Created room"),
        (status = 400, description = "Invalid body", body = Problem),
    )
)]
#[post("/rooms", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn room_create(
    data: Json<RoomCreateData>,
    scheduler: &State<Scheduler>,
) -> Result<Created<Json<Value>>, Problem> {
    let room = scheduler.create_room(data.validate()?).await?;
    created(format!("/api/v1/rooms/{}", room.id), to_json(&room)?)
}

/// Get a room with its occupancy
#[utoipa::path(
    params(("id", description = "room ID")),
    responses(
        (status = 200, description = "Room information"),
        (status = 400, description = "Malformed ID", body = Problem),
        (status = 404, description = "Room doesn't exist", body = Problem),
    )
)]
#[get("/rooms/<id>")]
#[tracing::instrument(skip(scheduler))]
pub async fn room_get(id: &str, scheduler: &State<Scheduler>) -> Result<Json<Value>, Problem> {
    let room = scheduler.get_room(parse_id("id", id)?).await?;
    Ok(Json(to_json(&room)?))
}

/// Permanently book a room for a class
#[utoipa::path(
    params(("id", description = "room ID")),
    request_body = BookingData,
    responses(
        (status = 201, description = "Created occupancy entry"),
        (status = 400, description = "Invalid body or room conflict", body = Problem),
        (status = 404, description = "Room or class doesn't exist", body = Problem),
    )
)]
#[post("/rooms/<id>/bookings", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(scheduler))]
pub async fn room_book(
    id: &str,
    data: Json<BookingData>,
    scheduler: &State<Scheduler>,
) -> Result<Created<Json<Value>>, Problem> {
    let (class, slot, period) = data.validate()?;
    let entry = scheduler
        .book_room(id, &class.to_hex(), slot, BookingOptions::permanent(period))
        .await?;
    created(format!("/api/v1/rooms/{}", id), to_json(&entry)?)
}

/// Check whether a time slot is free
#[utoipa::path(
    params(("id", description = "room ID"), ConflictQuery),
    responses(
        (status = 200, description = "Conflicting active bookings"),
        (status = 400, description = "Invalid query", body = Problem),
        (status = 404, description = "Room doesn't exist", body = Problem),
    )
)]
#[get("/rooms/<id>/conflicts?<query..>")]
#[tracing::instrument(skip(scheduler))]
pub async fn room_conflicts(
    id: &str,
    query: ConflictQuery,
    scheduler: &State<Scheduler>,
) -> Result<Json<Value>, Problem> {
    let slot = query.validate()?;
    let report = scheduler.check_room_conflict(id, &slot).await?;
    Ok(Json(to_json(&report)?))
}
