use bson::oid::ObjectId;
use serde::Serialize;

use super::{finish_tx, Scheduler};
use crate::data::room::{ExceptionDetails, OccupancyEntry};
use crate::data::schedule::ScheduleSlot;
use crate::error::ServiceError;
use crate::store::{AssignmentTx, Entity};
use crate::validate::parse_id;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub conflicts: Vec<OccupancyEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingOptions {
    /// Exception bookings keep track of the class' permanent room.
    pub temporary: bool,
    pub reason: Option<String>,
    pub period: Option<String>,
}

impl BookingOptions {
    pub fn permanent(period: Option<String>) -> BookingOptions {
        BookingOptions {
            temporary: false,
            reason: None,
            period,
        }
    }

    pub fn temporary(reason: impl Into<String>, period: Option<String>) -> BookingOptions {
        BookingOptions {
            temporary: true,
            reason: Some(reason.into()),
            period,
        }
    }
}

async fn book(
    tx: &mut dyn AssignmentTx,
    room_id: ObjectId,
    class_id: ObjectId,
    slot: ScheduleSlot,
    options: BookingOptions,
) -> Result<OccupancyEntry, ServiceError> {
    let room = tx
        .room(room_id)
        .await?
        .ok_or_else(|| Entity::Room.not_found(room_id))?;
    let class = tx
        .class(class_id)
        .await?
        .ok_or_else(|| Entity::Class.not_found(class_id))?;

    let conflicting = room.conflicts(&slot);
    if !conflicting.is_empty() {
        return Err(ServiceError::RoomConflict {
            room: room.id,
            conflicting,
        });
    }

    let exception_details = options.temporary.then(|| ExceptionDetails {
        reason: options.reason.unwrap_or_default(),
        original_room: class.room,
    });
    let entry = OccupancyEntry {
        period: options.period,
        schedule: slot,
        class: class.id,
        is_temporary: options.temporary,
        exception_details,
    };
    tx.push_occupancy(room.id, &entry).await?;
    Ok(entry)
}

impl Scheduler {
    /// Active bookings of a room overlapping `slot`. Never writes.
    pub async fn check_room_conflict(
        &self,
        room_id: &str,
        slot: &ScheduleSlot,
    ) -> Result<ConflictReport, ServiceError> {
        let room = self.get_room(parse_id("roomId", room_id)?).await?;
        let conflicts = room.conflicts(slot);
        Ok(ConflictReport {
            has_conflict: !conflicts.is_empty(),
            conflicts,
        })
    }

    /// Adds an occupancy entry for `class_id` to the room unless an active
    /// booking on the same day overlaps `slot`.
    pub async fn book_room(
        &self,
        room_id: &str,
        class_id: &str,
        slot: ScheduleSlot,
        options: BookingOptions,
    ) -> Result<OccupancyEntry, ServiceError> {
        let room_id = parse_id("roomId", room_id)?;
        let class_id = parse_id("classId", class_id)?;

        let mut tx = self.store.begin().await?;
        let result = book(tx.as_mut(), room_id, class_id, slot, options).await;
        let entry = finish_tx(tx, "book_room", result).await?;

        tracing::info!(
            "Booked room {} for class {} on {:?} {}-{}{}",
            room_id,
            class_id,
            entry.schedule.day,
            entry.schedule.start_time,
            entry.schedule.end_time,
            if entry.is_temporary { " (temporary)" } else { "" }
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schedule::Weekday;
    use crate::service::test_support::*;
    use crate::store::{MemoryStore, SchoolStore};

    async fn setup(store: &MemoryStore) -> (Scheduler, String, String) {
        let scheduler = scheduler(store);
        let room = scheduler.create_room(new_room("B-12")).await.unwrap();
        let class = scheduler.create_class(new_class("Physics")).await.unwrap();
        scheduler
            .book_room(
                &room.id.to_hex(),
                &class.id.to_hex(),
                slot(Weekday::Mon, "09:00", "10:00"),
                BookingOptions::default(),
            )
            .await
            .expect("first booking");
        (scheduler, room.id.to_hex(), class.id.to_hex())
    }

    #[rocket::async_test]
    async fn overlapping_booking_is_rejected() {
        let store = MemoryStore::new();
        let (scheduler, room, class) = setup(&store).await;

        let err = scheduler
            .book_room(
                &room,
                &class,
                slot(Weekday::Mon, "09:30", "10:30"),
                BookingOptions::default(),
            )
            .await
            .expect_err("overlap accepted");
        match err {
            ServiceError::RoomConflict { conflicting, .. } => {
                assert_eq!(conflicting.len(), 1);
                assert_eq!(conflicting[0].schedule, slot(Weekday::Mon, "09:00", "10:00"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let room = store.room(parse_id("roomId", &room).unwrap()).await.unwrap().unwrap();
        assert_eq!(room.current_occupancy.len(), 1);
    }

    #[rocket::async_test]
    async fn back_to_back_and_other_day_are_accepted() {
        let store = MemoryStore::new();
        let (scheduler, room, class) = setup(&store).await;

        scheduler
            .book_room(
                &room,
                &class,
                slot(Weekday::Mon, "10:00", "11:00"),
                BookingOptions::default(),
            )
            .await
            .expect("back-to-back booking");
        scheduler
            .book_room(
                &room,
                &class,
                slot(Weekday::Tue, "09:30", "10:30"),
                BookingOptions::default(),
            )
            .await
            .expect("other day booking");

        let room = store.room(parse_id("roomId", &room).unwrap()).await.unwrap().unwrap();
        assert_eq!(room.current_occupancy.len(), 3);
    }

    #[rocket::async_test]
    async fn containing_interval_conflicts() {
        let store = MemoryStore::new();
        let (scheduler, room, _) = setup(&store).await;

        let report = scheduler
            .check_room_conflict(&room, &slot(Weekday::Mon, "08:00", "11:00"))
            .await
            .unwrap();
        assert!(report.has_conflict);

        let report = scheduler
            .check_room_conflict(&room, &slot(Weekday::Mon, "10:00", "10:30"))
            .await
            .unwrap();
        assert_eq!(report, ConflictReport { has_conflict: false, conflicts: vec![] });
    }

    #[rocket::async_test]
    async fn temporary_booking_records_original_room() {
        let store = MemoryStore::new();
        let (scheduler, room, _) = setup(&store).await;

        let home = scheduler.create_room(new_room("A-01")).await.unwrap();
        let class = scheduler.create_class(new_class("History")).await.unwrap();
        scheduler
            .assign_room_to_class(&class.id.to_hex(), &home.id.to_hex())
            .await
            .unwrap();

        let entry = scheduler
            .book_room(
                &room,
                &class.id.to_hex(),
                slot(Weekday::Wed, "12:00", "13:00"),
                BookingOptions::temporary("Lab renovation", Some("3".into())),
            )
            .await
            .unwrap();

        assert!(entry.is_temporary);
        assert_eq!(
            entry.exception_details,
            Some(ExceptionDetails {
                reason: "Lab renovation".into(),
                original_room: Some(home.id),
            })
        );
        // The class keeps its permanent room.
        assert_eq!(scheduler.get_class(class.id).await.unwrap().room, Some(home.id));
    }

    #[rocket::async_test]
    async fn unknown_room_and_malformed_ids() {
        let store = MemoryStore::new();
        let (scheduler, _, class) = setup(&store).await;

        let err = scheduler
            .book_room(
                &ObjectId::new().to_hex(),
                &class,
                slot(Weekday::Fri, "09:00", "10:00"),
                BookingOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "room", .. }));

        let err = scheduler
            .check_room_conflict("not-an-id", &slot(Weekday::Fri, "09:00", "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidIdentifier { .. }));
    }
}
