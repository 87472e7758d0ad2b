//! Operations that change both sides of a relationship.
//!
//! Each one checks its inputs, then does all of its writes in a single
//! transaction. A failure part way aborts the transaction, so neither side
//! ever points at the other alone.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use super::{finish_tx, Scheduler};
use crate::data::class::{Class, ClassEnrollment, EnrollmentStatus};
use crate::data::room::OccupancyEntry;
use crate::data::student::Student;
use crate::error::ServiceError;
use crate::store::{AssignmentTx, Entity};
use crate::validate::parse_id;

/// The only collection students and teachers can be assigned to.
pub const CLASS_TARGET: &str = "classes";

fn check_target(target_type: &str) -> Result<(), ServiceError> {
    if target_type != CLASS_TARGET {
        return Err(ServiceError::InvalidTarget(target_type.to_string()));
    }
    Ok(())
}

async fn tx_class(tx: &mut dyn AssignmentTx, id: ObjectId) -> Result<Class, ServiceError> {
    tx.class(id).await?.ok_or_else(|| Entity::Class.not_found(id))
}

async fn set_teacher(
    tx: &mut dyn AssignmentTx,
    teacher: ObjectId,
    class_id: ObjectId,
) -> Result<Class, ServiceError> {
    let class = tx_class(tx, class_id).await?;
    if let Some(previous) = class.teacher.filter(|it| *it != teacher) {
        tracing::debug!("Class {} moves from teacher {} to {}", class_id, previous, teacher);
        tx.remove_teacher_class(previous, class_id).await?;
    }
    tx.set_class_teacher(class_id, Some(teacher)).await?;
    tx.add_teacher_class(teacher, class_id).await?;
    tx_class(tx, class_id).await
}

async fn enroll(
    tx: &mut dyn AssignmentTx,
    student_id: ObjectId,
    class_id: ObjectId,
    now: DateTime<Utc>,
) -> Result<Student, ServiceError> {
    let class = tx_class(tx, class_id).await?;
    if !class.is_enrolled(student_id) && class.is_full() {
        return Err(ServiceError::ClassFull(class_id));
    }

    tx.add_student_class(student_id, class_id).await?;
    let enrollment = ClassEnrollment {
        student: student_id,
        enrollment_date: now,
        status: EnrollmentStatus::Active,
    };
    tx.add_class_student(class_id, &enrollment).await?;

    tx.student(student_id)
        .await?
        .ok_or_else(|| Entity::Student.not_found(student_id))
}

async fn move_to_room(
    tx: &mut dyn AssignmentTx,
    class_id: ObjectId,
    room_id: ObjectId,
) -> Result<Class, ServiceError> {
    let class = tx_class(tx, class_id).await?;
    if tx.room(room_id).await?.is_none() {
        return Err(Entity::Room.not_found(room_id));
    }

    if let Some(previous) = class.room.filter(|it| *it != room_id) {
        tx.remove_permanent_bookings(previous, class_id).await?;
    }
    tx.remove_permanent_bookings(room_id, class_id).await?;

    let mut room = tx
        .room(room_id)
        .await?
        .ok_or_else(|| Entity::Room.not_found(room_id))?;
    let mut booked = Vec::new();
    for slot in class.active_slots() {
        let conflicting = room.conflicts(slot);
        if !conflicting.is_empty() {
            return Err(ServiceError::RoomConflict {
                room: room_id,
                conflicting,
            });
        }
        let entry = OccupancyEntry {
            period: None,
            schedule: slot.clone(),
            class: class_id,
            is_temporary: false,
            exception_details: None,
        };
        room.current_occupancy.push(entry.clone());
        booked.push(entry);
    }

    for entry in &booked {
        tx.push_occupancy(room_id, entry).await?;
    }
    tx.set_class_room(class_id, Some(room_id)).await?;
    tx_class(tx, class_id).await
}

async fn remove(
    tx: &mut dyn AssignmentTx,
    entity: Entity,
    id: ObjectId,
) -> Result<(), ServiceError> {
    if !tx.delete(entity, id).await? {
        return Err(entity.not_found(id));
    }
    match entity {
        Entity::Class => tx.unlink_class(id).await,
        Entity::Student => tx.unlink_student(id).await,
        Entity::Teacher => tx.unlink_teacher(id).await,
        Entity::Room | Entity::Course => Ok(()),
    }
}

impl Scheduler {
    /// Makes `teacher_id` the teacher of the class, taking the class away
    /// from whoever held it before.
    pub async fn assign_teacher_to_class(
        &self,
        teacher_id: &str,
        target_type: &str,
        class_id: &str,
    ) -> Result<Class, ServiceError> {
        check_target(target_type)?;
        let teacher_id = parse_id("teacherId", teacher_id)?;
        let class_id = parse_id("targetId", class_id)?;
        self.get_teacher(teacher_id).await?;
        self.get_class(class_id).await?;

        let mut tx = self.store.begin().await?;
        let result = set_teacher(tx.as_mut(), teacher_id, class_id).await;
        let class = finish_tx(tx, "assign_teacher_to_class", result).await?;
        tracing::info!("Assigned teacher {} to class {}", teacher_id, class.code);
        Ok(class)
    }

    /// Enrolls the student in the class. Enrolling twice changes nothing.
    pub async fn assign_student_to_class(
        &self,
        student_id: &str,
        target_type: &str,
        class_id: &str,
    ) -> Result<Student, ServiceError> {
        check_target(target_type)?;
        let student_id = parse_id("studentId", student_id)?;
        let class_id = parse_id("targetId", class_id)?;
        self.get_student(student_id).await?;
        self.get_class(class_id).await?;

        let mut tx = self.store.begin().await?;
        let result = enroll(tx.as_mut(), student_id, class_id, self.clock.now()).await;
        let student = finish_tx(tx, "assign_student_to_class", result).await?;
        tracing::info!("Enrolled student {} in class {}", student.student_number, class_id);
        Ok(student)
    }

    /// Moves the class and its permanent bookings to `room_id`.
    pub async fn assign_room_to_class(
        &self,
        class_id: &str,
        room_id: &str,
    ) -> Result<Class, ServiceError> {
        let class_id = parse_id("classId", class_id)?;
        let room_id = parse_id("roomId", room_id)?;
        self.get_class(class_id).await?;
        self.get_room(room_id).await?;

        let mut tx = self.store.begin().await?;
        let result = move_to_room(tx.as_mut(), class_id, room_id).await;
        let class = finish_tx(tx, "assign_room_to_class", result).await?;
        tracing::info!("Assigned room {} to class {}", room_id, class.code);
        Ok(class)
    }

    pub async fn assign_course_to_class(
        &self,
        class_id: &str,
        course_id: &str,
    ) -> Result<Class, ServiceError> {
        let class_id = parse_id("classId", class_id)?;
        let course_id = parse_id("courseId", course_id)?;
        self.get_class(class_id).await?;
        self.get_course(course_id).await?;

        self.store.set_class_course(class_id, course_id).await?;
        tracing::info!("Assigned course {} to class {}", course_id, class_id);
        self.get_class(class_id).await
    }

    async fn delete(&self, entity: Entity, raw_id: &str) -> Result<(), ServiceError> {
        let id = parse_id("id", raw_id)?;

        let mut tx = self.store.begin().await?;
        let result = remove(tx.as_mut(), entity, id).await;
        finish_tx(tx, "delete", result).await?;
        tracing::info!("Deleted {} {}", entity.name(), id);
        Ok(())
    }

    /// Deletes the class and every reference to it.
    pub async fn delete_class(&self, id: &str) -> Result<(), ServiceError> {
        self.delete(Entity::Class, id).await
    }

    /// Deletes the student and every reference to it.
    pub async fn delete_student(&self, id: &str) -> Result<(), ServiceError> {
        self.delete(Entity::Student, id).await
    }

    /// Deletes the teacher and every reference to it.
    pub async fn delete_teacher(&self, id: &str) -> Result<(), ServiceError> {
        self.delete(Entity::Teacher, id).await
    }
}
