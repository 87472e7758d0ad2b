//! Persistence of the school collections.
//!
//! [`SchoolStore`] covers single document reads and writes, [`AssignmentTx`]
//! groups the writes that have to change both sides of a relationship
//! together.

use bson::oid::ObjectId;

use crate::data::class::{Class, ClassEnrollment, CLASS_COLLECTION_NAME};
use crate::data::code::CodePrefix;
use crate::data::course::{Course, COURSE_COLLECTION_NAME};
use crate::data::room::{OccupancyEntry, Room, ROOM_COLLECTION_NAME};
use crate::data::student::{Student, STUDENT_COLLECTION_NAME};
use crate::data::teacher::{Teacher, TEACHER_COLLECTION_NAME};
use crate::error::ServiceError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Class,
    Student,
    Teacher,
    Room,
    Course,
}

impl Entity {
    pub fn name(self) -> &'static str {
        match self {
            Entity::Class => "class",
            Entity::Student => "student",
            Entity::Teacher => "teacher",
            Entity::Room => "room",
            Entity::Course => "course",
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Entity::Class => CLASS_COLLECTION_NAME,
            Entity::Student => STUDENT_COLLECTION_NAME,
            Entity::Teacher => TEACHER_COLLECTION_NAME,
            Entity::Room => ROOM_COLLECTION_NAME,
            Entity::Course => COURSE_COLLECTION_NAME,
        }
    }

    pub fn not_found(self, id: ObjectId) -> ServiceError {
        ServiceError::not_found(self.name(), id)
    }
}

#[rocket::async_trait]
pub trait SchoolStore: Send + Sync {
    /// Starts a multi-document transaction.
    async fn begin(&self) -> Result<Box<dyn AssignmentTx>, ServiceError>;

    async fn class(&self, id: ObjectId) -> Result<Option<Class>, ServiceError>;
    async fn student(&self, id: ObjectId) -> Result<Option<Student>, ServiceError>;
    async fn teacher(&self, id: ObjectId) -> Result<Option<Teacher>, ServiceError>;
    async fn room(&self, id: ObjectId) -> Result<Option<Room>, ServiceError>;
    async fn course(&self, id: ObjectId) -> Result<Option<Course>, ServiceError>;

    /// Classes ordered by id.
    async fn classes(&self, skip: u64, limit: i64) -> Result<Vec<Class>, ServiceError>;
    async fn classes_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Class>, ServiceError>;

    /// Every stored code matching `prefix`'s pattern.
    async fn issued_codes(&self, prefix: &CodePrefix) -> Result<Vec<String>, ServiceError>;

    /// Inserts fail with [`ServiceError::DuplicateKey`] when a unique field
    /// is already taken.
    async fn insert_class(&self, class: &Class) -> Result<(), ServiceError>;
    async fn insert_student(&self, student: &Student) -> Result<(), ServiceError>;
    async fn insert_teacher(&self, teacher: &Teacher) -> Result<(), ServiceError>;
    async fn insert_room(&self, room: &Room) -> Result<(), ServiceError>;
    async fn insert_course(&self, course: &Course) -> Result<(), ServiceError>;

    async fn set_class_course(&self, class: ObjectId, course: ObjectId) -> Result<(), ServiceError>;
}

/// Writes that either all become visible on [`commit`](AssignmentTx::commit)
/// or none do.
#[rocket::async_trait]
pub trait AssignmentTx: Send {
    async fn class(&mut self, id: ObjectId) -> Result<Option<Class>, ServiceError>;
    async fn student(&mut self, id: ObjectId) -> Result<Option<Student>, ServiceError>;
    async fn teacher(&mut self, id: ObjectId) -> Result<Option<Teacher>, ServiceError>;
    async fn room(&mut self, id: ObjectId) -> Result<Option<Room>, ServiceError>;

    async fn set_class_teacher(
        &mut self,
        class: ObjectId,
        teacher: Option<ObjectId>,
    ) -> Result<(), ServiceError>;
    async fn set_class_room(
        &mut self,
        class: ObjectId,
        room: Option<ObjectId>,
    ) -> Result<(), ServiceError>;

    /// Adds `class` to `Teacher.classes` unless it's already there.
    async fn add_teacher_class(
        &mut self,
        teacher: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError>;
    async fn remove_teacher_class(
        &mut self,
        teacher: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError>;

    /// Adds `class` to `Student.enrolledClasses` unless it's already there.
    async fn add_student_class(
        &mut self,
        student: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError>;
    /// Adds `enrollment` to `Class.students` unless the student is already there.
    async fn add_class_student(
        &mut self,
        class: ObjectId,
        enrollment: &ClassEnrollment,
    ) -> Result<(), ServiceError>;

    async fn push_occupancy(
        &mut self,
        room: ObjectId,
        entry: &OccupancyEntry,
    ) -> Result<(), ServiceError>;
    /// Drops the permanent bookings `class` holds in `room`.
    async fn remove_permanent_bookings(
        &mut self,
        room: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError>;

    /// Removes every reference other documents hold to `class`.
    async fn unlink_class(&mut self, class: ObjectId) -> Result<(), ServiceError>;
    /// Removes every reference other documents hold to `student`.
    async fn unlink_student(&mut self, student: ObjectId) -> Result<(), ServiceError>;
    /// Removes every reference other documents hold to `teacher`.
    async fn unlink_teacher(&mut self, teacher: ObjectId) -> Result<(), ServiceError>;

    /// Returns whether a document was deleted.
    async fn delete(&mut self, entity: Entity, id: ObjectId) -> Result<bool, ServiceError>;

    async fn commit(self: Box<Self>) -> Result<(), ServiceError>;
    async fn abort(self: Box<Self>) -> Result<(), ServiceError>;
}
