//! Scheduling & assignment operations.
//!
//! Every operation re-reads current state from the store; the only
//! all-or-nothing writes are the ones running in an [`AssignmentTx`].

use std::sync::Arc;

use bson::oid::ObjectId;

use crate::clock::Clock;
use crate::data::class::Class;
use crate::data::course::Course;
use crate::data::room::Room;
use crate::data::student::Student;
use crate::data::teacher::Teacher;
use crate::error::ServiceError;
use crate::store::{AssignmentTx, Entity, SchoolStore};

pub mod assign;
pub mod booking;
pub mod codes;

pub use booking::{BookingOptions, ConflictReport};
pub use codes::NumberPreview;

pub const DEFAULT_CODE_ATTEMPTS: u32 = 3;

pub struct Scheduler {
    store: Arc<dyn SchoolStore>,
    clock: Arc<dyn Clock>,
    code_attempts: u32,
}

/// A class with its references resolved.
#[derive(Debug, Clone)]
pub struct ClassDetails {
    pub class: Class,
    pub teacher: Option<Teacher>,
    pub room: Option<Room>,
    pub course: Option<Course>,
}

/// A student with its enrolled classes resolved.
#[derive(Debug, Clone)]
pub struct StudentDetails {
    pub student: Student,
    pub classes: Vec<Class>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn SchoolStore>, clock: Arc<dyn Clock>) -> Scheduler {
        Scheduler {
            store,
            clock,
            code_attempts: DEFAULT_CODE_ATTEMPTS,
        }
    }

    /// Number of codes tried before a duplicate-key failure is reported.
    pub fn with_code_attempts(mut self, attempts: u32) -> Scheduler {
        self.code_attempts = attempts.max(1);
        self
    }

    pub async fn get_class(&self, id: ObjectId) -> Result<Class, ServiceError> {
        self.store
            .class(id)
            .await?
            .ok_or_else(|| Entity::Class.not_found(id))
    }

    pub async fn get_student(&self, id: ObjectId) -> Result<Student, ServiceError> {
        self.store
            .student(id)
            .await?
            .ok_or_else(|| Entity::Student.not_found(id))
    }

    pub async fn get_teacher(&self, id: ObjectId) -> Result<Teacher, ServiceError> {
        self.store
            .teacher(id)
            .await?
            .ok_or_else(|| Entity::Teacher.not_found(id))
    }

    pub async fn get_room(&self, id: ObjectId) -> Result<Room, ServiceError> {
        self.store
            .room(id)
            .await?
            .ok_or_else(|| Entity::Room.not_found(id))
    }

    pub async fn get_course(&self, id: ObjectId) -> Result<Course, ServiceError> {
        self.store
            .course(id)
            .await?
            .ok_or_else(|| Entity::Course.not_found(id))
    }

    /// Classes ordered by id.
    pub async fn list_classes(&self, skip: u64, limit: i64) -> Result<Vec<Class>, ServiceError> {
        self.store.classes(skip, limit).await
    }

    pub async fn create_room(&self, room: Room) -> Result<Room, ServiceError> {
        self.store.insert_room(&room).await?;
        tracing::info!("Created room '{}' ({})", room.name, room.id);
        Ok(room)
    }

    pub async fn create_course(&self, course: Course) -> Result<Course, ServiceError> {
        self.store.insert_course(&course).await?;
        tracing::info!("Created course '{}' ({})", course.name, course.id);
        Ok(course)
    }

    pub async fn class_details(&self, class: Class) -> Result<ClassDetails, ServiceError> {
        let teacher = match class.teacher {
            Some(id) => self.store.teacher(id).await?,
            None => None,
        };
        let room = match class.room {
            Some(id) => self.store.room(id).await?,
            None => None,
        };
        let course = match class.course {
            Some(id) => self.store.course(id).await?,
            None => None,
        };
        Ok(ClassDetails {
            class,
            teacher,
            room,
            course,
        })
    }

    pub async fn student_details(&self, student: Student) -> Result<StudentDetails, ServiceError> {
        let classes = self.store.classes_by_ids(&student.enrolled_classes).await?;
        Ok(StudentDetails { student, classes })
    }
}

/// Commits `tx` when `result` is a success and aborts it otherwise, handing
/// back the original error.
pub(crate) async fn finish_tx<T>(
    tx: Box<dyn AssignmentTx>,
    operation: &str,
    result: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            tracing::debug!("Committed {} transaction", operation);
            Ok(value)
        }
        Err(e) => {
            tracing::warn!("Aborting {} transaction: {}", operation, e);
            if let Err(abort) = tx.abort().await {
                tracing::error!("Unable to abort {} transaction: {}", operation, abort);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use bson::oid::ObjectId;

    use super::Scheduler;
    use crate::clock::FixedClock;
    use crate::data::class::db::NewClass;
    use crate::data::room::Room;
    use crate::data::schedule::{ScheduleSlot, Weekday};
    use crate::data::student::{ContactInfo, Student};
    use crate::data::teacher::{Teacher, TeacherStatus};
    use crate::store::MemoryStore;

    pub fn scheduler(store: &MemoryStore) -> Scheduler {
        Scheduler::new(Arc::new(store.clone()), Arc::new(FixedClock::in_year(2025)))
    }

    pub fn slot(day: Weekday, start: &str, end: &str) -> ScheduleSlot {
        ScheduleSlot::new(day, start.parse().unwrap(), end.parse().unwrap())
    }

    pub fn new_class(name: &str) -> NewClass {
        NewClass {
            name: name.to_string(),
            section: None,
            code: None,
            schedule: vec![],
            course: None,
            max_capacity: 30,
            waitlist_capacity: 0,
            is_extracurricular: false,
        }
    }

    pub fn new_student(first_name: &str) -> Student {
        Student {
            id: ObjectId::new(),
            student_number: String::new(),
            first_name: first_name.to_string(),
            last_name: "Novak".to_string(),
            is_enrolled: true,
            grade_level: 9,
            homeroom: None,
            contact: ContactInfo::default(),
            emergency_contacts: vec![],
            enrolled_classes: vec![],
            advisor: None,
        }
    }

    pub fn new_teacher(first_name: &str) -> Teacher {
        Teacher {
            id: ObjectId::new(),
            teacher_number: String::new(),
            first_name: first_name.to_string(),
            last_name: "Babić".to_string(),
            is_active: true,
            status: TeacherStatus::FullTime,
            qualifications: vec![],
            classes: vec![],
            tutored_students: vec![],
        }
    }

    pub fn new_room(name: &str) -> Room {
        Room {
            id: ObjectId::new(),
            name: name.to_string(),
            capacity: 30,
            current_occupancy: vec![],
        }
    }
}
