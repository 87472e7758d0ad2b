use bson::oid::ObjectId;
use serde::Serialize;
use utoipa::ToSchema;

use super::Scheduler;
use crate::data::class::db::NewClass;
use crate::data::class::Class;
use crate::data::code::CodePrefix;
use crate::data::student::Student;
use crate::data::teacher::Teacher;
use crate::error::ServiceError;
use crate::store::Entity;

/// Last issued number and the one a creation would receive now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NumberPreview {
    pub last: Option<String>,
    pub next: String,
}

impl Scheduler {
    async fn issued(&self, prefix: &CodePrefix) -> Result<Vec<String>, ServiceError> {
        self.store.issued_codes(prefix).await
    }

    fn generation_error(prefix: &CodePrefix, reason: String) -> ServiceError {
        ServiceError::Generation {
            kind: prefix.kind.name(),
            reason,
        }
    }

    /// Code following the last one issued with `prefix`.
    pub async fn next_code(&self, prefix: &CodePrefix) -> Result<String, ServiceError> {
        let issued = self.issued(prefix).await?;
        prefix
            .next(issued.iter().map(String::as_str))
            .map_err(|reason| Self::generation_error(prefix, reason))
    }

    async fn preview(&self, prefix: CodePrefix) -> Result<NumberPreview, ServiceError> {
        let issued = self.issued(&prefix).await?;
        let last = prefix
            .last_issued(issued.iter().map(String::as_str))
            .map_err(|reason| Self::generation_error(&prefix, reason))?
            .map(|(_, code)| code.to_string());
        let next = self.next_code(&prefix).await?;
        Ok(NumberPreview { last, next })
    }

    pub async fn next_student_number(&self) -> Result<NumberPreview, ServiceError> {
        self.preview(CodePrefix::student(self.clock.current_year()))
            .await
    }

    pub async fn next_teacher_number(&self) -> Result<NumberPreview, ServiceError> {
        self.preview(CodePrefix::teacher(self.clock.current_year()))
            .await
    }

    fn retry_duplicate(&self, attempt: u32, error: &ServiceError) -> bool {
        if error.is_duplicate_key() && attempt < self.code_attempts {
            tracing::warn!(
                "Generated code collided (attempt {}/{}): {}",
                attempt,
                self.code_attempts,
                error
            );
            return true;
        }
        false
    }

    /// Creates a class, generating its code from the name unless one was
    /// supplied.
    pub async fn create_class(&self, new: NewClass) -> Result<Class, ServiceError> {
        if let Some(course) = new.course {
            self.get_course(course).await?;
        }

        let mut class = Class {
            id: ObjectId::new(),
            name: new.name,
            section: new.section,
            code: new.code.clone().unwrap_or_default(),
            schedule: new.schedule,
            course: new.course,
            teacher: None,
            room: None,
            students: vec![],
            max_capacity: new.max_capacity,
            waitlist_capacity: new.waitlist_capacity,
            is_active: true,
            is_extracurricular: new.is_extracurricular,
        };

        if new.code.is_some() {
            self.store.insert_class(&class).await?;
            tracing::info!("Created class {} with supplied code", class.code);
            return Ok(class);
        }

        let prefix = CodePrefix::class(&class.name, self.clock.current_year());
        let mut attempt = 1;
        loop {
            class.code = self.next_code(&prefix).await?;
            match self.store.insert_class(&class).await {
                Err(e) if self.retry_duplicate(attempt, &e) => attempt += 1,
                Err(e) => return Err(e),
                Ok(()) => {
                    tracing::info!("Created class {} ({})", class.code, class.id);
                    return Ok(class);
                }
            }
        }
    }

    /// Creates a student with a freshly generated student number.
    pub async fn create_student(&self, mut student: Student) -> Result<Student, ServiceError> {
        if let Some(advisor) = student.advisor {
            self.get_teacher(advisor).await?;
        }
        if let Some(homeroom) = student.homeroom {
            self.store
                .room(homeroom)
                .await?
                .ok_or_else(|| Entity::Room.not_found(homeroom))?;
        }

        let prefix = CodePrefix::student(self.clock.current_year());
        let mut attempt = 1;
        loop {
            student.student_number = self.next_code(&prefix).await?;
            match self.store.insert_student(&student).await {
                Err(e) if self.retry_duplicate(attempt, &e) => attempt += 1,
                Err(e) => return Err(e),
                Ok(()) => {
                    tracing::info!("Registered student {}", student.student_number);
                    return Ok(student);
                }
            }
        }
    }

    /// Creates a teacher with a freshly generated teacher number.
    pub async fn create_teacher(&self, mut teacher: Teacher) -> Result<Teacher, ServiceError> {
        let prefix = CodePrefix::teacher(self.clock.current_year());
        let mut attempt = 1;
        loop {
            teacher.teacher_number = self.next_code(&prefix).await?;
            match self.store.insert_teacher(&teacher).await {
                Err(e) if self.retry_duplicate(attempt, &e) => attempt += 1,
                Err(e) => return Err(e),
                Ok(()) => {
                    tracing::info!("Registered teacher {}", teacher.teacher_number);
                    return Ok(teacher);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bson::oid::ObjectId;

    use super::*;
    use crate::clock::FixedClock;
    use crate::data::course::Course;
    use crate::data::room::Room;
    use crate::service::test_support::*;
    use crate::store::{AssignmentTx, MemoryStore, SchoolStore};

    #[rocket::async_test]
    async fn class_codes_increase_monotonically() {
        let store = MemoryStore::new();
        let scheduler = scheduler(&store);

        let mut codes = vec![];
        for _ in 0..5 {
            let class = scheduler
                .create_class(new_class("Advanced Math"))
                .await
                .expect("class created");
            codes.push(class.code);
        }

        assert_eq!(
            codes,
            vec!["ADVMAT25001", "ADVMAT25002", "ADVMAT25003", "ADVMAT25004", "ADVMAT25005"]
        );
    }

    #[rocket::async_test]
    async fn class_code_sequence_is_per_year() {
        let store = MemoryStore::new();
        scheduler(&store)
            .create_class(new_class("Advanced Math"))
            .await
            .unwrap();

        let next_year =
            Scheduler::new(Arc::new(store.clone()), Arc::new(FixedClock::in_year(2026)));
        let class = next_year
            .create_class(new_class("Advanced Math"))
            .await
            .unwrap();
        assert_eq!(class.code, "ADVMAT26001");
    }

    #[rocket::async_test]
    async fn supplied_duplicate_code_is_rejected() {
        let store = MemoryStore::new();
        let scheduler = scheduler(&store);

        let mut first = new_class("Biology");
        first.code = Some("BIOLOG25001".into());
        scheduler.create_class(first.clone()).await.unwrap();

        let err = scheduler
            .create_class(first)
            .await
            .expect_err("duplicate code accepted");
        assert!(err.is_duplicate_key());
    }

    // Known defect kept on purpose: after sequence 999 the generator keeps
    // issuing 999, so creation fails with a duplicate key instead of widening.
    #[rocket::async_test]
    async fn class_code_cap_plateaus_and_collides() {
        let store = MemoryStore::new();
        let scheduler = scheduler(&store);

        let mut last = new_class("Advanced Math");
        last.code = Some("ADVMAT25999".into());
        scheduler.create_class(last).await.unwrap();

        let prefix = CodePrefix::class("Advanced Math", 2025);
        assert_eq!(scheduler.next_code(&prefix).await.unwrap(), "ADVMAT25999");

        let err = scheduler
            .create_class(new_class("Advanced Math"))
            .await
            .expect_err("code past the cap issued");
        assert!(err.is_duplicate_key());
    }

    #[rocket::async_test]
    async fn student_and_teacher_numbers() {
        let store = MemoryStore::new();
        let scheduler = scheduler(&store);

        let preview = scheduler.next_student_number().await.unwrap();
        assert_eq!(preview, NumberPreview { last: None, next: "ST2025-001".into() });

        let a = scheduler.create_student(new_student("Ana")).await.unwrap();
        let b = scheduler.create_student(new_student("Ben")).await.unwrap();
        assert_eq!(a.student_number, "ST2025-001");
        assert_eq!(b.student_number, "ST2025-002");

        let preview = scheduler.next_student_number().await.unwrap();
        assert_eq!(preview.last.as_deref(), Some("ST2025-002"));
        assert_eq!(preview.next, "ST2025-003");

        let t = scheduler.create_teacher(new_teacher("Iva")).await.unwrap();
        assert_eq!(t.teacher_number, "TC2025-001");
        assert_eq!(scheduler.next_teacher_number().await.unwrap().next, "TC2025-002");
    }

    #[rocket::async_test]
    async fn missing_course_is_not_found() {
        let store = MemoryStore::new();
        let mut class = new_class("Chemistry");
        class.course = Some(ObjectId::new());

        let err = scheduler(&store).create_class(class).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "course", .. }));
    }

    /// Store that loses every race: the first `collisions` inserts find their
    /// number already taken by a concurrent request.
    struct RacingStore {
        inner: MemoryStore,
        collisions: AtomicUsize,
    }

    #[rocket::async_trait]
    impl SchoolStore for RacingStore {
        async fn begin(&self) -> Result<Box<dyn AssignmentTx>, ServiceError> {
            self.inner.begin().await
        }
        async fn class(&self, id: ObjectId) -> Result<Option<Class>, ServiceError> {
            self.inner.class(id).await
        }
        async fn student(&self, id: ObjectId) -> Result<Option<Student>, ServiceError> {
            self.inner.student(id).await
        }
        async fn teacher(&self, id: ObjectId) -> Result<Option<Teacher>, ServiceError> {
            self.inner.teacher(id).await
        }
        async fn room(&self, id: ObjectId) -> Result<Option<Room>, ServiceError> {
            self.inner.room(id).await
        }
        async fn course(&self, id: ObjectId) -> Result<Option<Course>, ServiceError> {
            self.inner.course(id).await
        }
        async fn classes(&self, skip: u64, limit: i64) -> Result<Vec<Class>, ServiceError> {
            self.inner.classes(skip, limit).await
        }
        async fn classes_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Class>, ServiceError> {
            self.inner.classes_by_ids(ids).await
        }
        async fn issued_codes(&self, prefix: &CodePrefix) -> Result<Vec<String>, ServiceError> {
            self.inner.issued_codes(prefix).await
        }
        async fn insert_class(&self, class: &Class) -> Result<(), ServiceError> {
            self.inner.insert_class(class).await
        }
        async fn insert_student(&self, student: &Student) -> Result<(), ServiceError> {
            let left = self.collisions.load(Ordering::SeqCst);
            if left > 0 {
                self.collisions.store(left - 1, Ordering::SeqCst);
                let mut rival = student.clone();
                rival.id = ObjectId::new();
                self.inner.insert_student(&rival).await?;
            }
            self.inner.insert_student(student).await
        }
        async fn insert_teacher(&self, teacher: &Teacher) -> Result<(), ServiceError> {
            self.inner.insert_teacher(teacher).await
        }
        async fn insert_room(&self, room: &Room) -> Result<(), ServiceError> {
            self.inner.insert_room(room).await
        }
        async fn insert_course(&self, course: &Course) -> Result<(), ServiceError> {
            self.inner.insert_course(course).await
        }
        async fn set_class_course(
            &self,
            class: ObjectId,
            course: ObjectId,
        ) -> Result<(), ServiceError> {
            self.inner.set_class_course(class, course).await
        }
    }

    #[rocket::async_test]
    async fn colliding_number_is_regenerated() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            collisions: AtomicUsize::new(2),
        });
        let scheduler = Scheduler::new(store.clone(), Arc::new(FixedClock::in_year(2025)));

        let student = scheduler.create_student(new_student("Ana")).await.unwrap();
        assert_eq!(student.student_number, "ST2025-003");
    }

    #[rocket::async_test]
    async fn collisions_past_attempt_limit_surface_duplicate_key() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            collisions: AtomicUsize::new(5),
        });
        let scheduler = Scheduler::new(store.clone(), Arc::new(FixedClock::in_year(2025)))
            .with_code_attempts(2);

        let err = scheduler
            .create_student(new_student("Ana"))
            .await
            .expect_err("collision not reported");
        assert!(err.is_duplicate_key());
        // Only the rivals got in.
        assert_eq!(store.inner.issued_codes(&CodePrefix::student(2025)).await.unwrap().len(), 2);
    }
}
