use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bson::oid::ObjectId;
use regex::Regex;

use super::{AssignmentTx, Entity, SchoolStore};
use crate::data::class::{Class, ClassEnrollment};
use crate::data::code::{CodeKind, CodePrefix};
use crate::data::course::Course;
use crate::data::room::{OccupancyEntry, Room};
use crate::data::student::Student;
use crate::data::teacher::Teacher;
use crate::error::ServiceError;

type Documents<T> = BTreeMap<ObjectId, T>;

#[derive(Debug, Clone, Default)]
struct Collections {
    classes: Documents<Class>,
    students: Documents<Student>,
    teachers: Documents<Teacher>,
    rooms: Documents<Room>,
    courses: Documents<Course>,
}

fn differs<T: PartialEq>(a: &Documents<T>, b: &Documents<T>, id: &ObjectId) -> bool {
    a.get(id) != b.get(id)
}

fn copy_document<T: Clone>(to: &mut Documents<T>, from: &Documents<T>, id: &ObjectId) {
    match from.get(id) {
        Some(document) => to.insert(*id, document.clone()),
        None => to.remove(id),
    };
}

impl Collections {
    fn differs(&self, other: &Collections, entity: Entity, id: &ObjectId) -> bool {
        match entity {
            Entity::Class => differs(&self.classes, &other.classes, id),
            Entity::Student => differs(&self.students, &other.students, id),
            Entity::Teacher => differs(&self.teachers, &other.teachers, id),
            Entity::Room => differs(&self.rooms, &other.rooms, id),
            Entity::Course => differs(&self.courses, &other.courses, id),
        }
    }

    fn copy_from(&mut self, other: &Collections, entity: Entity, id: &ObjectId) {
        match entity {
            Entity::Class => copy_document(&mut self.classes, &other.classes, id),
            Entity::Student => copy_document(&mut self.students, &other.students, id),
            Entity::Teacher => copy_document(&mut self.teachers, &other.teachers, id),
            Entity::Room => copy_document(&mut self.rooms, &other.rooms, id),
            Entity::Course => copy_document(&mut self.courses, &other.courses, id),
        }
    }
}

fn duplicate(field: &str, value: &str) -> ServiceError {
    ServiceError::DuplicateKey {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn insert_unique<T: Clone>(
    documents: &mut Documents<T>,
    id: ObjectId,
    document: &T,
    taken: impl Fn(&T) -> bool,
    unique: (&str, &str),
) -> Result<(), ServiceError> {
    if documents.contains_key(&id) {
        return Err(duplicate("_id", &id.to_hex()));
    }
    if documents.values().any(taken) {
        return Err(duplicate(unique.0, unique.1));
    }
    documents.insert(id, document.clone());
    Ok(())
}

/// In-process store, used when no MongoDB deployment is configured and by
/// the tests.
///
/// A transaction works on a copy of the collections and on commit writes
/// back the documents it touched, failing if any of them was changed by
/// someone else in the meantime.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<Collections>>,
    fail_on: Arc<Mutex<Option<&'static str>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the named transaction write fail in transactions started
    /// afterwards.
    #[cfg(test)]
    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().unwrap_or_else(PoisonError::into_inner) = Some(operation);
    }
}

#[rocket::async_trait]
impl SchoolStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn AssignmentTx>, ServiceError> {
        let base = self.lock().clone();
        let fail_on = *self.fail_on.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Box::new(MemoryTx {
            state: self.state.clone(),
            work: base.clone(),
            base,
            touched: BTreeSet::new(),
            fail_on,
        }))
    }

    async fn class(&self, id: ObjectId) -> Result<Option<Class>, ServiceError> {
        Ok(self.lock().classes.get(&id).cloned())
    }

    async fn student(&self, id: ObjectId) -> Result<Option<Student>, ServiceError> {
        Ok(self.lock().students.get(&id).cloned())
    }

    async fn teacher(&self, id: ObjectId) -> Result<Option<Teacher>, ServiceError> {
        Ok(self.lock().teachers.get(&id).cloned())
    }

    async fn room(&self, id: ObjectId) -> Result<Option<Room>, ServiceError> {
        Ok(self.lock().rooms.get(&id).cloned())
    }

    async fn course(&self, id: ObjectId) -> Result<Option<Course>, ServiceError> {
        Ok(self.lock().courses.get(&id).cloned())
    }

    async fn classes(&self, skip: u64, limit: i64) -> Result<Vec<Class>, ServiceError> {
        Ok(self
            .lock()
            .classes
            .values()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn classes_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Class>, ServiceError> {
        let state = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.classes.get(id).cloned())
            .collect())
    }

    async fn issued_codes(&self, prefix: &CodePrefix) -> Result<Vec<String>, ServiceError> {
        let pattern = Regex::new(&prefix.pattern()).map_err(|e| ServiceError::Generation {
            kind: prefix.kind.name(),
            reason: e.to_string(),
        })?;

        let state = self.lock();
        let codes: Vec<&String> = match prefix.kind {
            CodeKind::Class => state.classes.values().map(|c| &c.code).collect(),
            CodeKind::Student => state.students.values().map(|s| &s.student_number).collect(),
            CodeKind::Teacher => state.teachers.values().map(|t| &t.teacher_number).collect(),
        };
        Ok(codes
            .into_iter()
            .filter(|code| pattern.is_match(code))
            .cloned()
            .collect())
    }

    async fn insert_class(&self, class: &Class) -> Result<(), ServiceError> {
        insert_unique(
            &mut self.lock().classes,
            class.id,
            class,
            |c| c.code == class.code,
            ("code", &class.code),
        )
    }

    async fn insert_student(&self, student: &Student) -> Result<(), ServiceError> {
        insert_unique(
            &mut self.lock().students,
            student.id,
            student,
            |s| s.student_number == student.student_number,
            ("studentNumber", &student.student_number),
        )
    }

    async fn insert_teacher(&self, teacher: &Teacher) -> Result<(), ServiceError> {
        insert_unique(
            &mut self.lock().teachers,
            teacher.id,
            teacher,
            |t| t.teacher_number == teacher.teacher_number,
            ("teacherNumber", &teacher.teacher_number),
        )
    }

    async fn insert_room(&self, room: &Room) -> Result<(), ServiceError> {
        insert_unique(&mut self.lock().rooms, room.id, room, |_| false, ("_id", ""))
    }

    async fn insert_course(&self, course: &Course) -> Result<(), ServiceError> {
        insert_unique(&mut self.lock().courses, course.id, course, |_| false, ("_id", ""))
    }

    async fn set_class_course(
        &self,
        class: ObjectId,
        course: ObjectId,
    ) -> Result<(), ServiceError> {
        if let Some(c) = self.lock().classes.get_mut(&class) {
            c.course = Some(course);
        }
        Ok(())
    }
}

pub struct MemoryTx {
    state: Arc<Mutex<Collections>>,
    base: Collections,
    work: Collections,
    touched: BTreeSet<(Entity, ObjectId)>,
    fail_on: Option<&'static str>,
}

impl MemoryTx {
    fn write(
        &mut self,
        operation: &'static str,
        entity: Entity,
        id: ObjectId,
    ) -> Result<(), ServiceError> {
        if self.fail_on == Some(operation) {
            return Err(ServiceError::WriteConflict(format!(
                "{} {} (injected failure in {})",
                entity.name(),
                id,
                operation
            )));
        }
        self.touched.insert((entity, id));
        Ok(())
    }
}

#[rocket::async_trait]
impl AssignmentTx for MemoryTx {
    async fn class(&mut self, id: ObjectId) -> Result<Option<Class>, ServiceError> {
        Ok(self.work.classes.get(&id).cloned())
    }

    async fn student(&mut self, id: ObjectId) -> Result<Option<Student>, ServiceError> {
        Ok(self.work.students.get(&id).cloned())
    }

    async fn teacher(&mut self, id: ObjectId) -> Result<Option<Teacher>, ServiceError> {
        Ok(self.work.teachers.get(&id).cloned())
    }

    async fn room(&mut self, id: ObjectId) -> Result<Option<Room>, ServiceError> {
        Ok(self.work.rooms.get(&id).cloned())
    }

    async fn set_class_teacher(
        &mut self,
        class: ObjectId,
        teacher: Option<ObjectId>,
    ) -> Result<(), ServiceError> {
        self.write("set_class_teacher", Entity::Class, class)?;
        if let Some(c) = self.work.classes.get_mut(&class) {
            c.teacher = teacher;
        }
        Ok(())
    }

    async fn set_class_room(
        &mut self,
        class: ObjectId,
        room: Option<ObjectId>,
    ) -> Result<(), ServiceError> {
        self.write("set_class_room", Entity::Class, class)?;
        if let Some(c) = self.work.classes.get_mut(&class) {
            c.room = room;
        }
        Ok(())
    }

    async fn add_teacher_class(
        &mut self,
        teacher: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError> {
        self.write("add_teacher_class", Entity::Teacher, teacher)?;
        if let Some(t) = self.work.teachers.get_mut(&teacher) {
            if !t.classes.contains(&class) {
                t.classes.push(class);
            }
        }
        Ok(())
    }

    async fn remove_teacher_class(
        &mut self,
        teacher: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError> {
        self.write("remove_teacher_class", Entity::Teacher, teacher)?;
        if let Some(t) = self.work.teachers.get_mut(&teacher) {
            t.classes.retain(|c| *c != class);
        }
        Ok(())
    }

    async fn add_student_class(
        &mut self,
        student: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError> {
        self.write("add_student_class", Entity::Student, student)?;
        if let Some(s) = self.work.students.get_mut(&student) {
            if !s.enrolled_classes.contains(&class) {
                s.enrolled_classes.push(class);
            }
        }
        Ok(())
    }

    async fn add_class_student(
        &mut self,
        class: ObjectId,
        enrollment: &ClassEnrollment,
    ) -> Result<(), ServiceError> {
        self.write("add_class_student", Entity::Class, class)?;
        if let Some(c) = self.work.classes.get_mut(&class) {
            if !c.is_enrolled(enrollment.student) {
                c.students.push(enrollment.clone());
            }
        }
        Ok(())
    }

    async fn push_occupancy(
        &mut self,
        room: ObjectId,
        entry: &OccupancyEntry,
    ) -> Result<(), ServiceError> {
        self.write("push_occupancy", Entity::Room, room)?;
        if let Some(r) = self.work.rooms.get_mut(&room) {
            r.current_occupancy.push(entry.clone());
        }
        Ok(())
    }

    async fn remove_permanent_bookings(
        &mut self,
        room: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError> {
        self.write("remove_permanent_bookings", Entity::Room, room)?;
        if let Some(r) = self.work.rooms.get_mut(&room) {
            r.current_occupancy
                .retain(|e| e.class != class || e.is_temporary);
        }
        Ok(())
    }

    async fn unlink_class(&mut self, class: ObjectId) -> Result<(), ServiceError> {
        let teachers: Vec<ObjectId> = self
            .work
            .teachers
            .values()
            .filter(|t| t.classes.contains(&class))
            .map(|t| t.id)
            .collect();
        for id in teachers {
            self.remove_teacher_class(id, class).await?;
        }

        let students: Vec<ObjectId> = self
            .work
            .students
            .values()
            .filter(|s| s.enrolled_classes.contains(&class))
            .map(|s| s.id)
            .collect();
        for id in students {
            self.write("unlink_class", Entity::Student, id)?;
            if let Some(s) = self.work.students.get_mut(&id) {
                s.enrolled_classes.retain(|c| *c != class);
            }
        }

        let rooms: Vec<ObjectId> = self
            .work
            .rooms
            .values()
            .filter(|r| r.current_occupancy.iter().any(|e| e.class == class))
            .map(|r| r.id)
            .collect();
        for id in rooms {
            self.write("unlink_class", Entity::Room, id)?;
            if let Some(r) = self.work.rooms.get_mut(&id) {
                r.current_occupancy.retain(|e| e.class != class);
            }
        }
        Ok(())
    }

    async fn unlink_student(&mut self, student: ObjectId) -> Result<(), ServiceError> {
        let classes: Vec<ObjectId> = self
            .work
            .classes
            .values()
            .filter(|c| c.is_enrolled(student))
            .map(|c| c.id)
            .collect();
        for id in classes {
            self.write("unlink_student", Entity::Class, id)?;
            if let Some(c) = self.work.classes.get_mut(&id) {
                c.students.retain(|e| e.student != student);
            }
        }

        let teachers: Vec<ObjectId> = self
            .work
            .teachers
            .values()
            .filter(|t| t.tutored_students.contains(&student))
            .map(|t| t.id)
            .collect();
        for id in teachers {
            self.write("unlink_student", Entity::Teacher, id)?;
            if let Some(t) = self.work.teachers.get_mut(&id) {
                t.tutored_students.retain(|s| *s != student);
            }
        }
        Ok(())
    }

    async fn unlink_teacher(&mut self, teacher: ObjectId) -> Result<(), ServiceError> {
        let classes: Vec<ObjectId> = self
            .work
            .classes
            .values()
            .filter(|c| c.teacher == Some(teacher))
            .map(|c| c.id)
            .collect();
        for id in classes {
            self.set_class_teacher(id, None).await?;
        }

        let students: Vec<ObjectId> = self
            .work
            .students
            .values()
            .filter(|s| s.advisor == Some(teacher))
            .map(|s| s.id)
            .collect();
        for id in students {
            self.write("unlink_teacher", Entity::Student, id)?;
            if let Some(s) = self.work.students.get_mut(&id) {
                s.advisor = None;
            }
        }
        Ok(())
    }

    async fn delete(&mut self, entity: Entity, id: ObjectId) -> Result<bool, ServiceError> {
        self.write("delete", entity, id)?;
        let removed = match entity {
            Entity::Class => self.work.classes.remove(&id).is_some(),
            Entity::Student => self.work.students.remove(&id).is_some(),
            Entity::Teacher => self.work.teachers.remove(&id).is_some(),
            Entity::Room => self.work.rooms.remove(&id).is_some(),
            Entity::Course => self.work.courses.remove(&id).is_some(),
        };
        Ok(removed)
    }

    async fn commit(self: Box<Self>) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((entity, id)) = self
            .touched
            .iter()
            .find(|(entity, id)| state.differs(&self.base, *entity, id))
        {
            return Err(ServiceError::WriteConflict(format!("{} {}", entity.name(), id)));
        }

        for (entity, id) in &self.touched {
            state.copy_from(&self.work, *entity, id);
        }
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), ServiceError> {
        Ok(())
    }
}
