use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneOptions, FindOptions, IndexOptions};
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{AssignmentTx, Entity, SchoolStore};
use crate::data::class::{Class, ClassEnrollment};
use crate::data::code::{CodeKind, CodePrefix};
use crate::data::course::Course;
use crate::data::room::{OccupancyEntry, Room};
use crate::data::student::Student;
use crate::data::teacher::Teacher;
use crate::error::ServiceError;

const DUPLICATE_KEY_CODE: i32 = 11000;

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(w)) => w.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(c) => c.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn store_error(e: mongodb::error::Error) -> ServiceError {
    if e.contains_label("TransientTransactionError") {
        ServiceError::WriteConflict(e.to_string())
    } else {
        ServiceError::Database(e)
    }
}

#[inline]
fn by_id(id: ObjectId) -> Document {
    doc! { "_id": id }
}

fn code_kind_entity(kind: CodeKind) -> Entity {
    match kind {
        CodeKind::Class => Entity::Class,
        CodeKind::Student => Entity::Student,
        CodeKind::Teacher => Entity::Teacher,
    }
}

/// MongoDB backed store. Transactions need a replica set deployment.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<MongoStore, mongodb::error::Error> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        Ok(MongoStore { client, db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates the unique indexes generated codes rely on.
    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        for kind in [CodeKind::Class, CodeKind::Student, CodeKind::Teacher] {
            let mut keys = Document::new();
            keys.insert(kind.field(), 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();

            let collection = code_kind_entity(kind).collection();
            tracing::debug!("Ensuring unique {} index on '{}'", kind.field(), collection);
            self.db
                .collection::<Document>(collection)
                .create_index(index, None)
                .await?;
        }
        Ok(())
    }

    fn collection<T>(&self, entity: Entity) -> Collection<T> {
        self.db.collection(entity.collection())
    }

    async fn find_by_id<T>(&self, entity: Entity, id: ObjectId) -> Result<Option<T>, ServiceError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        self.collection::<T>(entity)
            .find_one(by_id(id), None)
            .await
            .map_err(store_error)
    }

    async fn insert<T>(
        &self,
        entity: Entity,
        value: &T,
        unique: Option<(&str, &str)>,
    ) -> Result<(), ServiceError>
    where
        T: Serialize + Send + Sync,
    {
        match self.collection::<T>(entity).insert_one(value, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                let (field, value) = unique.unwrap_or(("_id", ""));
                Err(ServiceError::DuplicateKey {
                    field: field.to_string(),
                    value: value.to_string(),
                })
            }
            Err(e) => Err(store_error(e)),
        }
    }
}

#[rocket::async_trait]
impl SchoolStore for MongoStore {
    async fn begin(&self) -> Result<Box<dyn AssignmentTx>, ServiceError> {
        let mut session = self.client.start_session(None).await.map_err(store_error)?;
        session.start_transaction(None).await.map_err(store_error)?;
        Ok(Box::new(MongoTx {
            db: self.db.clone(),
            session,
        }))
    }

    async fn class(&self, id: ObjectId) -> Result<Option<Class>, ServiceError> {
        self.find_by_id(Entity::Class, id).await
    }

    async fn student(&self, id: ObjectId) -> Result<Option<Student>, ServiceError> {
        self.find_by_id(Entity::Student, id).await
    }

    async fn teacher(&self, id: ObjectId) -> Result<Option<Teacher>, ServiceError> {
        self.find_by_id(Entity::Teacher, id).await
    }

    async fn room(&self, id: ObjectId) -> Result<Option<Room>, ServiceError> {
        self.find_by_id(Entity::Room, id).await
    }

    async fn course(&self, id: ObjectId) -> Result<Option<Course>, ServiceError> {
        self.find_by_id(Entity::Course, id).await
    }

    async fn classes(&self, skip: u64, limit: i64) -> Result<Vec<Class>, ServiceError> {
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .skip(skip)
            .limit(limit)
            .build();
        self.collection::<Class>(Entity::Class)
            .find(None, options)
            .await
            .map_err(store_error)?
            .try_collect()
            .await
            .map_err(store_error)
    }

    async fn classes_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Class>, ServiceError> {
        self.collection::<Class>(Entity::Class)
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await
            .map_err(store_error)?
            .try_collect()
            .await
            .map_err(store_error)
    }

    async fn issued_codes(&self, prefix: &CodePrefix) -> Result<Vec<String>, ServiceError> {
        let field = prefix.kind.field();

        let mut filter = Document::new();
        filter.insert(field, doc! { "$regex": prefix.pattern() });
        let mut projection = doc! { "_id": 0 };
        projection.insert(field, 1);

        let documents: Vec<Document> = self
            .collection::<Document>(code_kind_entity(prefix.kind))
            .find(filter, FindOptions::builder().projection(projection).build())
            .await
            .map_err(store_error)?
            .try_collect()
            .await
            .map_err(store_error)?;

        documents
            .iter()
            .map(|d| {
                d.get_str(field)
                    .map(String::from)
                    .map_err(|e| ServiceError::Generation {
                        kind: prefix.kind.name(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }

    async fn insert_class(&self, class: &Class) -> Result<(), ServiceError> {
        self.insert(Entity::Class, class, Some(("code", &class.code)))
            .await
    }

    async fn insert_student(&self, student: &Student) -> Result<(), ServiceError> {
        self.insert(
            Entity::Student,
            student,
            Some(("studentNumber", &student.student_number)),
        )
        .await
    }

    async fn insert_teacher(&self, teacher: &Teacher) -> Result<(), ServiceError> {
        self.insert(
            Entity::Teacher,
            teacher,
            Some(("teacherNumber", &teacher.teacher_number)),
        )
        .await
    }

    async fn insert_room(&self, room: &Room) -> Result<(), ServiceError> {
        self.insert(Entity::Room, room, None).await
    }

    async fn insert_course(&self, course: &Course) -> Result<(), ServiceError> {
        self.insert(Entity::Course, course, None).await
    }

    async fn set_class_course(
        &self,
        class: ObjectId,
        course: ObjectId,
    ) -> Result<(), ServiceError> {
        self.collection::<Document>(Entity::Class)
            .update_one(by_id(class), doc! { "$set": { "course": course } }, None)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

pub struct MongoTx {
    db: Database,
    session: ClientSession,
}

impl MongoTx {
    fn collection<T>(&self, entity: Entity) -> Collection<T> {
        self.db.collection(entity.collection())
    }

    async fn find_by_id<T>(
        &mut self,
        entity: Entity,
        id: ObjectId,
    ) -> Result<Option<T>, ServiceError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let options: Option<FindOneOptions> = None;
        self.collection::<T>(entity)
            .find_one_with_session(by_id(id), options, &mut self.session)
            .await
            .map_err(store_error)
    }

    async fn update_one(
        &mut self,
        entity: Entity,
        filter: Document,
        update: Document,
    ) -> Result<(), ServiceError> {
        self.collection::<Document>(entity)
            .update_one_with_session(filter, update, None, &mut self.session)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn update_many(
        &mut self,
        entity: Entity,
        filter: Document,
        update: Document,
    ) -> Result<(), ServiceError> {
        self.collection::<Document>(entity)
            .update_many_with_session(filter, update, None, &mut self.session)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[rocket::async_trait]
impl AssignmentTx for MongoTx {
    async fn class(&mut self, id: ObjectId) -> Result<Option<Class>, ServiceError> {
        self.find_by_id(Entity::Class, id).await
    }

    async fn student(&mut self, id: ObjectId) -> Result<Option<Student>, ServiceError> {
        self.find_by_id(Entity::Student, id).await
    }

    async fn teacher(&mut self, id: ObjectId) -> Result<Option<Teacher>, ServiceError> {
        self.find_by_id(Entity::Teacher, id).await
    }

    async fn room(&mut self, id: ObjectId) -> Result<Option<Room>, ServiceError> {
        self.find_by_id(Entity::Room, id).await
    }

    async fn set_class_teacher(
        &mut self,
        class: ObjectId,
        teacher: Option<ObjectId>,
    ) -> Result<(), ServiceError> {
        self.update_one(Entity::Class, by_id(class), doc! { "$set": { "teacher": teacher } })
            .await
    }

    async fn set_class_room(
        &mut self,
        class: ObjectId,
        room: Option<ObjectId>,
    ) -> Result<(), ServiceError> {
        self.update_one(Entity::Class, by_id(class), doc! { "$set": { "room": room } })
            .await
    }

    async fn add_teacher_class(
        &mut self,
        teacher: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError> {
        self.update_one(
            Entity::Teacher,
            by_id(teacher),
            doc! { "$addToSet": { "classes": class } },
        )
        .await
    }

    async fn remove_teacher_class(
        &mut self,
        teacher: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError> {
        self.update_one(
            Entity::Teacher,
            by_id(teacher),
            doc! { "$pull": { "classes": class } },
        )
        .await
    }

    async fn add_student_class(
        &mut self,
        student: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError> {
        self.update_one(
            Entity::Student,
            by_id(student),
            doc! { "$addToSet": { "enrolledClasses": class } },
        )
        .await
    }

    async fn add_class_student(
        &mut self,
        class: ObjectId,
        enrollment: &ClassEnrollment,
    ) -> Result<(), ServiceError> {
        let entry = bson::to_bson(enrollment)?;
        self.update_one(
            Entity::Class,
            doc! { "_id": class, "students.student": { "$ne": enrollment.student } },
            doc! { "$push": { "students": entry } },
        )
        .await
    }

    async fn push_occupancy(
        &mut self,
        room: ObjectId,
        entry: &OccupancyEntry,
    ) -> Result<(), ServiceError> {
        let entry = bson::to_bson(entry)?;
        self.update_one(
            Entity::Room,
            by_id(room),
            doc! { "$push": { "currentOccupancy": entry } },
        )
        .await
    }

    async fn remove_permanent_bookings(
        &mut self,
        room: ObjectId,
        class: ObjectId,
    ) -> Result<(), ServiceError> {
        self.update_one(
            Entity::Room,
            by_id(room),
            doc! { "$pull": { "currentOccupancy": { "class": class, "isTemporary": false } } },
        )
        .await
    }

    async fn unlink_class(&mut self, class: ObjectId) -> Result<(), ServiceError> {
        self.update_many(
            Entity::Teacher,
            doc! { "classes": class },
            doc! { "$pull": { "classes": class } },
        )
        .await?;
        self.update_many(
            Entity::Student,
            doc! { "enrolledClasses": class },
            doc! { "$pull": { "enrolledClasses": class } },
        )
        .await?;
        self.update_many(
            Entity::Room,
            doc! { "currentOccupancy.class": class },
            doc! { "$pull": { "currentOccupancy": { "class": class } } },
        )
        .await
    }

    async fn unlink_student(&mut self, student: ObjectId) -> Result<(), ServiceError> {
        self.update_many(
            Entity::Class,
            doc! { "students.student": student },
            doc! { "$pull": { "students": { "student": student } } },
        )
        .await?;
        self.update_many(
            Entity::Teacher,
            doc! { "tutoredStudents": student },
            doc! { "$pull": { "tutoredStudents": student } },
        )
        .await
    }

    async fn unlink_teacher(&mut self, teacher: ObjectId) -> Result<(), ServiceError> {
        self.update_many(
            Entity::Class,
            doc! { "teacher": teacher },
            doc! { "$set": { "teacher": Bson::Null } },
        )
        .await?;
        self.update_many(
            Entity::Student,
            doc! { "advisor": teacher },
            doc! { "$set": { "advisor": Bson::Null } },
        )
        .await
    }

    async fn delete(&mut self, entity: Entity, id: ObjectId) -> Result<bool, ServiceError> {
        let result = self
            .collection::<Document>(entity)
            .delete_one_with_session(by_id(id), None, &mut self.session)
            .await
            .map_err(store_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), ServiceError> {
        let mut tx = *self;
        tx.session.commit_transaction().await.map_err(store_error)
    }

    async fn abort(self: Box<Self>) -> Result<(), ServiceError> {
        let mut tx = *self;
        tx.session.abort_transaction().await.map_err(store_error)
    }
}
