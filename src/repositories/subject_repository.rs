use async_trait::async_trait;
use mongodb::{
    bson::{doc, to_document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::{Database, SUBJECTS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::{ExamType, Subject},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Returns the existing row for `(name, exam_type)` or creates it.
    async fn upsert(&self, name: &str, exam_type: ExamType) -> AppResult<Subject>;
    async fn find_by_name(&self, name: &str, exam_type: ExamType) -> AppResult<Option<Subject>>;
}

pub struct MongoSubjectRepository {
    collection: Collection<Subject>,
}

impl MongoSubjectRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(SUBJECTS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for subjects collection");

        let name_index = IndexModel::builder()
            .keys(doc! { "name": 1, "exam_type": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("name_exam_type_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(name_index).await?;

        log::info!("Successfully created indexes for subjects collection");
        Ok(())
    }
}

#[async_trait]
impl SubjectRepository for MongoSubjectRepository {
    async fn upsert(&self, name: &str, exam_type: ExamType) -> AppResult<Subject> {
        let fresh = to_document(&Subject::new(name, exam_type))?;

        let subject = self
            .collection
            .find_one_and_update(
                doc! { "name": name, "exam_type": exam_type.as_str() },
                doc! { "$setOnInsert": fresh },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;

        subject.ok_or_else(|| {
            AppError::InternalError(format!("Upsert of subject '{}' returned no document", name))
        })
    }

    async fn find_by_name(&self, name: &str, exam_type: ExamType) -> AppResult<Option<Subject>> {
        let subject = self
            .collection
            .find_one(doc! { "name": name, "exam_type": exam_type.as_str() })
            .await?;
        Ok(subject)
    }
}
