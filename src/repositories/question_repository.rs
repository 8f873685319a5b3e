use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_document, Bson, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::{is_duplicate_key_error, Database, QUESTIONS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::{Question, QuestionKey, QuestionSource},
};

/// Enrichment fields that an upsert only writes when it has a value, so a
/// failed re-enrichment never erases an answer or image found earlier.
const ENRICHMENT_FIELDS: [&str; 3] = ["answer_text", "answer_source_url", "image_url"];

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Upsert keyed on `(exam_year, provider_local_id)` among structured-API questions.
    async fn upsert_by_provider_key(&self, question: Question) -> AppResult<Question>;
    /// Upsert keyed on the question id alone.
    async fn upsert_by_id(&self, question: Question) -> AppResult<Question>;
    async fn find_by_key(&self, key: &QuestionKey) -> AppResult<Vec<Question>>;
    async fn count_by_key(&self, key: &QuestionKey) -> AppResult<u64>;
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Question>>;
}

pub struct MongoQuestionRepository {
    collection: Collection<Question>,
}

impl MongoQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUESTIONS_COLLECTION);
        Self { collection }
    }

    fn key_filter(key: &QuestionKey) -> Document {
        doc! {
            "exam_type": key.exam_type.as_str(),
            "exam_subject": &key.subject,
            "exam_year": &key.year,
        }
    }

    fn upsert_document(question: &Question) -> AppResult<Document> {
        let now = Utc::now();
        let mut fields = to_document(&Question {
            created_at: None,
            modified_at: Some(now),
            ..question.clone()
        })?;

        let mut on_insert = doc! { "created_at": now.to_rfc3339() };
        for field in ENRICHMENT_FIELDS {
            if matches!(fields.get(field), Some(Bson::Null)) {
                fields.remove(field);
                on_insert.insert(field, Bson::Null);
            }
        }

        Ok(doc! { "$set": fields, "$setOnInsert": on_insert })
    }

    async fn upsert_with_filter(&self, filter: Document, question: Question) -> AppResult<Question> {
        question.check_invariants()?;
        let update = Self::upsert_document(&question)?;

        let mut retried = false;
        loop {
            let result = self
                .collection
                .find_one_and_update(filter.clone(), update.clone())
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await;

            match result {
                Ok(Some(stored)) => return Ok(stored),
                Ok(None) => {
                    return Err(AppError::InternalError(format!(
                        "Upsert of question '{}' returned no document",
                        question.id
                    )))
                }
                Err(err) if !retried && is_duplicate_key_error(&err) => {
                    log::debug!("Concurrent insert of question '{}', retrying as update", question.id);
                    retried = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// `provider_key_unique` only covers API rows; scraped rows are keyed on `id`.
    pub fn index_models() -> Vec<IndexModel> {
        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let provider_key_index = IndexModel::builder()
            .keys(doc! { "source": 1, "exam_year": 1, "provider_local_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "source": "api" })
                    .name("provider_key_unique".to_string())
                    .build(),
            )
            .build();

        let pool_index = IndexModel::builder()
            .keys(doc! { "exam_type": 1, "exam_subject": 1, "exam_year": 1 })
            .options(IndexOptions::builder().name("pool_key".to_string()).build())
            .build();

        vec![id_index, provider_key_index, pool_index]
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for questions collection");

        for index in Self::index_models() {
            self.collection.create_index(index).await?;
        }

        log::info!("Successfully created indexes for questions collection");
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn upsert_by_provider_key(&self, question: Question) -> AppResult<Question> {
        if question.source != QuestionSource::Api {
            return Err(AppError::InternalError(format!(
                "Question '{}' is not from the structured API",
                question.id
            )));
        }
        let filter = doc! {
            "source": "api",
            "exam_year": &question.exam_year,
            "provider_local_id": &question.provider_local_id,
        };
        self.upsert_with_filter(filter, question).await
    }

    async fn upsert_by_id(&self, question: Question) -> AppResult<Question> {
        let filter = doc! { "id": &question.id };
        self.upsert_with_filter(filter, question).await
    }

    async fn find_by_key(&self, key: &QuestionKey) -> AppResult<Vec<Question>> {
        let questions = self
            .collection
            .find(Self::key_filter(key))
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn count_by_key(&self, key: &QuestionKey) -> AppResult<u64> {
        let count = self.collection.count_documents(Self::key_filter(key)).await?;
        Ok(count)
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Question>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let questions = self
            .collection
            .find(doc! { "id": { "$in": ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::ExamType;

    fn scraped(answer: Option<&str>) -> Question {
        Question {
            id: Question::scrape_id("2020", "physics", 1, 0),
            source: QuestionSource::Scrape,
            provider_local_id: "1-0".to_string(),
            exam_type: ExamType::Jamb,
            exam_subject: "physics".to_string(),
            exam_year: "2020".to_string(),
            question_text: "Unit of force?".to_string(),
            options: vec!["Newton".to_string(), "Joule".to_string()],
            answer_text: answer.map(|a| a.to_string()),
            answer_source_url: None,
            image_url: None,
            created_at: None,
            modified_at: None,
        }
    }

    #[test]
    fn provider_key_index_only_applies_to_api_rows() {
        let indexes = MongoQuestionRepository::index_models();
        let provider_key = indexes
            .iter()
            .find(|index| {
                index.options.as_ref().and_then(|o| o.name.as_deref()) == Some("provider_key_unique")
            })
            .expect("provider key index");

        let options = provider_key.options.as_ref().expect("options");
        assert_eq!(options.unique, Some(true));
        assert_eq!(
            options.partial_filter_expression,
            Some(doc! { "source": "api" })
        );
    }

    #[test]
    fn upsert_document_keeps_missing_enrichment_out_of_set() {
        let update = MongoQuestionRepository::upsert_document(&scraped(None)).expect("document");
        let set = update.get_document("$set").expect("$set");
        let on_insert = update.get_document("$setOnInsert").expect("$setOnInsert");

        assert!(!set.contains_key("answer_text"));
        assert!(!set.contains_key("image_url"));
        assert!(on_insert.contains_key("answer_text"));
        assert!(on_insert.contains_key("created_at"));
        assert!(!set.contains_key("created_at"));
    }

    #[test]
    fn upsert_document_sets_resolved_answer() {
        let update =
            MongoQuestionRepository::upsert_document(&scraped(Some("Newton"))).expect("document");
        let set = update.get_document("$set").expect("$set");

        assert_eq!(set.get_str("answer_text").ok(), Some("Newton"));
        assert!(!update
            .get_document("$setOnInsert")
            .expect("$setOnInsert")
            .contains_key("answer_text"));
    }

    #[test]
    fn key_filter_matches_pool_fields() {
        let key = QuestionKey::new(ExamType::Waec, "biology", "2012");
        let filter = MongoQuestionRepository::key_filter(&key);
        assert_eq!(filter.get_str("exam_type").ok(), Some("waec"));
        assert_eq!(filter.get_str("exam_subject").ok(), Some("biology"));
        assert_eq!(filter.get_str("exam_year").ok(), Some("2012"));
    }
}
