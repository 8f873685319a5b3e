use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{Database, EXAM_ANSWERS_COLLECTION, EXAM_SESSIONS_COLLECTION},
    errors::AppResult,
    models::domain::{Answer, ExamSession, SubjectScore},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExamSessionRepository: Send + Sync {
    async fn create(&self, session: ExamSession) -> AppResult<ExamSession>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamSession>>;
    /// Last write wins per `(session_id, question_id)`.
    async fn upsert_answers(&self, answers: Vec<Answer>) -> AppResult<()>;
    async fn find_answers(&self, session_id: &str) -> AppResult<Vec<Answer>>;
    /// Pins the drawn question ids on an open session that has none yet.
    /// Returns `false` when the session was already pinned or completed.
    async fn pin_questions(&self, session_id: &str, question_ids: Vec<String>) -> AppResult<bool>;
    /// Marks an open session completed with its scores. Returns `false` when the
    /// session was already completed (or does not exist) and nothing changed.
    async fn complete(
        &self,
        session_id: &str,
        end_time: DateTime<Utc>,
        scores: Vec<SubjectScore>,
    ) -> AppResult<bool>;
    /// Completed competition sessions started within `[start, end)`.
    async fn find_completed_competitions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<ExamSession>>;
    async fn list_by_student(
        &self,
        student_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<ExamSession>, i64)>;
}

pub struct MongoExamSessionRepository {
    sessions: Collection<ExamSession>,
    answers: Collection<Answer>,
}

impl MongoExamSessionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            sessions: db.get_collection(EXAM_SESSIONS_COLLECTION),
            answers: db.get_collection(EXAM_ANSWERS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for exam_sessions and exam_answers collections");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1, "start_time": -1 })
            .options(IndexOptions::builder().name("student_start".to_string()).build())
            .build();

        let leaderboard_index = IndexModel::builder()
            .keys(doc! { "is_competition": 1, "is_completed": 1, "start_time": 1 })
            .options(IndexOptions::builder().name("competition_start".to_string()).build())
            .build();

        let answer_index = IndexModel::builder()
            .keys(doc! { "session_id": 1, "question_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("session_question_unique".to_string())
                    .build(),
            )
            .build();

        self.sessions.create_index(id_index).await?;
        self.sessions.create_index(student_index).await?;
        self.sessions.create_index(leaderboard_index).await?;
        self.answers.create_index(answer_index).await?;

        log::info!("Successfully created indexes for exam_sessions and exam_answers collections");
        Ok(())
    }
}

#[async_trait]
impl ExamSessionRepository for MongoExamSessionRepository {
    async fn create(&self, session: ExamSession) -> AppResult<ExamSession> {
        self.sessions.insert_one(&session).await?;
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamSession>> {
        let session = self.sessions.find_one(doc! { "id": id }).await?;
        Ok(session)
    }

    async fn upsert_answers(&self, answers: Vec<Answer>) -> AppResult<()> {
        for answer in answers {
            self.answers
                .update_one(
                    doc! {
                        "session_id": &answer.session_id,
                        "question_id": &answer.question_id,
                    },
                    doc! {
                        "$set": {
                            "submitted_answer": &answer.submitted_answer,
                            "updated_at": answer.updated_at.timestamp_millis(),
                        }
                    },
                )
                .upsert(true)
                .await?;
        }
        Ok(())
    }

    async fn find_answers(&self, session_id: &str) -> AppResult<Vec<Answer>> {
        let answers = self
            .answers
            .find(doc! { "session_id": session_id })
            .await?
            .try_collect()
            .await?;
        Ok(answers)
    }

    async fn pin_questions(&self, session_id: &str, question_ids: Vec<String>) -> AppResult<bool> {
        let result = self
            .sessions
            .update_one(
                doc! {
                    "id": session_id,
                    "is_completed": false,
                    "$or": [
                        { "question_ids": { "$exists": false } },
                        { "question_ids": { "$size": 0 } },
                    ],
                },
                doc! { "$set": { "question_ids": question_ids } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn complete(
        &self,
        session_id: &str,
        end_time: DateTime<Utc>,
        scores: Vec<SubjectScore>,
    ) -> AppResult<bool> {
        let result = self
            .sessions
            .update_one(
                doc! { "id": session_id, "is_completed": false },
                doc! {
                    "$set": {
                        "is_completed": true,
                        "end_time": end_time.timestamp_millis(),
                        "scores": to_bson(&scores)?,
                    }
                },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn find_completed_competitions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<ExamSession>> {
        let sessions = self
            .sessions
            .find(doc! {
                "is_competition": true,
                "is_completed": true,
                "start_time": {
                    "$gte": start.timestamp_millis(),
                    "$lt": end.timestamp_millis(),
                },
            })
            .await?
            .try_collect()
            .await?;
        Ok(sessions)
    }

    async fn list_by_student(
        &self,
        student_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<ExamSession>, i64)> {
        let filter = doc! { "student_id": student_id };
        let total = self.sessions.count_documents(filter.clone()).await?;

        let sessions = self
            .sessions
            .find(filter)
            .skip(offset as u64)
            .limit(limit)
            .sort(doc! { "start_time": -1 })
            .await?
            .try_collect()
            .await?;

        Ok((sessions, total as i64))
    }
}
