use async_graphql::SimpleObject;
use chrono::{serde::ts_milliseconds, serde::ts_milliseconds_option, DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::ExamType,
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExamSession {
    pub id: String,
    pub student_id: String,
    pub exam_type: ExamType,
    pub subjects: Vec<String>, // normalized slugs, compulsory subject included
    pub exam_year: String,
    #[serde(with = "ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub is_competition: bool,
    #[serde(default)]
    pub scores: Vec<SubjectScore>, // written once, together with end_time
    /// Questions drawn for the session, pinned on the first draw.
    #[serde(default)]
    pub question_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct SubjectScore {
    pub exam_subject: String,
    pub subject_name: String,
    pub score: i32,
    pub question_count: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Answer {
    pub session_id: String,
    pub question_id: String,
    pub submitted_answer: String, // raw letter or option text
    #[serde(with = "ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(session_id: &str, question_id: &str, submitted_answer: &str) -> Self {
        Answer {
            session_id: session_id.to_string(),
            question_id: question_id.to_string(),
            submitted_answer: submitted_answer.to_string(),
            updated_at: Utc::now(),
        }
    }
}

impl ExamSession {
    pub fn start(
        student_id: &str,
        exam_type: ExamType,
        subjects: Vec<String>,
        exam_year: &str,
        is_competition: bool,
    ) -> Self {
        ExamSession {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            exam_type,
            subjects,
            exam_year: exam_year.to_string(),
            start_time: Utc::now(),
            end_time: None,
            is_completed: false,
            is_competition,
            scores: Vec::new(),
            question_ids: Vec::new(),
        }
    }

    pub fn is_owned_by(&self, student_id: &str) -> bool {
        self.student_id == student_id
    }

    pub fn ensure_open(&self) -> AppResult<()> {
        if self.is_completed {
            return Err(AppError::InvalidState(format!(
                "Exam session '{}' is already completed",
                self.id
            )));
        }
        Ok(())
    }

    pub fn has_pinned_questions(&self) -> bool {
        !self.question_ids.is_empty()
    }

    pub fn total_score(&self) -> i32 {
        self.scores.iter().map(|s| s.score).sum()
    }

    /// Time spent so far, or in total once completed. Never negative.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).max(Duration::zero())
    }

    pub fn remaining(&self, time_limit: Duration, now: DateTime<Utc>) -> Duration {
        if self.is_completed {
            return Duration::zero();
        }
        (time_limit - self.elapsed(now)).max(Duration::zero())
    }
}
