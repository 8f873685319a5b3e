use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::ExamRules,
    models::domain::{ExamSession, ExamType, Question, SubjectScore},
    services::duration_format::format_duration,
};

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct ExamSessionDto {
    pub id: String,
    pub student_id: String,
    pub exam_type: ExamType,
    pub subjects: Vec<String>,
    pub exam_year: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub is_competition: bool,
    pub scores: Vec<SubjectScore>,
    pub total_score: i32,
    pub remaining_time: String,
}

impl ExamSessionDto {
    pub fn from_session(session: ExamSession, rules: &ExamRules, now: DateTime<Utc>) -> Self {
        let remaining_time = format_duration(session.remaining(rules.time_limit, now));
        let total_score = session.total_score();
        ExamSessionDto {
            id: session.id,
            student_id: session.student_id,
            exam_type: session.exam_type,
            subjects: session.subjects,
            exam_year: session.exam_year,
            start_time: session.start_time,
            end_time: session.end_time,
            is_completed: session.is_completed,
            is_competition: session.is_competition,
            scores: session.scores,
            total_score,
            remaining_time,
        }
    }
}

/// A question as shown to a student sitting an exam: no answer fields.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct ExamQuestionDto {
    pub id: String,
    pub exam_subject: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub image_url: Option<String>,
}

impl From<Question> for ExamQuestionDto {
    fn from(question: Question) -> Self {
        ExamQuestionDto {
            id: question.id,
            exam_subject: question.exam_subject,
            question_text: question.question_text,
            options: question.options,
            image_url: question.image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SubjectQuestionsDto {
    pub exam_subject: String,
    pub questions: Vec<ExamQuestionDto>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct ExamResult {
    pub session_id: String,
    pub total_score: i32,
    pub subject_scores: Vec<SubjectScore>,
    pub time_taken: String,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PaginationMetadata {
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PaginatedExamSessions {
    pub data: Vec<ExamSessionDto>,
    pub pagination: PaginationMetadata,
}
