use std::fmt;

use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{AppError, AppResult},
    models::domain::ExamType,
};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Api,
    Scrape,
}

/// The pool a question belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QuestionKey {
    pub exam_type: ExamType,
    pub subject: String,
    pub year: String,
}

impl QuestionKey {
    pub fn new(exam_type: ExamType, subject: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            exam_type,
            subject: subject.into(),
            year: year.into(),
        }
    }

    pub fn matches(&self, question: &Question) -> bool {
        question.exam_type == self.exam_type
            && question.exam_subject == self.subject
            && question.exam_year == self.year
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.exam_type, self.subject, self.year)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Question {
    pub id: String,
    pub source: QuestionSource,
    pub provider_local_id: String,
    pub exam_type: ExamType,
    pub exam_subject: String,
    pub exam_year: String,
    pub question_text: String,
    pub options: Vec<String>, // order encodes A/B/C/D
    pub answer_text: Option<String>,
    pub answer_source_url: Option<String>,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn api_id(year: &str, provider_local_id: &str) -> String {
        format!("api-{}-{}", year, provider_local_id)
    }

    pub fn scrape_id(year: &str, subject: &str, page_index: usize, row_index: usize) -> String {
        format!(
            "scrape-{}-{}-{}-{}",
            year,
            subject.replace(' ', "-"),
            page_index,
            row_index
        )
    }

    pub fn key(&self) -> QuestionKey {
        QuestionKey::new(self.exam_type, &self.exam_subject, &self.exam_year)
    }

    /// Options must number 2-4 and a stored answer must be one of them, never a bare letter.
    pub fn check_invariants(&self) -> AppResult<()> {
        if self.options.len() < MIN_OPTIONS || self.options.len() > MAX_OPTIONS {
            return Err(AppError::ValidationError(format!(
                "Question '{}' has {} options, expected {}-{}",
                self.id,
                self.options.len(),
                MIN_OPTIONS,
                MAX_OPTIONS
            )));
        }
        if let Some(answer) = &self.answer_text {
            if !self.options.iter().any(|o| o == answer) {
                return Err(AppError::ValidationError(format!(
                    "Answer of question '{}' is not one of its options",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], answer: Option<&str>) -> Question {
        Question {
            id: Question::api_id("2021", "17"),
            source: QuestionSource::Api,
            provider_local_id: "17".to_string(),
            exam_type: ExamType::Jamb,
            exam_subject: "geography".to_string(),
            exam_year: "2021".to_string(),
            question_text: "Capital of France?".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer_text: answer.map(|a| a.to_string()),
            answer_source_url: None,
            image_url: None,
            created_at: None,
            modified_at: None,
        }
    }

    #[test]
    fn ids_are_deterministic() {
        assert_eq!(Question::api_id("2021", "17"), "api-2021-17");
        assert_eq!(
            Question::scrape_id("2019", "english language", 2, 5),
            "scrape-2019-english-language-2-5"
        );
    }

    #[test]
    fn answer_must_be_an_option() {
        assert!(question(&["Paris", "London"], Some("Paris")).check_invariants().is_ok());
        assert!(question(&["Paris", "London"], None).check_invariants().is_ok());

        let letter = question(&["Paris", "London"], Some("a")).check_invariants();
        assert!(matches!(letter, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn option_count_is_bounded() {
        assert!(question(&["Paris"], None).check_invariants().is_err());
        assert!(question(&["a", "b", "c", "d", "e"], None).check_invariants().is_err());
    }

    #[test]
    fn key_display_is_readable() {
        let q = question(&["Paris", "London"], None);
        assert_eq!(q.key().to_string(), "jamb/geography/2021");
    }
}
