use async_graphql::InputObject;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::constants::catalog::{is_supported_year, SUBJECTS_PER_EXAM};

fn validate_exam_year(year: &str) -> Result<(), ValidationError> {
    if is_supported_year(year) {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_exam_year"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct StartExamInput {
    #[validate(length(equal = 4, message = "exactly four subjects are required"))]
    pub subjects: Vec<String>,

    #[validate(custom(function = "validate_exam_year"))]
    pub exam_year: String,

    pub is_competition: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, InputObject)]
pub struct AnswerInput {
    #[validate(length(min = 1, max = 200))]
    pub question_id: String,

    /// A single letter (a-d) or the full option text.
    #[validate(length(min = 1, max = 1000))]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct SubmitAnswersInput {
    #[validate(length(min = 1, max = 100))]
    pub session_id: String,

    #[validate(length(min = 1, max = 400), nested)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct FinishExamInput {
    #[validate(length(min = 1, max = 100))]
    pub session_id: String,

    #[validate(nested)]
    pub answers: Option<Vec<AnswerInput>>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct EnsureQuestionsInput {
    #[validate(length(min = 1, max = 10))]
    pub exam_type: String,

    #[validate(length(min = 1, max = 100))]
    pub subject: String,

    #[validate(custom(function = "validate_exam_year"))]
    pub exam_year: String,

    #[validate(range(min = 1, max = 200))]
    pub pool_size: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct PaginationParams {
    #[validate(range(min = 0))]
    pub offset: Option<i64>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            offset: Some(0),
            limit: Some(20),
        }
    }
}

impl PaginationParams {
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}
