pub mod api_client;
pub mod blob_store;
pub mod scrape_client;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::models::domain::{
    question::{MAX_OPTIONS, MIN_OPTIONS},
    Question, QuestionKey, QuestionSource,
};

pub use api_client::ApiQuestionClient;
pub use blob_store::LocalBlobStore;
pub use scrape_client::{HttpPageFetcher, ScrapeQuestionClient};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Blob storage error: {0}")]
    Storage(String),
}

impl ProviderError {
    /// Errors worth backing off on before the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transport(_) | ProviderError::RateLimited)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            ProviderError::RateLimited
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// A question parsed from a provider but not yet validated or stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCandidate {
    pub id: String,
    pub provider_local_id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub answer_text: Option<String>,
    pub answer_source_url: Option<String>,
    pub image_url: Option<String>,
}

impl QuestionCandidate {
    pub fn validate(&self, require_answer: bool) -> Result<(), ProviderError> {
        if self.provider_local_id.trim().is_empty() {
            return Err(ProviderError::Malformed("candidate has no id".to_string()));
        }
        if self.question_text.trim().is_empty() {
            return Err(ProviderError::Malformed(format!(
                "candidate '{}' has no question text",
                self.id
            )));
        }
        let usable = self.options.iter().filter(|o| !o.trim().is_empty()).count();
        if usable != self.options.len() || usable < MIN_OPTIONS || usable > MAX_OPTIONS {
            return Err(ProviderError::Malformed(format!(
                "candidate '{}' has {} usable options",
                self.id, usable
            )));
        }
        match &self.answer_text {
            Some(answer) if !self.options.contains(answer) => Err(ProviderError::Malformed(
                format!("answer of candidate '{}' is not one of its options", self.id),
            )),
            None if require_answer => Err(ProviderError::Malformed(format!(
                "candidate '{}' has no resolvable answer",
                self.id
            ))),
            _ => Ok(()),
        }
    }

    pub fn into_question(self, source: QuestionSource, key: &QuestionKey) -> Question {
        let now = Utc::now();
        Question {
            id: self.id,
            source,
            provider_local_id: self.provider_local_id,
            exam_type: key.exam_type,
            exam_subject: key.subject.clone(),
            exam_year: key.year.clone(),
            question_text: self.question_text,
            options: self.options,
            answer_text: self.answer_text,
            answer_source_url: self.answer_source_url,
            image_url: self.image_url,
            created_at: Some(now),
            modified_at: Some(now),
        }
    }
}

/// Provider A: one question per call from a rate-limited question bank.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StructuredQuestionSource: Send + Sync {
    /// `Ok(None)` when the upstream has nothing for the key.
    async fn fetch_one(&self, key: &QuestionKey) -> Result<Option<QuestionCandidate>, ProviderError>;
}

/// Provider B: paginated listing scrape followed by per-question enrichment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionScraper: Send + Sync {
    async fn scrape_subject(&self, key: &QuestionKey) -> Result<Vec<QuestionCandidate>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, ProviderError>;
    /// Body bytes plus the response content type, if any.
    async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the bytes and returns their stable public URL.
    async fn upload(&self, bytes: Vec<u8>, extension: &str) -> Result<String, ProviderError>;
}
