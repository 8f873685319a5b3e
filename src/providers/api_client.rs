use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    constants::catalog::find_subject,
    models::domain::{Question, QuestionKey},
    providers::{ProviderError, QuestionCandidate, StructuredQuestionSource},
    services::answer_normalization::option_for_letter,
};

const ACCESS_TOKEN_HEADER: &str = "AccessToken";

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    data: Option<ApiPayload>,
}

/// The upstream returns `data` either as one object or as an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiPayload {
    Single(ApiQuestion),
    Many(Vec<ApiQuestion>),
}

impl ApiPayload {
    fn into_first(self) -> Option<ApiQuestion> {
        match self {
            ApiPayload::Single(question) => Some(question),
            ApiPayload::Many(questions) => questions.into_iter().next(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiId {
    Number(i64),
    Text(String),
}

impl ApiId {
    fn into_string(self) -> String {
        match self {
            ApiId::Number(n) => n.to_string(),
            ApiId::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiOptions {
    a: Option<String>,
    b: Option<String>,
    c: Option<String>,
    d: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiQuestion {
    id: ApiId,
    question: String,
    #[serde(default)]
    option: ApiOptions,
    answer: Option<String>,
    image: Option<String>,
}

impl ApiQuestion {
    /// Options keep their a..d positions; a blank slot ends the list.
    fn options(&self) -> Vec<String> {
        [&self.option.a, &self.option.b, &self.option.c, &self.option.d]
            .into_iter()
            .map(|o| o.as_deref().map(str::trim).unwrap_or_default())
            .take_while(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn into_candidate(self, year: &str) -> QuestionCandidate {
        let options = self.options();
        let answer_text = self
            .answer
            .as_deref()
            .and_then(|letter| option_for_letter(&options, letter));
        let image_url = self
            .image
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let provider_local_id = self.id.into_string();

        QuestionCandidate {
            id: Question::api_id(year, &provider_local_id),
            provider_local_id,
            question_text: self.question.trim().to_string(),
            options,
            answer_text,
            answer_source_url: None,
            image_url,
        }
    }
}

fn decode_candidate(body: &str, year: &str) -> Result<Option<QuestionCandidate>, ProviderError> {
    let envelope: ApiEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    Ok(envelope
        .data
        .and_then(ApiPayload::into_first)
        .map(|question| question.into_candidate(year)))
}

pub struct ApiQuestionClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl ApiQuestionClient {
    /// `http` should carry the per-call timeout.
    pub fn new(http: reqwest::Client, base_url: &str, token: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl StructuredQuestionSource for ApiQuestionClient {
    async fn fetch_one(&self, key: &QuestionKey) -> Result<Option<QuestionCandidate>, ProviderError> {
        let subject = find_subject(&key.subject)
            .ok_or_else(|| ProviderError::Malformed(format!("unknown subject '{}'", key.subject)))?;

        let response = self
            .http
            .get(format!("{}/q", self.base_url))
            .header(ACCESS_TOKEN_HEADER, self.token.expose_secret())
            .header("Accept", "application/json")
            .query(&[
                ("subject", subject.api_code),
                ("year", key.year.as_str()),
                ("type", key.exam_type.api_type_code()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "question API responded with {}",
                status
            )));
        }

        let body = response.text().await?;
        decode_candidate(&body, &key.year)
    }
}
