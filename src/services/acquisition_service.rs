use std::{collections::HashSet, str::FromStr, sync::Arc};

use rand::seq::SliceRandom;

use crate::{
    config::AcquisitionSettings,
    constants::catalog::{validate_subject, validate_year},
    errors::{AppError, AppResult},
    models::domain::{ExamType, Question, QuestionKey, QuestionSource},
    providers::{QuestionScraper, StructuredQuestionSource},
    repositories::QuestionRepository,
};

/// Keeps question pools filled per `(exam type, subject, year)`, pulling from
/// the structured API first and the scraper as the session-path fallback.
/// Callers only ever see questions read back from the store.
pub struct AcquisitionService {
    questions: Arc<dyn QuestionRepository>,
    api: Arc<dyn StructuredQuestionSource>,
    scraper: Arc<dyn QuestionScraper>,
    settings: AcquisitionSettings,
}

impl AcquisitionService {
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        api: Arc<dyn StructuredQuestionSource>,
        scraper: Arc<dyn QuestionScraper>,
        settings: AcquisitionSettings,
    ) -> Self {
        Self {
            questions,
            api,
            scraper,
            settings,
        }
    }

    pub fn default_pool(&self) -> usize {
        self.settings.total_target
    }

    /// Validates raw caller input into a pool key.
    pub fn question_key(exam_type: &str, subject: &str, year: &str) -> AppResult<QuestionKey> {
        let exam_type = ExamType::from_str(exam_type)?;
        let subject = validate_subject(subject)?;
        let year = validate_year(year)?;
        Ok(QuestionKey::new(exam_type, subject.slug, year))
    }

    /// Primary path: structured API only. Fails with `ExternalSourceError`
    /// when the pool is still short after every batch.
    pub async fn ensure_questions(
        &self,
        exam_type: &str,
        subject: &str,
        year: &str,
        pool: usize,
    ) -> AppResult<Vec<Question>> {
        let key = Self::question_key(exam_type, subject, year)?;
        Self::check_pool(pool)?;

        self.fill_from_api(&key, pool).await?;
        self.read_pool(&key, pool).await
    }

    /// What the store already holds for a key, without touching any provider.
    pub async fn stored_questions(
        &self,
        exam_type: &str,
        subject: &str,
        year: &str,
    ) -> AppResult<Vec<Question>> {
        let key = Self::question_key(exam_type, subject, year)?;
        self.questions.find_by_key(&key).await
    }

    /// Session path: like `ensure_questions`, but an exhausted API falls back
    /// to the scraper. Still short afterwards is `InsufficientData`.
    pub async fn questions_for_session(&self, key: &QuestionKey, count: usize) -> AppResult<Vec<Question>> {
        Self::check_pool(count)?;

        match self.fill_from_api(key, count).await {
            Ok(()) => {}
            Err(AppError::ExternalSourceError(reason)) => {
                log::warn!("Falling back to scraping for {}: {}", key, reason);
                self.fill_from_scrape(key).await?;
            }
            Err(err) => return Err(err),
        }

        let questions = self.read_pool(key, count).await?;
        if questions.len() < count {
            return Err(AppError::InsufficientData(format!(
                "Only {} of {} questions available for {}",
                questions.len(),
                count,
                key
            )));
        }
        Ok(questions)
    }

    fn check_pool(pool: usize) -> AppResult<()> {
        if pool == 0 {
            return Err(AppError::ValidationError(
                "Requested pool size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    async fn read_pool(&self, key: &QuestionKey, count: usize) -> AppResult<Vec<Question>> {
        let mut questions = self.questions.find_by_key(key).await?;
        let mut ids = HashSet::new();
        questions.retain(|q| ids.insert(q.id.clone()));
        questions.shuffle(&mut rand::thread_rng());
        questions.truncate(count);
        Ok(questions)
    }

    async fn fill_from_api(&self, key: &QuestionKey, pool: usize) -> AppResult<()> {
        if self.questions.count_by_key(key).await? as usize >= pool {
            return Ok(());
        }

        let existing = self.questions.find_by_key(key).await?;
        let mut stored = existing.len();
        let mut seen: HashSet<String> = existing
            .into_iter()
            .filter(|q| q.source == QuestionSource::Api)
            .map(|q| q.provider_local_id)
            .collect();

        for batch in 0..self.settings.max_batches {
            if stored >= pool {
                break;
            }
            let added = self.run_api_batch(key, &mut seen, pool - stored).await?;
            log::info!(
                "API batch {} for {} added {} questions ({} stored, {} wanted)",
                batch + 1,
                key,
                added,
                stored + added,
                pool
            );
            stored += added;
        }

        if stored < pool {
            return Err(AppError::ExternalSourceError(format!(
                "Question API yielded only {} of {} questions for {}",
                stored, pool, key
            )));
        }
        Ok(())
    }

    /// One attempt-bounded batch. Invalid, missing and duplicate candidates
    /// and transient errors all use up an attempt.
    async fn run_api_batch(
        &self,
        key: &QuestionKey,
        seen: &mut HashSet<String>,
        needed: usize,
    ) -> AppResult<usize> {
        let target = self.settings.batch_size.min(needed);
        let mut accepted = 0;
        let mut attempts = 0;
        let mut consecutive_failures = 0;

        while accepted < target && attempts < self.settings.max_attempts_per_batch {
            attempts += 1;

            let candidate = match self.api.fetch_one(key).await {
                Ok(Some(candidate)) => {
                    consecutive_failures = 0;
                    candidate
                }
                Ok(None) => {
                    log::debug!("Question API had nothing for {}", key);
                    continue;
                }
                Err(err) if err.is_transient() => {
                    consecutive_failures += 1;
                    let delay = self.settings.delay_for_failure(consecutive_failures);
                    log::warn!(
                        "Question API attempt {} for {} failed: {} (retrying in {:?})",
                        attempts,
                        key,
                        err,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
                Err(err) => {
                    log::debug!("Discarding API response for {}: {}", key, err);
                    continue;
                }
            };

            if let Err(err) = candidate.validate(true) {
                log::debug!("Discarding invalid candidate for {}: {}", key, err);
                continue;
            }
            if !seen.insert(candidate.provider_local_id.clone()) {
                log::debug!("Discarding duplicate candidate {} for {}", candidate.id, key);
                continue;
            }

            let question = candidate.into_question(QuestionSource::Api, key);
            self.questions.upsert_by_provider_key(question).await?;
            accepted += 1;
        }

        Ok(accepted)
    }

    async fn fill_from_scrape(&self, key: &QuestionKey) -> AppResult<usize> {
        let candidates = match self.scraper.scrape_subject(key).await {
            Ok(candidates) => candidates,
            Err(err) => {
                log::warn!("Scraping {} failed: {}", key, err);
                return Ok(0);
            }
        };

        let mut stored = 0;
        for candidate in candidates {
            if let Err(err) = candidate.validate(false) {
                log::debug!("Skipping scraped row {}: {}", candidate.id, err);
                continue;
            }
            self.questions
                .upsert_by_id(candidate.into_question(QuestionSource::Scrape, key))
                .await?;
            stored += 1;
        }

        log::info!("Stored {} scraped questions for {}", stored, key);
        Ok(stored)
    }
}
