#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use exam_prep_server::{
    app_state::{AppState, Providers, Repositories},
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{
        Answer, ExamSession, ExamType, Question, QuestionKey, QuestionSource, Subject,
        SubjectScore,
    },
    providers::{ProviderError, QuestionCandidate, QuestionScraper, StructuredQuestionSource},
    repositories::{ExamSessionRepository, QuestionRepository, SubjectRepository},
};

pub const SUBJECTS: [&str; 4] = ["english language", "mathematics", "physics", "chemistry"];

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: RwLock<HashMap<String, Question>>,
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.questions.read().await.len()
    }

    /// Mirrors the Mongo indexes: `id` is unique, and `(source, exam_year,
    /// provider_local_id)` is unique among API rows only.
    async fn merge(&self, existing_id: Option<String>, mut question: Question) -> AppResult<Question> {
        question.check_invariants()?;
        let mut questions = self.questions.write().await;

        match existing_id.and_then(|id| questions.get(&id).cloned()) {
            Some(current) => {
                question.id = current.id.clone();
                question.created_at = current.created_at;
                question.answer_text = question.answer_text.or(current.answer_text);
                question.answer_source_url = question.answer_source_url.or(current.answer_source_url);
                question.image_url = question.image_url.or(current.image_url);
            }
            None if questions.contains_key(&question.id) => {
                return Err(duplicate_key("id_unique", &question.id));
            }
            None => {}
        }

        let clashes = question.source == QuestionSource::Api
            && questions.values().any(|q| {
                q.id != question.id
                    && q.source == QuestionSource::Api
                    && q.exam_year == question.exam_year
                    && q.provider_local_id == question.provider_local_id
            });
        if clashes {
            return Err(duplicate_key("provider_key_unique", &question.id));
        }

        questions.insert(question.id.clone(), question.clone());
        Ok(question)
    }
}

fn duplicate_key(index: &str, id: &str) -> AppError {
    AppError::DatabaseError(format!("E11000 duplicate key error index: {} ({})", index, id))
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn upsert_by_provider_key(&self, question: Question) -> AppResult<Question> {
        if question.source != QuestionSource::Api {
            return Err(AppError::InternalError("provider key upsert needs an API question".into()));
        }
        let existing = self
            .questions
            .read()
            .await
            .values()
            .find(|q| {
                q.source == QuestionSource::Api
                    && q.exam_year == question.exam_year
                    && q.provider_local_id == question.provider_local_id
            })
            .map(|q| q.id.clone());
        self.merge(existing, question).await
    }

    async fn upsert_by_id(&self, question: Question) -> AppResult<Question> {
        let existing = Some(question.id.clone());
        self.merge(existing, question).await
    }

    async fn find_by_key(&self, key: &QuestionKey) -> AppResult<Vec<Question>> {
        let mut found: Vec<Question> = self
            .questions
            .read()
            .await
            .values()
            .filter(|q| q.key() == *key)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn count_by_key(&self, key: &QuestionKey) -> AppResult<u64> {
        Ok(self.find_by_key(key).await?.len() as u64)
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Question>> {
        let questions = self.questions.read().await;
        Ok(ids.iter().filter_map(|id| questions.get(id).cloned()).collect())
    }
}

#[derive(Default)]
pub struct InMemorySubjectRepository {
    subjects: RwLock<HashMap<(String, ExamType), Subject>>,
}

impl InMemorySubjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.subjects.read().await.len()
    }
}

#[async_trait]
impl SubjectRepository for InMemorySubjectRepository {
    async fn upsert(&self, name: &str, exam_type: ExamType) -> AppResult<Subject> {
        let mut subjects = self.subjects.write().await;
        Ok(subjects
            .entry((name.to_string(), exam_type))
            .or_insert_with(|| Subject::new(name, exam_type))
            .clone())
    }

    async fn find_by_name(&self, name: &str, exam_type: ExamType) -> AppResult<Option<Subject>> {
        Ok(self
            .subjects
            .read()
            .await
            .get(&(name.to_string(), exam_type))
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryExamSessionRepository {
    sessions: RwLock<HashMap<String, ExamSession>>,
    answers: RwLock<HashMap<(String, String), Answer>>,
    completions: AtomicUsize,
}

impl InMemoryExamSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `complete` actually changed a session.
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExamSessionRepository for InMemoryExamSessionRepository {
    async fn create(&self, session: ExamSession) -> AppResult<ExamSession> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(AppError::AlreadyExists(format!("Exam session '{}'", session.id)));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn upsert_answers(&self, answers: Vec<Answer>) -> AppResult<()> {
        let mut stored = self.answers.write().await;
        for answer in answers {
            stored.insert(
                (answer.session_id.clone(), answer.question_id.clone()),
                answer,
            );
        }
        Ok(())
    }

    async fn find_answers(&self, session_id: &str) -> AppResult<Vec<Answer>> {
        Ok(self
            .answers
            .read()
            .await
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn pin_questions(&self, session_id: &str, question_ids: Vec<String>) -> AppResult<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(session) if !session.is_completed && !session.has_pinned_questions() => {
                session.question_ids = question_ids;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(
        &self,
        session_id: &str,
        end_time: DateTime<Utc>,
        scores: Vec<SubjectScore>,
    ) -> AppResult<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(session) if !session.is_completed => {
                session.is_completed = true;
                session.end_time = Some(end_time);
                session.scores = scores;
                self.completions.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_completed_competitions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<ExamSession>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_completed && s.is_competition)
            .filter(|s| s.start_time >= start && s.start_time < end)
            .cloned()
            .collect())
    }

    async fn list_by_student(
        &self,
        student_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<ExamSession>, i64)> {
        let mut items: Vec<ExamSession> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        let total = items.len() as i64;
        let page = items
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

/// Plays back queued responses, then reports an empty upstream.
#[derive(Default)]
pub struct ScriptedApi {
    responses: Mutex<VecDeque<Result<Option<QuestionCandidate>, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, response: Result<Option<QuestionCandidate>, ProviderError>) {
        self.responses.lock().await.push_back(response);
    }

    pub async fn push_questions(&self, year: &str, ids: impl IntoIterator<Item = u32>) {
        for id in ids {
            self.push(Ok(Some(api_candidate(year, &id.to_string())))).await;
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredQuestionSource for ScriptedApi {
    async fn fetch_one(&self, _key: &QuestionKey) -> Result<Option<QuestionCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses.lock().await.pop_front().unwrap_or(Ok(None))
    }
}

/// Hands out one queued result per scrape call, then empty listings.
#[derive(Default)]
pub struct ScriptedScraper {
    rows: Mutex<VecDeque<Result<Vec<QuestionCandidate>, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_rows(&self, rows: Result<Vec<QuestionCandidate>, ProviderError>) {
        self.rows.lock().await.push_back(rows);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionScraper for ScriptedScraper {
    async fn scrape_subject(&self, _key: &QuestionKey) -> Result<Vec<QuestionCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().await.pop_front().unwrap_or(Ok(Vec::new()))
    }
}

pub fn api_candidate(year: &str, local_id: &str) -> QuestionCandidate {
    QuestionCandidate {
        id: Question::api_id(year, local_id),
        provider_local_id: local_id.to_string(),
        question_text: format!("API question {}", local_id),
        options: vec![
            "Alpha".to_string(),
            "Beta".to_string(),
            "Gamma".to_string(),
            "Delta".to_string(),
        ],
        answer_text: Some("Beta".to_string()),
        answer_source_url: None,
        image_url: None,
    }
}

pub fn scraped_candidate(year: &str, subject: &str, row: usize) -> QuestionCandidate {
    QuestionCandidate {
        id: Question::scrape_id(year, subject, 1, row),
        provider_local_id: format!("{}-1-{}", subject.replace(' ', "-"), row),
        question_text: format!("Scraped question {}", row),
        options: vec!["One".to_string(), "Two".to_string(), "Three".to_string()],
        answer_text: None,
        answer_source_url: Some(format!("http://scrape.test/answer/{}", row)),
        image_url: None,
    }
}

/// Stored question whose correct answer is always the second option ("b").
pub fn stored_question(id: &str, subject: &str, year: &str) -> Question {
    Question {
        id: id.to_string(),
        source: QuestionSource::Api,
        provider_local_id: id.to_string(),
        exam_type: ExamType::Jamb,
        exam_subject: subject.to_string(),
        exam_year: year.to_string(),
        question_text: format!("Question {}", id),
        options: vec![
            "Option A".to_string(),
            "Option B".to_string(),
            "Option C".to_string(),
            "Option D".to_string(),
        ],
        answer_text: Some("Option B".to_string()),
        answer_source_url: None,
        image_url: None,
        created_at: Some(Utc::now()),
        modified_at: Some(Utc::now()),
    }
}

pub struct TestApp {
    pub state: AppState,
    pub questions: Arc<InMemoryQuestionRepository>,
    pub subjects: Arc<InMemorySubjectRepository>,
    pub sessions: Arc<InMemoryExamSessionRepository>,
    pub api: Arc<ScriptedApi>,
    pub scraper: Arc<ScriptedScraper>,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = Config::test_config();
        config.questions_per_subject = 2;
        config.acquisition_batch_size = 4;
        config.acquisition_max_attempts_per_batch = 8;
        config.acquisition_total_target = 4;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        let questions = Arc::new(InMemoryQuestionRepository::new());
        let subjects = Arc::new(InMemorySubjectRepository::new());
        let sessions = Arc::new(InMemoryExamSessionRepository::new());
        let api = Arc::new(ScriptedApi::new());
        let scraper = Arc::new(ScriptedScraper::new());

        let state = AppState::from_parts(
            config,
            Repositories {
                questions: questions.clone(),
                subjects: subjects.clone(),
                sessions: sessions.clone(),
            },
            Providers {
                api: api.clone(),
                scraper: scraper.clone(),
            },
        );

        Self {
            state,
            questions,
            subjects,
            sessions,
            api,
            scraper,
        }
    }

    /// Stores `per_subject` questions for each exam subject in `year`, ids `<subject>-<n>`.
    pub async fn seed_questions(&self, year: &str, per_subject: usize) {
        for subject in SUBJECTS {
            for n in 0..per_subject {
                let id = format!("{}-{}", subject.replace(' ', "-"), n);
                self.questions
                    .upsert_by_id(stored_question(&id, subject, year))
                    .await
                    .expect("seed question");
            }
        }
    }
}

pub fn exam_subjects() -> Vec<String> {
    SUBJECTS.iter().map(|s| s.to_string()).collect()
}
