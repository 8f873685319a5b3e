use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::{AppError, AppResult},
    providers::{
        ApiQuestionClient, HttpPageFetcher, LocalBlobStore, QuestionScraper, ScrapeQuestionClient,
        StructuredQuestionSource,
    },
    repositories::{
        ExamSessionRepository, MongoExamSessionRepository, MongoQuestionRepository,
        MongoSubjectRepository, QuestionRepository, SubjectRepository,
    },
    services::{AcquisitionService, ExamSessionService, LeaderboardService, SessionLocks},
};

pub struct Repositories {
    pub questions: Arc<dyn QuestionRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub sessions: Arc<dyn ExamSessionRepository>,
}

pub struct Providers {
    pub api: Arc<dyn StructuredQuestionSource>,
    pub scraper: Arc<dyn QuestionScraper>,
}

#[derive(Clone)]
pub struct AppState {
    pub acquisition_service: Arc<AcquisitionService>,
    pub exam_session_service: Arc<ExamSessionService>,
    pub leaderboard_service: Arc<LeaderboardService>,
    pub jwt_service: Arc<JwtService>,
    pub config: Arc<Config>,
    pub db: Option<Database>, // None when running on injected repositories
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let question_repository = Arc::new(MongoQuestionRepository::new(&db));
        question_repository.ensure_indexes().await?;
        let subject_repository = Arc::new(MongoSubjectRepository::new(&db));
        subject_repository.ensure_indexes().await?;
        let session_repository = Arc::new(MongoExamSessionRepository::new(&db));
        session_repository.ensure_indexes().await?;

        let http = reqwest::Client::builder()
            .timeout(config.provider_timeout())
            .user_agent(concat!("exam-prep-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        let api = Arc::new(ApiQuestionClient::new(
            http.clone(),
            &config.question_api_base_url,
            config.question_api_token.clone(),
        ));
        let blob_store = Arc::new(LocalBlobStore::new(
            &config.image_storage_dir,
            &config.image_public_base_url,
        ));
        let scraper = Arc::new(ScrapeQuestionClient::new(
            Arc::new(HttpPageFetcher::new(http)),
            blob_store,
            config.scrape_settings(),
        ));

        let mut state = Self::from_parts(
            config,
            Repositories {
                questions: question_repository,
                subjects: subject_repository,
                sessions: session_repository,
            },
            Providers { api, scraper },
        );
        state.db = Some(db);
        Ok(state)
    }

    /// Wires the services over the given storage and providers.
    pub fn from_parts(config: Config, repositories: Repositories, providers: Providers) -> Self {
        let acquisition_service = Arc::new(AcquisitionService::new(
            repositories.questions.clone(),
            providers.api,
            providers.scraper,
            config.acquisition_settings(),
        ));
        let exam_session_service = Arc::new(ExamSessionService::new(
            repositories.sessions.clone(),
            repositories.questions,
            repositories.subjects,
            acquisition_service.clone(),
            Arc::new(SessionLocks::new()),
            config.exam_rules(),
        ));
        let leaderboard_service = Arc::new(LeaderboardService::new(repositories.sessions));
        let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_expiration_hours));

        Self {
            acquisition_service,
            exam_session_service,
            leaderboard_service,
            jwt_service,
            config: Arc::new(config),
            db: None,
        }
    }
}
