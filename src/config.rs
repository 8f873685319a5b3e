use std::{env, str::FromStr, time::Duration};

use secrecy::SecretString;

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub question_api_base_url: String,
    pub question_api_token: SecretString,
    pub scrape_base_url: String,
    pub scrape_max_pages: usize,
    pub scrape_enrich_delay_ms: u64,
    pub image_storage_dir: String,
    pub image_public_base_url: String,
    pub provider_timeout_secs: u64,
    pub acquisition_batch_size: usize,
    pub acquisition_max_batches: usize,
    pub acquisition_max_attempts_per_batch: usize,
    pub acquisition_total_target: usize,
    pub acquisition_retry_delay_ms: u64,
    pub exam_time_limit_minutes: i64,
    pub questions_per_subject: usize,
}

/// Knobs for the quota-driven acquisition loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquisitionSettings {
    pub batch_size: usize,
    pub max_batches: usize,
    pub max_attempts_per_batch: usize,
    pub total_target: usize,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl AcquisitionSettings {
    /// Backoff before the next attempt after `consecutive_failures` transient errors.
    pub fn delay_for_failure(&self, consecutive_failures: usize) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let shift = (consecutive_failures - 1).min(16) as u32;
        self.retry_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_retry_delay)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub max_pages: usize,
    pub enrich_delay: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamRules {
    pub time_limit: chrono::Duration,
    pub questions_per_subject: usize,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "exam-prep-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env_or("WEB_SERVER_PORT", 8080),
            jwt_secret: SecretString::from(env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev_secret_key_change_in_production".to_string())),
            jwt_expiration_hours: env_or("JWT_EXPIRATION_HOURS", 24),
            question_api_base_url: env::var("QUESTION_API_BASE_URL")
                .unwrap_or_else(|_| "https://questions.aloc.com.ng/api/v2".to_string()),
            question_api_token: SecretString::from(env::var("QUESTION_API_TOKEN")
                .unwrap_or_else(|_| "question_api_token".to_string())),
            scrape_base_url: env::var("SCRAPE_BASE_URL")
                .unwrap_or_else(|_| "https://myschool.ng/classroom".to_string()),
            scrape_max_pages: env_or("SCRAPE_MAX_PAGES", 50),
            scrape_enrich_delay_ms: env_or("SCRAPE_ENRICH_DELAY_MS", 200),
            image_storage_dir: env::var("IMAGE_STORAGE_DIR")
                .unwrap_or_else(|_| "./storage/question-images".to_string()),
            image_public_base_url: env::var("IMAGE_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/images".to_string()),
            provider_timeout_secs: env_or("PROVIDER_TIMEOUT_SECS", 10),
            acquisition_batch_size: env_or("ACQUISITION_BATCH_SIZE", 20),
            acquisition_max_batches: env_or("ACQUISITION_MAX_BATCHES", 2),
            acquisition_max_attempts_per_batch: env_or("ACQUISITION_MAX_ATTEMPTS_PER_BATCH", 40),
            acquisition_total_target: env_or("ACQUISITION_TOTAL_TARGET", 40),
            acquisition_retry_delay_ms: env_or("ACQUISITION_RETRY_DELAY_MS", 250),
            exam_time_limit_minutes: env_or("EXAM_TIME_LIMIT_MINUTES", 90),
            questions_per_subject: env_or("QUESTIONS_PER_SUBJECT", 20),
        }
    }

    pub fn acquisition_settings(&self) -> AcquisitionSettings {
        AcquisitionSettings {
            batch_size: self.acquisition_batch_size.max(1),
            max_batches: self.acquisition_max_batches.max(1),
            max_attempts_per_batch: self
                .acquisition_max_attempts_per_batch
                .max(self.acquisition_batch_size),
            total_target: self.acquisition_total_target,
            retry_delay: Duration::from_millis(self.acquisition_retry_delay_ms),
            max_retry_delay: Duration::from_secs(5),
        }
    }

    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            base_url: self.scrape_base_url.trim_end_matches('/').to_string(),
            max_pages: self.scrape_max_pages.max(1),
            enrich_delay: Duration::from_millis(self.scrape_enrich_delay_ms),
        }
    }

    pub fn exam_rules(&self) -> ExamRules {
        ExamRules {
            time_limit: chrono::Duration::minutes(self.exam_time_limit_minutes),
            questions_per_subject: self.questions_per_subject.max(1),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == "dev_secret_key_change_in_production" {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.question_api_token.expose_secret() == "question_api_token" {
            panic!(
                "FATAL: QUESTION_API_TOKEN is using default value! Set QUESTION_API_TOKEN environment variable."
            );
        }
    }

    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "exam-prep-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            question_api_base_url: "http://127.0.0.1:9/api/v2".to_string(),
            question_api_token: SecretString::from("test-token".to_string()),
            scrape_base_url: "http://scrape.test/classroom".to_string(),
            scrape_max_pages: 5,
            scrape_enrich_delay_ms: 0,
            image_storage_dir: "./target/test-images".to_string(),
            image_public_base_url: "http://cdn.test/images".to_string(),
            provider_timeout_secs: 1,
            acquisition_batch_size: 20,
            acquisition_max_batches: 2,
            acquisition_max_attempts_per_batch: 40,
            acquisition_total_target: 40,
            acquisition_retry_delay_ms: 0,
            exam_time_limit_minutes: 90,
            questions_per_subject: 20,
        }
    }
}
