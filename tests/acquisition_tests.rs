mod common;

use common::{api_candidate, scraped_candidate, stored_question, TestApp};
use exam_prep_server::{
    errors::AppError,
    models::domain::{Question, QuestionSource},
    providers::ProviderError,
    repositories::QuestionRepository,
    services::AcquisitionService,
};

#[tokio::test]
async fn ensure_questions_fills_pool_and_skips_duplicates() {
    let app = TestApp::new();
    app.api.push_questions("2015", [1, 2, 2, 3, 4]).await;

    let questions = app
        .state
        .acquisition_service
        .ensure_questions("jamb", "Mathematics", "2015", 4)
        .await
        .expect("pool should fill");

    assert_eq!(questions.len(), 4);
    assert_eq!(app.questions.len().await, 4);
    assert_eq!(app.api.calls(), 5);
    assert!(questions.iter().all(|q| q.exam_subject == "mathematics"));
    assert!(questions.iter().all(|q| q.source == QuestionSource::Api));
    assert!(questions.iter().all(|q| q.answer_text.as_deref() == Some("Beta")));
}

#[tokio::test]
async fn ensure_questions_is_a_no_op_when_pool_is_full() {
    let app = TestApp::new();
    app.api.push_questions("2015", 1..=4).await;
    let service = &app.state.acquisition_service;

    service
        .ensure_questions("jamb", "mathematics", "2015", 4)
        .await
        .expect("first fill");
    let calls = app.api.calls();

    let again = service
        .ensure_questions("jamb", "mathematics", "2015", 4)
        .await
        .expect("second call");
    assert_eq!(again.len(), 4);
    assert_eq!(app.api.calls(), calls);
}

#[tokio::test]
async fn transient_provider_errors_are_retried_within_the_attempt_budget() {
    let app = TestApp::new();
    app.api.push(Err(ProviderError::RateLimited)).await;
    app.api
        .push(Err(ProviderError::Transport("connection reset".into())))
        .await;
    app.api.push_questions("2015", 1..=4).await;

    let questions = app
        .state
        .acquisition_service
        .ensure_questions("jamb", "physics", "2015", 4)
        .await
        .expect("retries should recover");
    assert_eq!(questions.len(), 4);
}

#[tokio::test]
async fn candidates_without_a_resolvable_answer_are_discarded() {
    let app = TestApp::new();
    let mut unanswered = api_candidate("2015", "9");
    unanswered.answer_text = None;
    app.api.push(Ok(Some(unanswered))).await;
    app.api.push_questions("2015", 1..=4).await;

    let questions = app
        .state
        .acquisition_service
        .ensure_questions("jamb", "physics", "2015", 4)
        .await
        .expect("pool should fill");
    assert!(questions.iter().all(|q| q.provider_local_id != "9"));
}

#[tokio::test]
async fn exhausted_api_reports_external_source_error_but_keeps_what_it_stored() {
    let app = TestApp::new();
    app.api.push_questions("2015", [1]).await;

    let result = app
        .state
        .acquisition_service
        .ensure_questions("jamb", "chemistry", "2015", 4)
        .await;

    assert!(matches!(result, Err(AppError::ExternalSourceError(_))));
    assert_eq!(app.questions.len().await, 1);
    assert_eq!(app.scraper.calls(), 0);
}

#[tokio::test]
async fn session_path_falls_back_to_scraping() {
    let app = TestApp::new();
    app.scraper
        .push_rows(Ok((0..3).map(|row| scraped_candidate("2010", "physics", row)).collect()))
        .await;
    let key = AcquisitionService::question_key("jamb", "physics", "2010").expect("key");

    let questions = app
        .state
        .acquisition_service
        .questions_for_session(&key, 2)
        .await
        .expect("scraper should cover the shortfall");

    assert_eq!(questions.len(), 2);
    assert_eq!(app.scraper.calls(), 1);
    assert!(questions.iter().all(|q| q.source == QuestionSource::Scrape));
    assert!(questions.iter().all(|q| q.answer_text.is_none()));
}

#[tokio::test]
async fn session_path_reports_insufficient_data_when_every_source_is_short() {
    let app = TestApp::new();
    app.scraper
        .push_rows(Ok(vec![scraped_candidate("2010", "biology", 0)]))
        .await;
    let key = AcquisitionService::question_key("jamb", "biology", "2010").expect("key");

    let result = app
        .state
        .acquisition_service
        .questions_for_session(&key, 2)
        .await;
    assert!(matches!(result, Err(AppError::InsufficientData(_))));
}

#[tokio::test]
async fn scraper_failure_ends_in_insufficient_data() {
    let app = TestApp::new();
    app.scraper
        .push_rows(Err(ProviderError::Transport("listing page timed out".into())))
        .await;
    let key = AcquisitionService::question_key("jamb", "economics", "2012").expect("key");

    let result = app
        .state
        .acquisition_service
        .questions_for_session(&key, 2)
        .await;
    assert!(matches!(result, Err(AppError::InsufficientData(_))));
}

#[tokio::test]
async fn rejects_unknown_exam_type_subject_year_and_empty_pool() {
    let app = TestApp::new();
    let service = &app.state.acquisition_service;

    for (exam_type, subject, year, pool) in [
        ("sat", "mathematics", "2015", 4),
        ("jamb", "astrology", "2015", 4),
        ("jamb", "mathematics", "1990", 4),
        ("jamb", "mathematics", "2015", 0),
    ] {
        let result = service.ensure_questions(exam_type, subject, year, pool).await;
        assert!(
            matches!(result, Err(AppError::ValidationError(_))),
            "expected validation error for {}/{}/{}/{}",
            exam_type,
            subject,
            year,
            pool
        );
    }
    assert_eq!(app.api.calls(), 0);
}

#[tokio::test]
async fn stored_questions_reads_without_calling_providers() {
    let app = TestApp::new();
    app.seed_questions("2021", 3).await;

    let stored = app
        .state
        .acquisition_service
        .stored_questions("jamb", "English Language", "2021")
        .await
        .expect("read");
    assert_eq!(stored.len(), 3);
    assert_eq!(app.api.calls(), 0);
}

#[tokio::test]
async fn scrape_fallback_stores_every_subject_of_one_year() {
    let app = TestApp::new();
    for subject in ["physics", "chemistry"] {
        app.scraper
            .push_rows(Ok((0..2).map(|row| scraped_candidate("2021", subject, row)).collect()))
            .await;
    }
    let service = &app.state.acquisition_service;

    for subject in ["physics", "chemistry"] {
        let key = AcquisitionService::question_key("jamb", subject, "2021").expect("key");
        let questions = service
            .questions_for_session(&key, 2)
            .await
            .expect("scraped questions should be stored for each subject");
        assert!(questions.iter().all(|q| q.exam_subject == subject));
    }

    assert_eq!(app.scraper.calls(), 2);
    assert_eq!(app.questions.len().await, 4);
}

#[tokio::test]
async fn store_rejects_a_second_api_row_with_the_same_provider_key() {
    let app = TestApp::new();
    let first = stored_question("api-2021-7", "physics", "2021");
    let mut clash = stored_question("api-2021-7-copy", "chemistry", "2021");
    clash.provider_local_id = first.provider_local_id.clone();

    app.questions.upsert_by_id(first).await.expect("first row");
    let result = app.questions.upsert_by_id(clash).await;
    assert!(matches!(result, Err(AppError::DatabaseError(_))));

    let mut scraped: Question = stored_question("scrape-a", "physics", "2021");
    scraped.source = QuestionSource::Scrape;
    scraped.provider_local_id = "shared".to_string();
    let mut other = stored_question("scrape-b", "chemistry", "2021");
    other.source = QuestionSource::Scrape;
    other.provider_local_id = "shared".to_string();
    app.questions.upsert_by_id(scraped).await.expect("scraped row");
    app.questions.upsert_by_id(other).await.expect("scraped rows are keyed on id only");
}
