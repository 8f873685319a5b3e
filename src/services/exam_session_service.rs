use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::Utc;

use crate::{
    config::ExamRules,
    constants::catalog::{subject_display_name, validate_exam_subjects, validate_year},
    errors::{AppError, AppResult},
    models::{
        domain::{Answer, ExamSession, ExamType, Question, QuestionKey, SubjectScore},
        dto::{
            request::AnswerInput,
            response::{
                ExamQuestionDto, ExamResult, ExamSessionDto, PaginatedExamSessions,
                PaginationMetadata, SubjectQuestionsDto,
            },
        },
    },
    repositories::{ExamSessionRepository, QuestionRepository, SubjectRepository},
    services::{
        acquisition_service::AcquisitionService, answer_normalization::is_correct,
        duration_format::format_duration, session_locks::SessionLocks,
    },
};

pub struct ExamSessionService {
    sessions: Arc<dyn ExamSessionRepository>,
    questions: Arc<dyn QuestionRepository>,
    subjects: Arc<dyn SubjectRepository>,
    acquisition: Arc<AcquisitionService>,
    locks: Arc<SessionLocks>,
    rules: ExamRules,
}

impl ExamSessionService {
    pub fn new(
        sessions: Arc<dyn ExamSessionRepository>,
        questions: Arc<dyn QuestionRepository>,
        subjects: Arc<dyn SubjectRepository>,
        acquisition: Arc<AcquisitionService>,
        locks: Arc<SessionLocks>,
        rules: ExamRules,
    ) -> Self {
        Self {
            sessions,
            questions,
            subjects,
            acquisition,
            locks,
            rules,
        }
    }

    pub fn rules(&self) -> &ExamRules {
        &self.rules
    }

    pub async fn start_exam(
        &self,
        student_id: &str,
        subjects: &[String],
        exam_year: &str,
        is_competition: bool,
    ) -> AppResult<ExamSession> {
        let subjects = validate_exam_subjects(subjects)?;
        let exam_year = validate_year(exam_year)?;

        let session = ExamSession::start(student_id, ExamType::Jamb, subjects, &exam_year, is_competition);
        let session = self.sessions.create(session).await?;

        log::info!(
            "Student {} started exam session {} ({})",
            student_id,
            session.id,
            session.exam_year
        );
        Ok(session)
    }

    pub async fn submit_answers(
        &self,
        student_id: &str,
        session_id: &str,
        answers: &[AnswerInput],
    ) -> AppResult<bool> {
        let _guard = self.locks.acquire(session_id).await;

        let session = self.load_owned(student_id, session_id).await?;
        session.ensure_open()?;
        self.record_answers(&session, answers).await?;
        Ok(true)
    }

    pub async fn finish_exam(
        &self,
        student_id: &str,
        session_id: &str,
        final_answers: Option<&[AnswerInput]>,
    ) -> AppResult<ExamResult> {
        let _guard = self.locks.acquire(session_id).await;

        let session = self.load_owned(student_id, session_id).await?;
        session.ensure_open()?;
        if let Some(answers) = final_answers {
            self.record_answers(&session, answers).await?;
        }

        let scores = self.score_session(&session).await?;
        let end_time = Utc::now();

        // Conditional on the session still being open, so a finish racing in
        // from another process cannot score twice.
        if !self.sessions.complete(&session.id, end_time, scores.clone()).await? {
            return Err(AppError::InvalidState(format!(
                "Exam session '{}' is already completed",
                session.id
            )));
        }

        let total_score: i32 = scores.iter().map(|s| s.score).sum();
        log::info!(
            "Exam session {} finished with total score {}",
            session.id,
            total_score
        );

        Ok(ExamResult {
            session_id: session.id.clone(),
            total_score,
            subject_scores: scores,
            time_taken: format_duration(end_time - session.start_time),
        })
    }

    pub async fn session(&self, student_id: &str, session_id: &str) -> AppResult<ExamSessionDto> {
        let session = self.load_owned(student_id, session_id).await?;
        Ok(ExamSessionDto::from_session(session, &self.rules, Utc::now()))
    }

    /// Questions for each subject of the session, answers hidden. The first
    /// draw is pinned on the session; later calls return the same questions.
    pub async fn session_questions(
        &self,
        student_id: &str,
        session_id: &str,
    ) -> AppResult<Vec<SubjectQuestionsDto>> {
        let _guard = self.locks.acquire(session_id).await;

        let mut session = self.load_owned(student_id, session_id).await?;
        if !session.has_pinned_questions() {
            let drawn = self.draw_questions(&session).await?;
            let ids: Vec<String> = drawn
                .iter()
                .flat_map(|(_, questions)| questions.iter().map(|q| q.id.clone()))
                .collect();
            if session.is_completed
                || ids.is_empty()
                || self.sessions.pin_questions(&session.id, ids).await?
            {
                return Ok(group_dtos(drawn));
            }
            // Pinned or completed from another process in the meantime.
            session = self.load_owned(student_id, session_id).await?;
            if !session.has_pinned_questions() {
                return Ok(group_dtos(drawn));
            }
        }

        self.pinned_questions(&session).await
    }

    pub async fn list_sessions(
        &self,
        student_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<PaginatedExamSessions> {
        let (sessions, total) = self.sessions.list_by_student(student_id, offset, limit).await?;
        let now = Utc::now();

        Ok(PaginatedExamSessions {
            data: sessions
                .into_iter()
                .map(|s| ExamSessionDto::from_session(s, &self.rules, now))
                .collect(),
            pagination: PaginationMetadata {
                offset,
                limit,
                total,
            },
        })
    }

    async fn load_owned(&self, student_id: &str, session_id: &str) -> AppResult<ExamSession> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam session '{}' not found", session_id)))?;

        if !session.is_owned_by(student_id) {
            return Err(AppError::Forbidden("unauthorized".to_string()));
        }
        Ok(session)
    }

    async fn draw_questions(&self, session: &ExamSession) -> AppResult<Vec<(String, Vec<Question>)>> {
        let mut drawn = Vec::with_capacity(session.subjects.len());
        for subject in &session.subjects {
            let key = QuestionKey::new(session.exam_type, subject, &session.exam_year);
            let questions = self
                .acquisition
                .questions_for_session(&key, self.rules.questions_per_subject)
                .await?;
            drawn.push((subject.clone(), questions));
        }
        Ok(drawn)
    }

    async fn pinned_questions(&self, session: &ExamSession) -> AppResult<Vec<SubjectQuestionsDto>> {
        let mut by_id: HashMap<String, Question> = self
            .questions
            .find_by_ids(&session.question_ids)
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect();

        let groups = session
            .subjects
            .iter()
            .map(|subject| {
                let key = QuestionKey::new(session.exam_type, subject, &session.exam_year);
                let questions = session
                    .question_ids
                    .iter()
                    .filter_map(|id| {
                        let in_subject = by_id.get(id).is_some_and(|q| key.matches(q));
                        if in_subject {
                            by_id.remove(id)
                        } else {
                            None
                        }
                    })
                    .collect();
                (subject.clone(), questions)
            })
            .collect();
        Ok(group_dtos(groups))
    }

    async fn record_answers(&self, session: &ExamSession, answers: &[AnswerInput]) -> AppResult<()> {
        if answers.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = answers
            .iter()
            .map(|a| a.question_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let known: HashSet<String> = self
            .questions
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|q| q.id)
            .collect();
        if let Some(missing) = ids.iter().find(|id| !known.contains(*id)) {
            return Err(AppError::NotFound(format!("Question '{}' not found", missing)));
        }

        let rows = answers
            .iter()
            .map(|a| Answer::new(&session.id, &a.question_id, &a.answer))
            .collect();
        self.sessions.upsert_answers(rows).await
    }

    async fn score_session(&self, session: &ExamSession) -> AppResult<Vec<SubjectScore>> {
        let answers: HashMap<String, String> = self
            .sessions
            .find_answers(&session.id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a.submitted_answer))
            .collect();

        // Only the pinned draw counts once the session has one.
        let answered_ids: Vec<String> = answers
            .keys()
            .filter(|id| !session.has_pinned_questions() || session.question_ids.contains(*id))
            .cloned()
            .collect();
        let answered = self.questions.find_by_ids(&answered_ids).await?;

        let mut scores = Vec::with_capacity(session.subjects.len());
        for subject in &session.subjects {
            let key = QuestionKey::new(session.exam_type, subject, &session.exam_year);
            let score = score_subject(&key, &answered, &answers, self.rules.questions_per_subject);
            let pool = self.questions.count_by_key(&key).await? as usize;

            let subject_name = subject_display_name(subject, session.exam_type);
            self.subjects.upsert(&subject_name, session.exam_type).await?;

            scores.push(SubjectScore {
                exam_subject: subject.clone(),
                subject_name,
                score,
                question_count: pool.min(self.rules.questions_per_subject) as i32,
            });
        }
        Ok(scores)
    }
}

fn group_dtos(groups: Vec<(String, Vec<Question>)>) -> Vec<SubjectQuestionsDto> {
    groups
        .into_iter()
        .map(|(exam_subject, questions)| SubjectQuestionsDto {
            exam_subject,
            questions: questions.into_iter().map(ExamQuestionDto::from).collect(),
        })
        .collect()
}

/// Correct answers among at most `cap` answered questions of the subject.
fn score_subject(
    key: &QuestionKey,
    answered: &[Question],
    answers: &HashMap<String, String>,
    cap: usize,
) -> i32 {
    let mut relevant: Vec<&Question> = answered
        .iter()
        .filter(|q| key.matches(q))
        .collect();
    relevant.sort_by(|a, b| a.id.cmp(&b.id));

    relevant
        .into_iter()
        .take(cap)
        .filter(|q| {
            answers
                .get(&q.id)
                .is_some_and(|submitted| is_correct(submitted, &q.options, q.answer_text.as_deref()))
        })
        .count() as i32
}
