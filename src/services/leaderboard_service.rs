use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{ExamSession, LeaderboardEntry},
    repositories::ExamSessionRepository,
};

pub struct LeaderboardService {
    sessions: Arc<dyn ExamSessionRepository>,
}

impl LeaderboardService {
    pub fn new(sessions: Arc<dyn ExamSessionRepository>) -> Self {
        Self { sessions }
    }

    /// Ranked competition results for `date` (today when `None`), in server local time.
    pub async fn leaderboard(&self, date: Option<NaiveDate>) -> AppResult<Vec<LeaderboardEntry>> {
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        let (start, end) = local_day_bounds(date)?;

        let sessions = self
            .sessions
            .find_completed_competitions_between(start, end)
            .await?;
        log::debug!("Ranking {} competition sessions for {}", sessions.len(), date);

        Ok(rank_sessions(sessions))
    }
}

fn local_midnight(date: NaiveDate) -> AppResult<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::InternalError(format!("No midnight on {}", date)))?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::InternalError(format!("Local midnight of {} does not exist", date)))
}

/// `[start of date, start of next day)` in local time, as UTC instants.
pub fn local_day_bounds(date: NaiveDate) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::ValidationError(format!("Date {} is out of range", date)))?;
    Ok((local_midnight(date)?, local_midnight(next)?))
}

fn submitted_at(session: &ExamSession) -> DateTime<Utc> {
    session.end_time.unwrap_or(session.start_time)
}

/// Higher score first, then earlier submission, then student id. Session id
/// last so the order never depends on input order.
fn compare(a: &ExamSession, b: &ExamSession) -> Ordering {
    b.total_score()
        .cmp(&a.total_score())
        .then_with(|| submitted_at(a).cmp(&submitted_at(b)))
        .then_with(|| a.student_id.cmp(&b.student_id))
        .then_with(|| a.id.cmp(&b.id))
}

/// Keeps each student's best session and assigns distinct ranks `1..=n`.
pub fn rank_sessions(sessions: Vec<ExamSession>) -> Vec<LeaderboardEntry> {
    let mut best: HashMap<String, ExamSession> = HashMap::new();
    for session in sessions {
        let replaces = best
            .get(&session.student_id)
            .map_or(true, |current| compare(&session, current) == Ordering::Less);
        if replaces {
            best.insert(session.student_id.clone(), session);
        }
    }

    let mut ranked: Vec<ExamSession> = best.into_values().collect();
    ranked.sort_by(compare);

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, session)| LeaderboardEntry {
            rank: index as i32 + 1,
            score: session.total_score(),
            submitted_at: submitted_at(&session),
            student_id: session.student_id,
            session_id: session.id,
            subject_scores: session.scores,
        })
        .collect()
}
