use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::SubjectScore;

/// Derived on read from completed competition sessions, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, SimpleObject)]
pub struct LeaderboardEntry {
    pub rank: i32,
    pub student_id: String,
    pub session_id: String,
    pub score: i32,
    pub submitted_at: DateTime<Utc>,
    pub subject_scores: Vec<SubjectScore>,
}
