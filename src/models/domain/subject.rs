use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::ExamType;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Subject {
    pub id: String,
    pub name: String, // e.g. "Mathematics (JAMB)", unique together with exam_type
    pub exam_type: ExamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn new(name: &str, exam_type: ExamType) -> Self {
        Subject {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            exam_type,
            created_at: Some(Utc::now()),
        }
    }
}
