use std::{fmt, str::FromStr};

use async_graphql::Enum;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Jamb,
    Waec,
    Neco,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Jamb => "jamb",
            ExamType::Waec => "waec",
            ExamType::Neco => "neco",
        }
    }

    /// The `type` query parameter understood by the structured question API.
    pub fn api_type_code(&self) -> &'static str {
        match self {
            ExamType::Jamb => "utme",
            other => other.as_str(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExamType::Jamb => "JAMB",
            ExamType::Waec => "WAEC",
            ExamType::Neco => "NECO",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jamb" | "utme" => Ok(ExamType::Jamb),
            "waec" => Ok(ExamType::Waec),
            "neco" => Ok(ExamType::Neco),
            other => Err(AppError::ValidationError(format!(
                "Unsupported exam type '{}'",
                other
            ))),
        }
    }
}
