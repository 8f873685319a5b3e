//! Fixed catalogs: supported exam years, the valid subject list and the
//! composition rules for a multi-subject exam.

use std::collections::HashSet;

use crate::{
    errors::{AppError, AppResult},
    models::domain::ExamType,
};

pub const COMPULSORY_SUBJECT: &str = "english language";
pub const SUBJECTS_PER_EXAM: usize = 4;
pub const FIRST_SUPPORTED_YEAR: u16 = 2001;
pub const LAST_SUPPORTED_YEAR: u16 = 2023;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectInfo {
    /// Normalized lowercase slug used everywhere inside the core.
    pub slug: &'static str,
    pub display_name: &'static str,
    /// Subject code expected by the structured question API.
    pub api_code: &'static str,
    /// Path segment on the scraped listing site.
    pub scrape_path: &'static str,
}

pub const SUBJECT_CATALOG: &[SubjectInfo] = &[
    SubjectInfo { slug: "english language", display_name: "English Language", api_code: "english", scrape_path: "english-language" },
    SubjectInfo { slug: "mathematics", display_name: "Mathematics", api_code: "mathematics", scrape_path: "mathematics" },
    SubjectInfo { slug: "physics", display_name: "Physics", api_code: "physics", scrape_path: "physics" },
    SubjectInfo { slug: "chemistry", display_name: "Chemistry", api_code: "chemistry", scrape_path: "chemistry" },
    SubjectInfo { slug: "biology", display_name: "Biology", api_code: "biology", scrape_path: "biology" },
    SubjectInfo { slug: "economics", display_name: "Economics", api_code: "economics", scrape_path: "economics" },
    SubjectInfo { slug: "government", display_name: "Government", api_code: "government", scrape_path: "government" },
    SubjectInfo { slug: "literature in english", display_name: "Literature in English", api_code: "englishlit", scrape_path: "literature-in-english" },
    SubjectInfo { slug: "geography", display_name: "Geography", api_code: "geography", scrape_path: "geography" },
    SubjectInfo { slug: "commerce", display_name: "Commerce", api_code: "commerce", scrape_path: "commerce" },
    SubjectInfo { slug: "accounting", display_name: "Accounting", api_code: "accounting", scrape_path: "principles-of-accounts" },
    SubjectInfo { slug: "christian religious knowledge", display_name: "Christian Religious Knowledge", api_code: "crk", scrape_path: "christian-religious-knowledge" },
    SubjectInfo { slug: "islamic religious knowledge", display_name: "Islamic Religious Knowledge", api_code: "irk", scrape_path: "islamic-religious-knowledge" },
    SubjectInfo { slug: "civic education", display_name: "Civic Education", api_code: "civiledu", scrape_path: "civic-education" },
    SubjectInfo { slug: "history", display_name: "History", api_code: "history", scrape_path: "history" },
    SubjectInfo { slug: "agricultural science", display_name: "Agricultural Science", api_code: "agriculture", scrape_path: "agricultural-science" },
];

/// Lowercases, trims and collapses separators so `"English-Language "` and
/// `"english language"` name the same subject.
pub fn normalize_subject(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn find_subject(raw: &str) -> Option<&'static SubjectInfo> {
    let slug = normalize_subject(raw);
    SUBJECT_CATALOG.iter().find(|s| s.slug == slug)
}

pub fn validate_subject(raw: &str) -> AppResult<&'static SubjectInfo> {
    find_subject(raw)
        .ok_or_else(|| AppError::ValidationError(format!("Unsupported subject '{}'", raw.trim())))
}

pub fn is_supported_year(year: &str) -> bool {
    year.trim()
        .parse::<u16>()
        .map(|y| (FIRST_SUPPORTED_YEAR..=LAST_SUPPORTED_YEAR).contains(&y))
        .unwrap_or(false)
}

pub fn validate_year(year: &str) -> AppResult<String> {
    if !is_supported_year(year) {
        return Err(AppError::ValidationError(format!(
            "Unsupported exam year '{}', expected {}-{}",
            year.trim(),
            FIRST_SUPPORTED_YEAR,
            LAST_SUPPORTED_YEAR
        )));
    }
    Ok(year.trim().to_string())
}

/// Checks a session's subject set: exactly four distinct catalog subjects,
/// one of them the compulsory subject. Returns the normalized slugs in input order.
pub fn validate_exam_subjects(raw: &[String]) -> AppResult<Vec<String>> {
    if raw.len() != SUBJECTS_PER_EXAM {
        return Err(AppError::ValidationError(format!(
            "Exactly {} subjects are required, got {}",
            SUBJECTS_PER_EXAM,
            raw.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut subjects = Vec::with_capacity(raw.len());
    for name in raw {
        let info = validate_subject(name)?;
        if !seen.insert(info.slug) {
            return Err(AppError::ValidationError(format!(
                "Subject '{}' was selected more than once",
                info.slug
            )));
        }
        subjects.push(info.slug.to_string());
    }

    if !seen.contains(COMPULSORY_SUBJECT) {
        return Err(AppError::ValidationError(format!(
            "'{}' is compulsory",
            COMPULSORY_SUBJECT
        )));
    }

    Ok(subjects)
}

/// Canonical display string stored on subject rows, e.g. `"Mathematics (JAMB)"`.
pub fn subject_display_name(slug: &str, exam_type: ExamType) -> String {
    let base = find_subject(slug)
        .map(|s| s.display_name.to_string())
        .unwrap_or_else(|| slug.to_string());
    format!("{} ({})", base, exam_type.label())
}
