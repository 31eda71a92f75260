//! Typed domain model for remote collections.
//!
//! # Responsibility
//! - Define canonical entity shapes mapped from remote documents.
//! - Own local field validation shared by every write path.
//!
//! # Invariants
//! - Every entity except `User` carries an owner/creator account id.
//! - Participant sets (assignees, attendees) never contain duplicates.
//! - Remote field names are kept in serde attributes, never in call sites.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod meeting;
pub mod study;
pub mod task;
pub mod user;

/// Remote document identifier.
pub type DocumentId = String;

/// Backend account identifier; used as the creator/owner reference.
pub type AccountId = String;

/// Local validation failure raised before any remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    BlankField(&'static str),
    /// Priority outside `1..=3`.
    InvalidPriority(i64),
    /// Due date is neither `YYYY-MM-DD` nor RFC 3339.
    InvalidDueDate(String),
    /// Quiz answer points outside its choices.
    InvalidAnswerIndex {
        question: usize,
        answer_index: usize,
        choices: usize,
    },
    /// Module name already owned by the user.
    DuplicateModule(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::InvalidPriority(value) => {
                write!(f, "priority must be 1 (low), 2 (medium) or 3 (high), got {value}")
            }
            Self::InvalidDueDate(value) => write!(f, "invalid due date `{value}`"),
            Self::InvalidAnswerIndex {
                question,
                answer_index,
                choices,
            } => write!(
                f,
                "question {question} answer index {answer_index} is outside {choices} choices"
            ),
            Self::DuplicateModule(name) => write!(f, "module already exists: `{name}`"),
        }
    }
}

impl Error for ValidationError {}

/// Parses a remote due date.
///
/// Accepts a plain calendar date (`2025-03-01`, read as midnight UTC) or an
/// RFC 3339 timestamp as produced by date pickers.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Validates an optional due date, normalizing blank input to `None`.
pub fn normalize_due_date(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => match parse_due_date(value) {
            Some(_) => Ok(Some(value.to_string())),
            None => Err(ValidationError::InvalidDueDate(value.to_string())),
        },
    }
}

/// Trims a required text field.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Removes blank and repeated ids while keeping first-seen order.
pub fn dedup_ids<I>(ids: I) -> Vec<AccountId>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Deserializes remote `null` as the type default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes a participant list, dropping duplicates and `null`.
pub(crate) fn participant_set<'de, D>(deserializer: D) -> Result<Vec<AccountId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(dedup_ids(raw))
}
