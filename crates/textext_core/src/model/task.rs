//! Task domain model.
//!
//! # Responsibility
//! - Define the task record, its priority scale and write payloads.
//! - Keep completion monotonic at the type level.
//!
//! # Invariants
//! - `completed` only moves from `false` to `true`; `TaskPatch` has no
//!   completion field, the field is private, and `mark_completed` is the
//!   only mutator.
//! - `assignees` is duplicate-free.

use super::{
    dedup_ids, normalize_due_date, null_as_default, participant_set, require_text, AccountId,
    DocumentId, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Task urgency, stored remotely as `1..=3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<i64> for Priority {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            other => Err(ValidationError::InvalidPriority(other)),
        }
    }
}

impl From<Priority> for i64 {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

/// Task document as stored in the tasks collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(skip)]
    pub id: DocumentId,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description", deserialize_with = "null_as_default", default)]
    pub description: String,
    #[serde(rename = "Priority", deserialize_with = "null_as_default", default)]
    pub priority: Priority,
    #[serde(rename = "DueDate", default)]
    pub due_date: Option<String>,
    #[serde(rename = "Completed", deserialize_with = "null_as_default", default)]
    completed: bool,
    #[serde(rename = "Creator")]
    pub creator: AccountId,
    #[serde(rename = "Assignees", deserialize_with = "participant_set", default)]
    pub assignees: Vec<AccountId>,
    #[serde(rename = "Category", deserialize_with = "null_as_default", default)]
    pub category: String,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Marks the task completed. Never reverts.
    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    /// Returns whether `account_id` created or is assigned to this task.
    pub fn involves(&self, account_id: &str) -> bool {
        self.creator == account_id || self.assignees.iter().any(|id| id == account_id)
    }
}

/// Input for creating a task. Creator is filled from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub due_date: Option<String>,
    pub assignees: Vec<AccountId>,
    pub category: String,
}

impl NewTask {
    /// Validates input and builds the record to persist.
    pub fn into_task(self, id: DocumentId, creator: AccountId) -> Result<Task, ValidationError> {
        Ok(Task {
            id,
            title: require_text("title", &self.title)?,
            description: self.description.trim().to_string(),
            priority: Priority::try_from(self.priority)?,
            due_date: normalize_due_date(self.due_date.as_deref())?,
            completed: false,
            creator,
            assignees: dedup_ids(&self.assignees),
            category: self.category.trim().to_string(),
        })
    }
}

/// Partial edit of a task by its creator.
///
/// `None` leaves the field unchanged. Completion is not patchable; use
/// `TaskRepository::complete`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(rename = "Title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Priority", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "DueDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(rename = "Assignees", skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<AccountId>>,
    #[serde(rename = "Category", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TaskPatch {
    /// Returns a normalized copy or the first validation failure.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let title = match &self.title {
            Some(value) => Some(require_text("title", value)?),
            None => None,
        };
        let due_date = match &self.due_date {
            Some(value) => normalize_due_date(Some(value))?,
            None => None,
        };
        Ok(Self {
            title,
            description: self.description.as_ref().map(|value| value.trim().to_string()),
            priority: self.priority,
            due_date,
            assignees: self.assignees.as_ref().map(|ids| dedup_ids(ids)),
            category: self.category.as_ref().map(|value| value.trim().to_string()),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
