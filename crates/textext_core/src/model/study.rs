//! Module-scoped study material: uploaded notes, summaries and quizzes.
//!
//! # Responsibility
//! - Define records keyed by `module_id` and owned by one account.
//! - Validate quiz structure before persistence.
//!
//! # Invariants
//! - `owner` is the uploading/generating account and scopes every query.
//! - Quiz `answer_index` always points inside `choices`.

use super::{null_as_default, require_text, AccountId, DocumentId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of an uploaded note file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
}

impl NoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

/// Uploaded lecture note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip)]
    pub id: DocumentId,
    #[serde(rename = "moduleId")]
    pub module_id: String,
    pub owner: AccountId,
    pub title: String,
    /// Storage reference of the uploaded file.
    #[serde(rename = "fileRef")]
    pub file_ref: String,
    #[serde(rename = "fileName", deserialize_with = "null_as_default", default)]
    pub file_name: String,
    #[serde(rename = "sizeBytes", deserialize_with = "null_as_default", default)]
    pub size_bytes: u64,
    #[serde(deserialize_with = "null_as_default", default)]
    pub description: String,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,
    pub status: NoteStatus,
}

/// Generated summary of one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(skip)]
    pub id: DocumentId,
    #[serde(rename = "moduleId")]
    pub module_id: String,
    pub owner: AccountId,
    #[serde(rename = "noteId")]
    pub note_id: DocumentId,
    pub text: String,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    #[serde(rename = "answerIndex")]
    pub answer_index: usize,
}

/// Generated quiz for one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(skip)]
    pub id: DocumentId,
    #[serde(rename = "moduleId")]
    pub module_id: String,
    pub owner: AccountId,
    #[serde(rename = "noteId")]
    pub note_id: DocumentId,
    #[serde(deserialize_with = "null_as_default", default)]
    pub title: String,
    #[serde(deserialize_with = "null_as_default", default)]
    pub questions: Vec<QuizQuestion>,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
}

/// Input for storing a generated summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSummary {
    pub module_id: String,
    pub note_id: DocumentId,
    pub text: String,
}

impl NewSummary {
    pub fn into_summary(
        self,
        id: DocumentId,
        owner: AccountId,
        generated_at: DateTime<Utc>,
    ) -> Result<Summary, ValidationError> {
        Ok(Summary {
            id,
            module_id: require_text("module id", &self.module_id)?,
            owner,
            note_id: require_text("note id", &self.note_id)?,
            text: require_text("summary text", &self.text)?,
            generated_at,
        })
    }
}

/// Input for storing a generated quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuiz {
    pub module_id: String,
    pub note_id: DocumentId,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

impl NewQuiz {
    pub fn into_quiz(
        self,
        id: DocumentId,
        owner: AccountId,
        generated_at: DateTime<Utc>,
    ) -> Result<Quiz, ValidationError> {
        validate_questions(&self.questions)?;
        Ok(Quiz {
            id,
            module_id: require_text("module id", &self.module_id)?,
            owner,
            note_id: require_text("note id", &self.note_id)?,
            title: self.title.trim().to_string(),
            questions: self.questions,
            generated_at,
        })
    }
}

/// Checks every question has a prompt and a reachable answer.
pub fn validate_questions(questions: &[QuizQuestion]) -> Result<(), ValidationError> {
    for (index, question) in questions.iter().enumerate() {
        if question.prompt.trim().is_empty() {
            return Err(ValidationError::BlankField("question prompt"));
        }
        if question.answer_index >= question.choices.len() {
            return Err(ValidationError::InvalidAnswerIndex {
                question: index,
                answer_index: question.answer_index,
                choices: question.choices.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_questions, NewQuiz, NoteStatus, QuizQuestion};
    use crate::model::ValidationError;
    use chrono::Utc;

    #[test]
    fn answer_index_must_point_inside_choices() {
        let questions = vec![QuizQuestion {
            prompt: "2 + 2?".to_string(),
            choices: vec!["3".to_string(), "4".to_string()],
            answer_index: 2,
        }];
        assert_eq!(
            validate_questions(&questions),
            Err(ValidationError::InvalidAnswerIndex {
                question: 0,
                answer_index: 2,
                choices: 2
            })
        );
    }

    #[test]
    fn new_quiz_rejects_unreachable_answer_before_building() {
        let input = NewQuiz {
            module_id: "Biology".to_string(),
            note_id: "n1".to_string(),
            title: "Cells".to_string(),
            questions: vec![QuizQuestion {
                prompt: "Powerhouse of the cell?".to_string(),
                choices: vec![],
                answer_index: 0,
            }],
        };
        let err = input
            .into_quiz("q1".into(), "acct".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAnswerIndex { .. }));
    }

    #[test]
    fn note_status_uses_snake_case() {
        let value = serde_json::to_value(NoteStatus::Processed).unwrap();
        assert_eq!(value, "processed");
        assert_eq!(value, NoteStatus::Processed.as_str());
    }
}
