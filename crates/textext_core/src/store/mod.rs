//! Remote document store boundary.
//!
//! # Responsibility
//! - Define the async CRUD + query + account contract every backend fulfils.
//! - Keep transport details (HTTP, SQLite) behind one trait object.
//!
//! # Invariants
//! - Implementations never retry; retry policy belongs to callers.
//! - Filters are passed through; only local backends interpret them.
//! - A missing document surfaces as `RemoteValidation` with code
//!   `document_not_found`.

use crate::model::{AccountId, DocumentId};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod filter;
pub mod http;
pub mod sqlite;

pub use filter::Filter;
pub use http::HttpStore;
pub use sqlite::SqliteStore;

/// Raw document field map.
pub type Fields = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

pub const CODE_DOCUMENT_NOT_FOUND: &str = "document_not_found";
pub const CODE_DOCUMENT_ALREADY_EXISTS: &str = "document_already_exists";
pub const CODE_INVALID_ID: &str = "document_invalid_id";
pub const CODE_USER_ALREADY_EXISTS: &str = "user_already_exists";
pub const CODE_INVALID_CREDENTIALS: &str = "user_invalid_credentials";

/// Named remote collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Users,
    Tasks,
    Meetings,
    Notes,
    Summaries,
    Quizzes,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Self::Users,
        Self::Tasks,
        Self::Meetings,
        Self::Notes,
        Self::Summaries,
        Self::Quizzes,
    ];

    /// Logical collection name, also the default remote collection id.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tasks => "tasks",
            Self::Meetings => "meetings",
            Self::Notes => "notes",
            Self::Summaries => "summaries",
            Self::Quizzes => "quizzes",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored document with backend metadata split from user fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub collection: Collection,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    pub fields: Fields,
}

/// Authenticated backend account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: String,
}

/// Failure reported by a store implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport failure; retryable.
    Network(String),
    /// No active session.
    NotAuthenticated,
    /// The backend rejected the request input.
    RemoteValidation { code: String, message: String },
}

impl StoreError {
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteValidation {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(collection: Collection, id: &str) -> Self {
        Self::validation(
            CODE_DOCUMENT_NOT_FOUND,
            format!("document `{id}` not found in `{collection}`"),
        )
    }

    /// Returns whether the target document does not exist remotely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RemoteValidation { code, .. } if code == CODE_DOCUMENT_NOT_FOUND)
    }

    /// Stable code used in log events.
    pub fn code(&self) -> &str {
        match self {
            Self::Network(_) => "network_error",
            Self::NotAuthenticated => "not_authenticated",
            Self::RemoteValidation { code, .. } => code.as_str(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::RemoteValidation { code, message } => {
                write!(f, "remote validation failed ({code}): {message}")
            }
        }
    }
}

impl Error for StoreError {}

/// Document + account contract of the hosted backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> StoreResult<Document>;

    async fn get_document(&self, collection: Collection, id: &str) -> StoreResult<Document>;

    async fn list_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> StoreResult<Vec<Document>>;

    /// Merges `fields` into the stored document.
    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> StoreResult<Document>;

    async fn delete_document(&self, collection: Collection, id: &str) -> StoreResult<()>;

    async fn current_account(&self) -> StoreResult<Account>;

    async fn create_account(&self, email: &str, password: &str, name: &str)
        -> StoreResult<Account>;

    async fn create_session(&self, email: &str, password: &str) -> StoreResult<Account>;

    async fn delete_session(&self) -> StoreResult<()>;
}

/// Generates a unique document/account id accepted by the backend.
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::{unique_id, Collection, StoreError};

    #[test]
    fn not_found_is_a_remote_validation_error() {
        let err = StoreError::not_found(Collection::Tasks, "t1");
        assert!(err.is_not_found());
        assert_eq!(err.code(), "document_not_found");
        assert!(!StoreError::NotAuthenticated.is_not_found());
    }

    #[test]
    fn unique_ids_fit_backend_limit() {
        let id = unique_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, unique_id());
    }
}
