//! Entity repositories over the remote document store.
//!
//! # Responsibility
//! - Map typed entities to and from store documents.
//! - Scope every query to the current account.
//!
//! # Invariants
//! - Repositories hold no entity state; each call re-resolves the session.
//! - Writes validate input locally before any store call.
//! - "Creator or participant" lists are two store queries unioned by id,
//!   creator results first.

use crate::model::{DocumentId, ValidationError};
use crate::session::Session;
use crate::store::{Collection, Document, Fields, RemoteStore, StoreError};
use crate::upload::UploadError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod meeting_repo;
pub mod study_repo;
pub mod task_repo;
pub mod user_repo;

pub use meeting_repo::MeetingRepository;
pub use study_repo::{NoteRepository, QuizRepository, SummaryRepository};
pub use task_repo::TaskRepository;
pub use user_repo::{ModuleRepository, Profile, UserRepository};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository-level failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// No active session or no profile for the session account.
    Unauthenticated,
    /// Transport or backend rejection.
    Store(StoreError),
    /// Input rejected locally; nothing was sent.
    Validation(ValidationError),
    /// Stored document does not match the entity shape.
    InvalidData(String),
    /// Upload exceeds the size ceiling; nothing was sent.
    FileTooLarge { size: u64, limit: u64 },
    /// Edit attempted by someone other than the document's creator.
    NotCreator { id: String },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "not signed in"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
            Self::FileTooLarge { size, limit } => {
                write!(f, "file of {size} bytes exceeds the {limit} byte limit")
            }
            Self::NotCreator { id } => write!(f, "only the creator can edit `{id}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotAuthenticated => Self::Unauthenticated,
            other => Self::Store(other),
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<UploadError> for RepoError {
    fn from(value: UploadError) -> Self {
        match value {
            UploadError::TooLarge { size, limit } => Self::FileTooLarge { size, limit },
            UploadError::MissingName => Self::Validation(ValidationError::BlankField("file name")),
        }
    }
}

/// Typed record stored as one document.
pub trait Entity: Sized + Serialize + DeserializeOwned {
    const COLLECTION: Collection;
    /// Field mirroring the document id, when the schema has one.
    const ID_FIELD: Option<&'static str> = None;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: DocumentId);

    fn from_document(document: Document) -> RepoResult<Self> {
        let mut entity: Self =
            serde_json::from_value(Value::Object(document.fields)).map_err(|err| {
                RepoError::InvalidData(format!(
                    "{} document `{}`: {err}",
                    Self::COLLECTION,
                    document.id
                ))
            })?;
        entity.set_id(document.id);
        Ok(entity)
    }

    fn to_fields(&self) -> RepoResult<Fields> {
        let mut fields = to_fields(self)?;
        if let Some(field) = Self::ID_FIELD {
            fields.insert(field.to_string(), Value::String(self.id().to_string()));
        }
        Ok(fields)
    }
}

/// Serializes a payload into a document field map.
pub(crate) fn to_fields<T: Serialize>(value: &T) -> RepoResult<Fields> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(RepoError::InvalidData(format!(
            "expected an object payload, got {other}"
        ))),
        Err(err) => Err(RepoError::InvalidData(err.to_string())),
    }
}

pub(crate) fn parse_all<T: Entity>(documents: Vec<Document>) -> RepoResult<Vec<T>> {
    documents.into_iter().map(T::from_document).collect()
}

/// Concatenates two result sets keeping the first occurrence of each id.
pub fn union_by_id<T: Entity>(primary: Vec<T>, secondary: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    primary
        .into_iter()
        .chain(secondary)
        .filter(|entity| seen.insert(entity.id().to_string()))
        .collect()
}

/// All repositories over one store and one session.
#[derive(Clone)]
pub struct Repositories {
    pub session: Session,
    pub users: UserRepository,
    pub modules: ModuleRepository,
    pub tasks: TaskRepository,
    pub meetings: MeetingRepository,
    pub notes: NoteRepository,
    pub summaries: SummaryRepository,
    pub quizzes: QuizRepository,
}

impl Repositories {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let session = Session::new(Arc::clone(&store));
        Self {
            users: UserRepository::new(Arc::clone(&store), session.clone()),
            modules: ModuleRepository::new(Arc::clone(&store), session.clone()),
            tasks: TaskRepository::new(Arc::clone(&store), session.clone()),
            meetings: MeetingRepository::new(Arc::clone(&store), session.clone()),
            notes: NoteRepository::new(Arc::clone(&store), session.clone()),
            summaries: SummaryRepository::new(Arc::clone(&store), session.clone()),
            quizzes: QuizRepository::new(store, session.clone()),
            session,
        }
    }
}
