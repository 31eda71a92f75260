//! Client core for TextExt.
//! Data access against the hosted document store and per-screen state sync.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod session;
pub mod store;
pub mod sync;
pub mod upload;

pub use config::{ConfigError, StoreConfig};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::meeting::{Meeting, MeetingPatch, NewMeeting};
pub use model::study::{NewQuiz, NewSummary, Note, NoteStatus, Quiz, QuizQuestion, Summary};
pub use model::task::{NewTask, Priority, Task, TaskPatch};
pub use model::user::User;
pub use model::{AccountId, DocumentId, ValidationError};
pub use repo::{
    MeetingRepository, ModuleRepository, NoteRepository, Profile, QuizRepository, RepoError,
    RepoResult, Repositories, SummaryRepository, TaskRepository, UserRepository,
};
pub use session::Session;
pub use store::{
    Account, Collection, Document, Filter, HttpStore, RemoteStore, SqliteStore, StoreError,
    StoreResult,
};
pub use sync::{
    ErrorKind, LoadOutcome, LocalMutation, MutationOutcome, NotificationScheduler, Phase,
    Reminder, ScreenError, ScreenItem, ScreenSnapshot, ScreenSync, Trigger,
};
pub use upload::{FileHandle, UploadError, MAX_UPLOAD_BYTES};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
