//! Backend configuration.
//!
//! # Responsibility
//! - Load endpoint, project and collection ids from `TEXTEXT_*` environment
//!   variables (and an optional `.env` file).
//! - Validate ids against the backend's id rules before any request.
//!
//! # Invariants
//! - Required values are non-blank after trimming.
//! - Collection ids default to the logical collection name.

use crate::store::Collection;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "TEXTEXT_";
pub const ENV_ENDPOINT: &str = "TEXTEXT_ENDPOINT";
pub const ENV_PLATFORM: &str = "TEXTEXT_PLATFORM";
pub const ENV_PROJECT_ID: &str = "TEXTEXT_PROJECT_ID";
pub const ENV_STORAGE_ID: &str = "TEXTEXT_STORAGE_ID";
pub const ENV_DATABASE_ID: &str = "TEXTEXT_DATABASE_ID";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TEXTEXT_REQUEST_TIMEOUT_SECS";
/// Selects the local SQLite store instead of the hosted backend.
pub const ENV_DB_PATH: &str = "TEXTEXT_DB_PATH";

static RESOURCE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,35}$").expect("valid resource id regex")
});

/// Configuration load/validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(String),
    InvalidId { var: String, value: String },
    InvalidNumber { var: &'static str, value: String },
    InvalidEndpoint(String),
    /// A variable could not be deserialized into its field type.
    Malformed(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "missing required setting `{var}`"),
            Self::InvalidId { var, value } => write!(f, "`{var}` has invalid id `{value}`"),
            Self::InvalidNumber { var, value } => {
                write!(f, "`{var}` must be a positive integer, got `{value}`")
            }
            Self::InvalidEndpoint(value) => {
                write!(f, "endpoint must start with http:// or https://, got `{value}`")
            }
            Self::Malformed(message) => write!(f, "malformed configuration: {message}"),
        }
    }
}

impl Error for ConfigError {}

impl From<envy::Error> for ConfigError {
    fn from(err: envy::Error) -> Self {
        match err {
            envy::Error::MissingValue(field) => Self::Missing(env_var_for_field(&field.to_string())),
            other => Self::Malformed(other.to_string()),
        }
    }
}

/// Hosted backend settings.
///
/// Field names are the variable names without [`ENV_PREFIX`], lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub platform: String,
    pub project_id: String,
    pub storage_id: String,
    pub database_id: String,
    #[serde(default = "default_users")]
    pub user_collection_id: String,
    #[serde(default = "default_tasks")]
    pub task_collection_id: String,
    #[serde(default = "default_meetings")]
    pub meeting_collection_id: String,
    #[serde(default = "default_notes")]
    pub note_collection_id: String,
    #[serde(default = "default_summaries")]
    pub summary_collection_id: String,
    #[serde(default = "default_quizzes")]
    pub quiz_collection_id: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl StoreConfig {
    /// Loads settings from `.env` (when present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Loads settings from `(name, value)` pairs; unprefixed names are ignored.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Self>(vars)?
            .normalized();
        config.validate()?;
        Ok(config)
    }

    /// Checks required values, endpoint scheme, timeout and every resource id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (var, value) in [
            (ENV_PLATFORM, &self.platform),
            (ENV_PROJECT_ID, &self.project_id),
            (ENV_STORAGE_ID, &self.storage_id),
            (ENV_DATABASE_ID, &self.database_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(var.to_string()));
            }
        }
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                var: ENV_REQUEST_TIMEOUT_SECS,
                value: self.request_timeout_secs.to_string(),
            });
        }
        check_id(ENV_PROJECT_ID, &self.project_id)?;
        check_id(ENV_STORAGE_ID, &self.storage_id)?;
        check_id(ENV_DATABASE_ID, &self.database_id)?;
        for collection in Collection::ALL {
            check_id(&collection_env_var(collection), self.collection_id(collection))?;
        }
        Ok(())
    }

    /// Remote id of `collection`.
    pub fn collection_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Users => &self.user_collection_id,
            Collection::Tasks => &self.task_collection_id,
            Collection::Meetings => &self.meeting_collection_id,
            Collection::Notes => &self.note_collection_id,
            Collection::Summaries => &self.summary_collection_id,
            Collection::Quizzes => &self.quiz_collection_id,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Endpoint without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    // Blank optional values fall back to their defaults.
    fn normalized(mut self) -> Self {
        fn trim_or(value: &mut String, fallback: impl FnOnce() -> String) {
            let trimmed = value.trim();
            *value = if trimmed.is_empty() {
                fallback()
            } else {
                trimmed.to_string()
            };
        }

        trim_or(&mut self.endpoint, default_endpoint);
        for value in [
            &mut self.platform,
            &mut self.project_id,
            &mut self.storage_id,
            &mut self.database_id,
        ] {
            *value = value.trim().to_string();
        }
        trim_or(&mut self.user_collection_id, default_users);
        trim_or(&mut self.task_collection_id, default_tasks);
        trim_or(&mut self.meeting_collection_id, default_meetings);
        trim_or(&mut self.note_collection_id, default_notes);
        trim_or(&mut self.summary_collection_id, default_summaries);
        trim_or(&mut self.quiz_collection_id, default_quizzes);
        self
    }
}

/// Environment variable holding the remote id of `collection`.
pub fn collection_env_var(collection: Collection) -> String {
    let stem = match collection {
        Collection::Users => "USER",
        Collection::Tasks => "TASK",
        Collection::Meetings => "MEETING",
        Collection::Notes => "NOTE",
        Collection::Summaries => "SUMMARY",
        Collection::Quizzes => "QUIZ",
    };
    format!("{ENV_PREFIX}{stem}_COLLECTION_ID")
}

/// Returns whether `value` is a valid backend resource id.
pub fn is_valid_resource_id(value: &str) -> bool {
    RESOURCE_ID_RE.is_match(value)
}

fn env_var_for_field(field: &str) -> String {
    format!("{ENV_PREFIX}{}", field.to_ascii_uppercase())
}

fn check_id(var: &str, value: &str) -> Result<(), ConfigError> {
    if is_valid_resource_id(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidId {
            var: var.to_string(),
            value: value.to_string(),
        })
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_users() -> String {
    Collection::Users.as_str().to_string()
}

fn default_tasks() -> String {
    Collection::Tasks.as_str().to_string()
}

fn default_meetings() -> String {
    Collection::Meetings.as_str().to_string()
}

fn default_notes() -> String {
    Collection::Notes.as_str().to_string()
}

fn default_summaries() -> String {
    Collection::Summaries.as_str().to_string()
}

fn default_quizzes() -> String {
    Collection::Quizzes.as_str().to_string()
}
