//! User-facing error state.
//!
//! Repository errors become `ScreenError` here and nowhere else.

use crate::repo::RepoError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How the UI should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Session is gone; send the user to sign-in.
    RedirectToLogin,
    /// Transient; offer retry.
    Retryable,
    /// Show next to the offending input or item.
    Inline,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RedirectToLogin => "redirect_to_login",
            Self::Retryable => "retryable",
            Self::Inline => "inline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ScreenError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl Display for ScreenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ScreenError {}

impl From<&RepoError> for ScreenError {
    fn from(value: &RepoError) -> Self {
        match value {
            RepoError::Unauthenticated | RepoError::Store(StoreError::NotAuthenticated) => {
                Self::new(
                    ErrorKind::RedirectToLogin,
                    "Your session has ended. Please sign in again.",
                )
            }
            RepoError::Store(StoreError::Network(_)) => Self::new(
                ErrorKind::Retryable,
                "Could not reach the server. Check your connection and try again.",
            ),
            RepoError::Store(StoreError::RemoteValidation { message, .. }) => {
                Self::new(ErrorKind::Inline, message.clone())
            }
            RepoError::InvalidData(_) => Self::new(
                ErrorKind::Inline,
                "Some data could not be read. Pull to refresh.",
            ),
            other @ (RepoError::Validation(_)
            | RepoError::FileTooLarge { .. }
            | RepoError::NotCreator { .. }) => {
                Self::new(ErrorKind::Inline, other.to_string())
            }
        }
    }
}

impl From<RepoError> for ScreenError {
    fn from(value: RepoError) -> Self {
        Self::from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ScreenError};
    use crate::model::ValidationError;
    use crate::repo::RepoError;
    use crate::store::StoreError;

    fn kind(err: RepoError) -> ErrorKind {
        ScreenError::from(err).kind
    }

    #[test]
    fn maps_each_repository_error() {
        assert_eq!(kind(RepoError::Unauthenticated), ErrorKind::RedirectToLogin);
        assert_eq!(
            kind(RepoError::Store(StoreError::NotAuthenticated)),
            ErrorKind::RedirectToLogin
        );
        assert_eq!(
            kind(RepoError::Store(StoreError::Network("timeout".into()))),
            ErrorKind::Retryable
        );
        assert_eq!(
            kind(RepoError::Store(StoreError::validation("x", "bad"))),
            ErrorKind::Inline
        );
        assert_eq!(
            kind(RepoError::Validation(ValidationError::BlankField("title"))),
            ErrorKind::Inline
        );
        assert_eq!(
            kind(RepoError::FileTooLarge { size: 2, limit: 1 }),
            ErrorKind::Inline
        );
        assert_eq!(
            kind(RepoError::NotCreator { id: "t1".into() }),
            ErrorKind::Inline
        );
    }

    #[test]
    fn network_message_hides_transport_detail() {
        let err = ScreenError::from(RepoError::Store(StoreError::Network(
            "dns error: host.internal".into(),
        )));
        assert!(!err.message.contains("host.internal"));
    }
}
