//! Current-user resolution.
//!
//! # Responsibility
//! - Resolve the signed-in account to its profile document.
//! - Own sign-in, sign-out and registration flows.
//!
//! # Invariants
//! - Resolution result, including "no session", is memoized until
//!   `invalidate`, `sign_in`, `sign_out` or `register`.
//! - Concurrent callers wait on one resolution instead of starting their own.
//! - Transient failures are returned as errors and never memoized.

use crate::model::user::User;
use crate::model::require_text;
use crate::repo::{Entity, RepoError, RepoResult};
use crate::store::{unique_id, Collection, Filter, RemoteStore, StoreError};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

enum Memo {
    Unresolved,
    Resolved(Option<Arc<User>>),
}

/// Shared session handle; clones observe the same memo.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn RemoteStore>,
    memo: Arc<Mutex<Memo>>,
}

impl Session {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            memo: Arc::new(Mutex::new(Memo::Unresolved)),
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Returns the signed-in user, or `None` without a session or profile.
    pub async fn current_user(&self) -> RepoResult<Option<Arc<User>>> {
        let mut memo = self.memo.lock().await;
        if let Memo::Resolved(user) = &*memo {
            return Ok(user.clone());
        }
        let user = self.resolve().await?;
        *memo = Memo::Resolved(user.clone());
        Ok(user)
    }

    /// Like `current_user`, with `None` as `Unauthenticated`.
    pub async fn require_user(&self) -> RepoResult<Arc<User>> {
        self.current_user().await?.ok_or(RepoError::Unauthenticated)
    }

    /// Drops the memo; the next call resolves again.
    pub async fn invalidate(&self) {
        *self.memo.lock().await = Memo::Unresolved;
    }

    /// Opens a session with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> RepoResult<Option<Arc<User>>> {
        let result = self.store.create_session(email.trim(), password).await;
        self.invalidate().await;
        match result {
            Ok(_) => {
                info!("event=sign_in module=session status=ok");
                self.current_user().await
            }
            Err(err) => {
                warn!(
                    "event=sign_in module=session status=error error_code={}",
                    err.code()
                );
                Err(err.into())
            }
        }
    }

    /// Closes the current session. Succeeds when none was open.
    pub async fn sign_out(&self) -> RepoResult<()> {
        let result = self.store.delete_session().await;
        self.invalidate().await;
        match result {
            Ok(()) | Err(StoreError::NotAuthenticated) => {
                info!("event=sign_out module=session status=ok");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Creates an account, signs in and stores its profile document.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> RepoResult<Arc<User>> {
        let email = require_text("email", email)?;
        let username = require_text("username", username)?;

        let account = self
            .store
            .create_account(&email, password, &username)
            .await?;
        let user = User {
            id: unique_id(),
            account_id: account.id,
            username,
            email,
            modules: Vec::new(),
        };

        // The store session may have changed even when a later step fails.
        let created = self.finish_registration(&user, password).await;
        self.invalidate().await;
        match &created {
            Ok(_) => info!("event=register module=session status=ok"),
            Err(_) => warn!("event=register module=session status=error"),
        }
        created.map(Arc::new)
    }

    async fn finish_registration(&self, user: &User, password: &str) -> RepoResult<User> {
        self.store.create_session(&user.email, password).await?;
        let document = self
            .store
            .create_document(Collection::Users, &user.id, user.to_fields()?)
            .await?;
        User::from_document(document)
    }

    async fn resolve(&self) -> RepoResult<Option<Arc<User>>> {
        let account = match self.store.current_account().await {
            Ok(account) => account,
            Err(StoreError::NotAuthenticated) => return Ok(None),
            Err(err) => {
                warn!(
                    "event=session_resolve module=session status=error error_code={}",
                    err.code()
                );
                return Err(err.into());
            }
        };

        let documents = self
            .store
            .list_documents(
                Collection::Users,
                &[
                    Filter::equal("accountId", json!(account.id)),
                    Filter::limit(1),
                ],
            )
            .await?;
        match documents.into_iter().next() {
            Some(document) => Ok(Some(Arc::new(User::from_document(document)?))),
            None => {
                warn!("event=session_resolve module=session status=error error_code=profile_missing");
                Ok(None)
            }
        }
    }
}
