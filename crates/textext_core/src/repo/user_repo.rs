//! User profiles and the module list stored on them.

use super::{parse_all, Entity, RepoResult};
use crate::model::user::User;
use crate::model::DocumentId;
use crate::session::Session;
use crate::store::{Collection, Filter, RemoteStore};
use log::info;
use serde_json::{json, Map};
use std::sync::Arc;

const USER_SEARCH_LIMIT: u32 = 25;

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = id;
    }
}

/// Display fields of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub email: String,
}

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl UserRepository {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    /// Signed-in user, or `None`.
    pub async fn current(&self) -> RepoResult<Option<Arc<User>>> {
        self.session.current_user().await
    }

    /// Users whose username contains `query`, for picking assignees.
    pub async fn search_by_username(&self, query: &str) -> RepoResult<Vec<User>> {
        self.session.require_user().await?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let documents = self
            .store
            .list_documents(
                Collection::Users,
                &[
                    Filter::search("username", query),
                    Filter::limit(USER_SEARCH_LIMIT),
                ],
            )
            .await?;
        parse_all(documents)
    }

    pub async fn profile(&self) -> RepoResult<Profile> {
        let user = self.session.require_user().await?;
        Ok(Profile {
            username: user.username.clone(),
            email: user.email.clone(),
        })
    }
}

/// Modules are names kept on the user document, not a collection.
#[derive(Clone)]
pub struct ModuleRepository {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl ModuleRepository {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    /// Module names of the signed-in user, read fresh from the store.
    pub async fn list_mine(&self) -> RepoResult<Vec<String>> {
        Ok(self.fresh_user().await?.modules)
    }

    /// Appends a module and returns the updated list.
    pub async fn add(&self, name: &str) -> RepoResult<Vec<String>> {
        let user = self.fresh_user().await?;
        let modules = user.with_module_added(name)?;

        let mut fields = Map::new();
        fields.insert("modules".to_string(), json!(modules));
        let document = self
            .store
            .update_document(Collection::Users, &user.id, fields)
            .await?;
        self.session.invalidate().await;
        info!(
            "event=module_add module=repo.user status=ok module_count={}",
            modules.len()
        );
        Ok(User::from_document(document)?.modules)
    }

    async fn fresh_user(&self) -> RepoResult<User> {
        let user = self.session.require_user().await?;
        let document = self.store.get_document(Collection::Users, &user.id).await?;
        User::from_document(document)
    }
}
