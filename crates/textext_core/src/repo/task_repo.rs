//! Task repository.
//!
//! # Invariants
//! - `list_*` return tasks the user created or is assigned to, each once.
//! - `Completed` is only ever written as `true`.

use super::{parse_all, to_fields, union_by_id, Entity, RepoError, RepoResult};
use crate::model::task::{NewTask, Task, TaskPatch};
use crate::model::DocumentId;
use crate::session::Session;
use crate::store::{unique_id, Collection, Fields, Filter, RemoteStore};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

impl Entity for Task {
    const COLLECTION: Collection = Collection::Tasks;
    const ID_FIELD: Option<&'static str> = Some("taskId");

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = id;
    }
}

#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    /// Tasks created by or assigned to the signed-in user.
    pub async fn list_mine(&self) -> RepoResult<Vec<Task>> {
        self.list_involving(Vec::new()).await
    }

    pub async fn list_incomplete(&self) -> RepoResult<Vec<Task>> {
        self.list_involving(vec![Filter::equal("Completed", false)])
            .await
    }

    pub async fn list_by_category(&self, category: &str) -> RepoResult<Vec<Task>> {
        self.list_involving(vec![Filter::equal("Category", category.trim())])
            .await
    }

    /// Distinct non-blank categories of `list_mine`, first-seen order.
    pub async fn categories(&self) -> RepoResult<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .list_mine()
            .await?
            .into_iter()
            .map(|task| task.category)
            .filter(|category| !category.is_empty() && seen.insert(category.clone()))
            .collect())
    }

    pub async fn create(&self, input: NewTask) -> RepoResult<Task> {
        let user = self.session.require_user().await?;
        let task = input.into_task(unique_id(), user.account_id.clone())?;
        let document = self
            .store
            .create_document(Collection::Tasks, &task.id, task.to_fields()?)
            .await?;
        info!("event=task_create module=repo.task status=ok");
        Task::from_document(document)
    }

    /// Applies a partial edit by the task's creator. An empty patch returns
    /// the stored task.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> RepoResult<Task> {
        let user = self.session.require_user().await?;
        let patch = patch.validated()?;
        let stored = Task::from_document(self.store.get_document(Collection::Tasks, id).await?)?;
        if stored.creator != user.account_id {
            warn!("event=task_update module=repo.task status=rejected reason=not_creator");
            return Err(RepoError::NotCreator { id: id.to_string() });
        }
        if patch.is_empty() {
            return Ok(stored);
        }
        let document = self
            .store
            .update_document(Collection::Tasks, id, to_fields(&patch)?)
            .await?;
        debug!("event=task_update module=repo.task status=ok");
        Task::from_document(document)
    }

    /// Marks a task completed. Completing twice is a no-op.
    pub async fn complete(&self, id: &str) -> RepoResult<Task> {
        self.session.require_user().await?;
        let mut fields = Fields::new();
        fields.insert("Completed".to_string(), Value::Bool(true));
        let document = self
            .store
            .update_document(Collection::Tasks, id, fields)
            .await?;
        info!("event=task_complete module=repo.task status=ok");
        Task::from_document(document)
    }

    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        self.session.require_user().await?;
        self.store.delete_document(Collection::Tasks, id).await?;
        info!("event=task_delete module=repo.task status=ok");
        Ok(())
    }

    async fn list_involving(&self, extra: Vec<Filter>) -> RepoResult<Vec<Task>> {
        let user = self.session.require_user().await?;
        let account = json!(user.account_id);

        let mut created_filters = vec![Filter::equal("Creator", account.clone())];
        created_filters.extend(extra.iter().cloned());
        let mut assigned_filters = vec![Filter::contains("Assignees", account)];
        assigned_filters.extend(extra);

        let created = self
            .store
            .list_documents(Collection::Tasks, &created_filters)
            .await?;
        let assigned = self
            .store
            .list_documents(Collection::Tasks, &assigned_filters)
            .await?;
        let tasks = union_by_id(parse_all::<Task>(created)?, parse_all::<Task>(assigned)?);
        debug!(
            "event=task_list module=repo.task status=ok count={}",
            tasks.len()
        );
        Ok(tasks)
    }
}
