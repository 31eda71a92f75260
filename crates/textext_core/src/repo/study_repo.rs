//! Notes, summaries and quizzes scoped to a module and an owner.

use super::{parse_all, Entity, RepoResult};
use crate::model::study::{NewQuiz, NewSummary, Note, NoteStatus, Quiz, Summary};
use crate::model::{require_text, DocumentId};
use crate::session::Session;
use crate::store::{unique_id, Collection, Fields, Filter, RemoteStore};
use crate::upload::FileHandle;
use chrono::Utc;
use log::info;
use serde_json::json;
use std::sync::Arc;

impl Entity for Note {
    const COLLECTION: Collection = Collection::Notes;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = id;
    }
}

impl Entity for Summary {
    const COLLECTION: Collection = Collection::Summaries;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = id;
    }
}

impl Entity for Quiz {
    const COLLECTION: Collection = Collection::Quizzes;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = id;
    }
}

async fn list_owned<T: Entity>(
    store: &dyn RemoteStore,
    owner: &str,
    module_id: Option<&str>,
) -> RepoResult<Vec<T>> {
    let mut filters = vec![Filter::equal("owner", owner)];
    if let Some(module_id) = module_id {
        filters.push(Filter::equal("moduleId", module_id.trim()));
    }
    let documents = store.list_documents(T::COLLECTION, &filters).await?;
    parse_all(documents)
}

async fn insert<T: Entity>(store: &dyn RemoteStore, entity: &T) -> RepoResult<T> {
    let document = store
        .create_document(T::COLLECTION, entity.id(), entity.to_fields()?)
        .await?;
    T::from_document(document)
}

#[derive(Clone)]
pub struct NoteRepository {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl NoteRepository {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    pub async fn list_by_module(&self, module_id: &str) -> RepoResult<Vec<Note>> {
        let user = self.session.require_user().await?;
        list_owned(self.store.as_ref(), &user.account_id, Some(module_id)).await
    }

    pub async fn list_mine(&self) -> RepoResult<Vec<Note>> {
        let user = self.session.require_user().await?;
        list_owned(self.store.as_ref(), &user.account_id, None).await
    }

    /// Records an uploaded file as a note.
    ///
    /// The file is checked against the size ceiling before any store call.
    /// A blank title falls back to the file name.
    pub async fn upload(
        &self,
        module_id: &str,
        title: &str,
        description: &str,
        file: &FileHandle,
    ) -> RepoResult<Note> {
        file.validate()?;
        let module_id = require_text("module id", module_id)?;
        let title = match title.trim() {
            "" => file.name.trim().to_string(),
            other => other.to_string(),
        };

        let user = self.session.require_user().await?;
        let note = Note {
            id: unique_id(),
            module_id,
            owner: user.account_id.clone(),
            title,
            file_ref: file.uri.clone(),
            file_name: file.name.trim().to_string(),
            size_bytes: file.size_bytes,
            description: description.trim().to_string(),
            uploaded_at: Utc::now(),
            status: NoteStatus::Uploaded,
        };
        let note = insert(self.store.as_ref(), &note).await?;
        info!(
            "event=note_upload module=repo.study status=ok size_bytes={}",
            note.size_bytes
        );
        Ok(note)
    }

    pub async fn set_status(&self, id: &str, status: NoteStatus) -> RepoResult<Note> {
        self.session.require_user().await?;
        let mut fields = Fields::new();
        fields.insert("status".to_string(), json!(status));
        let document = self
            .store
            .update_document(Collection::Notes, id, fields)
            .await?;
        Note::from_document(document)
    }

    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        self.session.require_user().await?;
        self.store.delete_document(Collection::Notes, id).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SummaryRepository {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl SummaryRepository {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    pub async fn list_by_module(&self, module_id: &str) -> RepoResult<Vec<Summary>> {
        let user = self.session.require_user().await?;
        list_owned(self.store.as_ref(), &user.account_id, Some(module_id)).await
    }

    pub async fn list_mine(&self) -> RepoResult<Vec<Summary>> {
        let user = self.session.require_user().await?;
        list_owned(self.store.as_ref(), &user.account_id, None).await
    }

    pub async fn create(&self, input: NewSummary) -> RepoResult<Summary> {
        let user = self.session.require_user().await?;
        let summary = input.into_summary(unique_id(), user.account_id.clone(), Utc::now())?;
        insert(self.store.as_ref(), &summary).await
    }

    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        self.session.require_user().await?;
        self.store.delete_document(Collection::Summaries, id).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct QuizRepository {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl QuizRepository {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    pub async fn list_by_module(&self, module_id: &str) -> RepoResult<Vec<Quiz>> {
        let user = self.session.require_user().await?;
        list_owned(self.store.as_ref(), &user.account_id, Some(module_id)).await
    }

    pub async fn list_mine(&self) -> RepoResult<Vec<Quiz>> {
        let user = self.session.require_user().await?;
        list_owned(self.store.as_ref(), &user.account_id, None).await
    }

    pub async fn create(&self, input: NewQuiz) -> RepoResult<Quiz> {
        let user = self.session.require_user().await?;
        let quiz = input.into_quiz(unique_id(), user.account_id.clone(), Utc::now())?;
        insert(self.store.as_ref(), &quiz).await
    }

    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        self.session.require_user().await?;
        self.store.delete_document(Collection::Quizzes, id).await?;
        Ok(())
    }
}
