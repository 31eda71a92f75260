#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use textext_core::store::{Account, Collection, Document, Fields, Filter, StoreResult};
use textext_core::{RemoteStore, Repositories, SqliteStore, StoreError};
use tokio::sync::oneshot;

pub const PASSWORD: &str = "correct horse battery";

/// Store wrapper that counts calls, injects write failures and can hold
/// `update_document` until released.
pub struct SpyStore {
    inner: Arc<dyn RemoteStore>,
    pub calls: AtomicUsize,
    pub account_calls: AtomicUsize,
    pub fail_writes: AtomicBool,
    account_delay: Mutex<Option<Duration>>,
    update_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl SpyStore {
    pub fn wrap(inner: Arc<dyn RemoteStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            account_delay: Mutex::new(None),
            update_gate: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_account_delay(&self, delay: Duration) {
        *self.account_delay.lock().unwrap() = Some(delay);
    }

    /// Holds the next `update_document` until the returned sender fires.
    pub fn gate_next_update(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.update_gate.lock().unwrap() = Some(rx);
        tx
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Network("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for SpyStore {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> StoreResult<Document> {
        self.record();
        self.check_write()?;
        self.inner.create_document(collection, id, fields).await
    }

    async fn get_document(&self, collection: Collection, id: &str) -> StoreResult<Document> {
        self.record();
        self.inner.get_document(collection, id).await
    }

    async fn list_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> StoreResult<Vec<Document>> {
        self.record();
        self.inner.list_documents(collection, filters).await
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> StoreResult<Document> {
        self.record();
        let gate = self.update_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.check_write()?;
        self.inner.update_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> StoreResult<()> {
        self.record();
        self.check_write()?;
        self.inner.delete_document(collection, id).await
    }

    async fn current_account(&self) -> StoreResult<Account> {
        self.record();
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.account_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.current_account().await
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<Account> {
        self.record();
        self.inner.create_account(email, password, name).await
    }

    async fn create_session(&self, email: &str, password: &str) -> StoreResult<Account> {
        self.record();
        self.inner.create_session(email, password).await
    }

    async fn delete_session(&self) -> StoreResult<()> {
        self.record();
        self.inner.delete_session().await
    }
}

pub fn memory_store() -> Arc<dyn RemoteStore> {
    Arc::new(SqliteStore::open_in_memory().unwrap())
}

/// Independent handle ("device") over a shared database file.
pub fn file_store(path: &Path) -> Arc<dyn RemoteStore> {
    Arc::new(SqliteStore::open(path).unwrap())
}

/// Registers `username` on `store` and returns signed-in repositories.
pub async fn signed_in(store: Arc<dyn RemoteStore>, username: &str) -> Repositories {
    let repos = Repositories::new(store);
    repos
        .session
        .register(&format!("{username}@example.com"), PASSWORD, username)
        .await
        .unwrap();
    repos
}

/// Signs an existing account in on another handle.
pub async fn sign_in_as(store: Arc<dyn RemoteStore>, username: &str) -> Repositories {
    let repos = Repositories::new(store);
    repos
        .session
        .sign_in(&format!("{username}@example.com"), PASSWORD)
        .await
        .unwrap()
        .expect("profile should exist");
    repos
}

pub async fn account_id(repos: &Repositories) -> String {
    repos.session.require_user().await.unwrap().account_id.clone()
}
