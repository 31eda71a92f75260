//! Local document store over SQLite.
//!
//! # Responsibility
//! - Fulfil the `RemoteStore` contract offline (development, CLI, tests).
//! - Mirror backend rules: id format, session-gated documents, error codes.
//!
//! # Invariants
//! - Every document operation requires an active session on this handle.
//! - Documents list in creation order (`created_at`, then insertion order).
//! - Passwords are stored only as argon2 PHC strings.
//! - The session lives on the handle, not in the database; separate handles
//!   over one file behave like separate devices.

use super::filter::{self, Filter};
use super::{
    unique_id, Account, Collection, Document, Fields, RemoteStore, StoreError, StoreResult,
    CODE_DOCUMENT_ALREADY_EXISTS, CODE_INVALID_CREDENTIALS, CODE_INVALID_ID,
    CODE_USER_ALREADY_EXISTS,
};
use crate::config::is_valid_resource_id;
use crate::db::{open_db, open_db_in_memory, DbResult};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Inner {
    conn: Connection,
    session: Option<Account>,
}

/// SQLite-backed `RemoteStore`.
pub struct SqliteStore {
    inner: Mutex<Inner>,
}

impl SqliteStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: Mutex::new(Inner {
                conn,
                session: None,
            }),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    // Poisoned guards are reused; the connection stays valid after a panic.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_session(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.session.is_none() {
            return Err(StoreError::NotAuthenticated);
        }
        Ok(inner)
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> StoreResult<Document> {
        if !is_valid_resource_id(id) {
            return Err(StoreError::validation(
                CODE_INVALID_ID,
                format!("invalid document id `{id}`"),
            ));
        }
        let inner = self.lock_session()?;
        let now = Utc::now().timestamp_millis();
        let encoded = encode_fields(&fields)?;

        let inserted = inner.conn.execute(
            "INSERT INTO documents (collection, id, fields, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4);",
            params![collection.as_str(), id, encoded, now],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(StoreError::validation(
                    CODE_DOCUMENT_ALREADY_EXISTS,
                    format!("document `{id}` already exists in `{collection}`"),
                ));
            }
            Err(err) => return Err(local_failure(err)),
        }

        debug!("event=doc_create module=store.sqlite status=ok collection={collection}");
        Ok(Document {
            id: id.to_string(),
            collection,
            created_at: now,
            updated_at: now,
            fields,
        })
    }

    async fn get_document(&self, collection: Collection, id: &str) -> StoreResult<Document> {
        let inner = self.lock_session()?;
        load_document(&inner.conn, collection, id)?
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn list_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> StoreResult<Vec<Document>> {
        let inner = self.lock_session()?;
        let mut stmt = inner
            .conn
            .prepare(
                "SELECT id, fields, created_at, updated_at
                 FROM documents
                 WHERE collection = ?1
                 ORDER BY created_at ASC, rowid ASC;",
            )
            .map_err(local_failure)?;
        let rows = stmt
            .query_map([collection.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(local_failure)?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, raw, created_at, updated_at) = row.map_err(local_failure)?;
            documents.push(Document {
                id,
                collection,
                created_at,
                updated_at,
                fields: decode_fields(&raw)?,
            });
        }

        Ok(filter::apply(documents, filters))
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> StoreResult<Document> {
        let inner = self.lock_session()?;
        let mut document = load_document(&inner.conn, collection, id)?
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        document.fields.extend(fields);
        document.updated_at = Utc::now().timestamp_millis().max(document.created_at);
        inner
            .conn
            .execute(
                "UPDATE documents SET fields = ?1, updated_at = ?2
                 WHERE collection = ?3 AND id = ?4;",
                params![
                    encode_fields(&document.fields)?,
                    document.updated_at,
                    collection.as_str(),
                    id
                ],
            )
            .map_err(local_failure)?;

        debug!("event=doc_update module=store.sqlite status=ok collection={collection}");
        Ok(document)
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let inner = self.lock_session()?;
        let changed = inner
            .conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection.as_str(), id],
            )
            .map_err(local_failure)?;
        if changed == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        debug!("event=doc_delete module=store.sqlite status=ok collection={collection}");
        Ok(())
    }

    async fn current_account(&self) -> StoreResult<Account> {
        self.lock()
            .session
            .clone()
            .ok_or(StoreError::NotAuthenticated)
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<Account> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::validation(
                "general_argument_invalid",
                "email must be a valid address",
            ));
        }
        if password.chars().count() < 8 {
            return Err(StoreError::validation(
                "general_argument_invalid",
                "password must be at least 8 characters",
            ));
        }

        let password_hash = hash_password(password)?;
        let inner = self.lock();
        let account = Account {
            id: unique_id(),
            email: email.to_string(),
            name: name.trim().to_string(),
        };
        let inserted = inner.conn.execute(
            "INSERT INTO accounts (id, email, name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                account.id,
                account.email,
                account.name,
                password_hash,
                Utc::now().timestamp_millis()
            ],
        );
        match inserted {
            Ok(_) => Ok(account),
            Err(err) if is_constraint_violation(&err) => Err(StoreError::validation(
                CODE_USER_ALREADY_EXISTS,
                "an account with this email already exists",
            )),
            Err(err) => Err(local_failure(err)),
        }
    }

    async fn create_session(&self, email: &str, password: &str) -> StoreResult<Account> {
        let mut inner = self.lock();
        let row = inner
            .conn
            .query_row(
                "SELECT id, email, name, password_hash
                 FROM accounts WHERE email = ?1;",
                [email.trim()],
                |row| {
                    Ok((
                        Account {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            name: row.get(2)?,
                        },
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(local_failure)?;

        match row {
            Some((account, hash)) if verify_password(password, &hash) => {
                inner.session = Some(account.clone());
                Ok(account)
            }
            _ => {
                warn!("event=session_create module=store.sqlite status=rejected");
                Err(StoreError::validation(
                    CODE_INVALID_CREDENTIALS,
                    "invalid credentials",
                ))
            }
        }
    }

    async fn delete_session(&self) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.session.take().is_none() {
            return Err(StoreError::NotAuthenticated);
        }
        Ok(())
    }
}

fn load_document(
    conn: &Connection,
    collection: Collection,
    id: &str,
) -> StoreResult<Option<Document>> {
    let row = conn
        .query_row(
            "SELECT fields, created_at, updated_at FROM documents
             WHERE collection = ?1 AND id = ?2;",
            params![collection.as_str(), id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()
        .map_err(local_failure)?;

    match row {
        Some((raw, created_at, updated_at)) => Ok(Some(Document {
            id: id.to_string(),
            collection,
            created_at,
            updated_at,
            fields: decode_fields(&raw)?,
        })),
        None => Ok(None),
    }
}

fn encode_fields(fields: &Fields) -> StoreResult<String> {
    serde_json::to_string(fields)
        .map_err(|err| StoreError::validation("document_invalid_structure", err.to_string()))
}

fn decode_fields(raw: &str) -> StoreResult<Fields> {
    serde_json::from_str(raw)
        .map_err(|err| StoreError::Network(format!("corrupt local document: {err}")))
}

fn hash_password(password: &str) -> StoreResult<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|err| StoreError::Network(format!("password salt: {err}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| StoreError::Network(format!("password hash: {err}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!("event=password_verify module=store.sqlite status=corrupt_hash error={err}");
            false
        }
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation
    )
}

fn local_failure(err: rusqlite::Error) -> StoreError {
    StoreError::Network(format!("local store: {err}"))
}
