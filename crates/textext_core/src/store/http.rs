//! REST client for the hosted backend.
//!
//! # Responsibility
//! - Translate `RemoteStore` calls into backend HTTP requests.
//! - Map HTTP failures into the store error taxonomy.
//!
//! # Invariants
//! - Session state is carried by the client cookie jar only.
//! - Request timeouts come from `StoreConfig`; nothing is retried.
//! - Metadata keys (`$id`, `$createdAt`, ...) never leak into `fields`.

use super::filter::Filter;
use super::{Account, Collection, Document, Fields, RemoteStore, StoreError, StoreResult};
use crate::config::StoreConfig;
use async_trait::async_trait;
use chrono::DateTime;
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;

const PROJECT_HEADER: &str = "X-Appwrite-Project";
/// Page size for unbounded lists; the backend defaults to 25 otherwise.
const PAGE_SIZE: u32 = 100;

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct AccountBody {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
}

impl From<AccountBody> for Account {
    fn from(value: AccountBody) -> Self {
        Self {
            id: value.id,
            email: value.email,
            name: value.name,
        }
    }
}

/// HTTP-backed `RemoteStore`.
pub struct HttpStore {
    client: Client,
    config: StoreConfig,
}

impl HttpStore {
    /// Builds a client with a cookie-backed session and configured timeout.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| StoreError::Network(format!("http client init failed: {err}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn documents_url(&self, collection: Collection) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.config.base_url(),
            self.config.database_id,
            self.config.collection_id(collection)
        )
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}", self.documents_url(collection), id)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(PROJECT_HEADER, self.config.project_id.as_str())
            .header(
                "Origin",
                format!("appwrite-{}://{}", std::env::consts::OS, self.config.platform),
            )
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> StoreResult<Response> {
        let started_at = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "event=http_request module=store.http status=error op={operation} duration_ms={} error_code=network_error",
                    started_at.elapsed().as_millis()
                );
                return Err(StoreError::Network(err.to_string()));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(
                "event=http_request module=store.http status=ok op={operation} http_status={} duration_ms={}",
                status.as_u16(),
                started_at.elapsed().as_millis()
            );
            return Ok(response);
        }

        let body = response.json::<ErrorBody>().await.ok();
        let err = map_error_status(status, body);
        warn!(
            "event=http_request module=store.http status=error op={operation} http_status={} duration_ms={} error_code={}",
            status.as_u16(),
            started_at.elapsed().as_millis(),
            err.code()
        );
        Err(err)
    }

    async fn read_document(collection: Collection, response: Response) -> StoreResult<Document> {
        let value = read_json::<Value>(response).await?;
        parse_document(collection, value)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> StoreResult<Document> {
        let request = self
            .request(Method::POST, self.documents_url(collection))
            .json(&json!({ "documentId": id, "data": fields }));
        let response = self.send("create_document", request).await?;
        Self::read_document(collection, response).await
    }

    async fn get_document(&self, collection: Collection, id: &str) -> StoreResult<Document> {
        let request = self.request(Method::GET, self.document_url(collection, id));
        let response = self.send("get_document", request).await?;
        Self::read_document(collection, response).await
    }

    async fn list_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> StoreResult<Vec<Document>> {
        let paged = !filters.iter().any(|filter| matches!(filter, Filter::Limit(_)));
        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let queries = page_queries(filters, paged, cursor.as_deref());
            let request = self
                .request(Method::GET, self.documents_url(collection))
                .query(&queries);
            let response = self.send("list_documents", request).await?;
            let page = read_json::<DocumentList>(response).await?;
            let fetched = page.documents.len();
            for value in page.documents {
                documents.push(parse_document(collection, value)?);
            }
            if !paged || fetched < PAGE_SIZE as usize {
                break;
            }
            cursor = documents.last().map(|document| document.id.clone());
        }
        Ok(documents)
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> StoreResult<Document> {
        let request = self
            .request(Method::PATCH, self.document_url(collection, id))
            .json(&json!({ "data": fields }));
        let response = self.send("update_document", request).await?;
        Self::read_document(collection, response).await
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let request = self.request(Method::DELETE, self.document_url(collection, id));
        self.send("delete_document", request).await?;
        Ok(())
    }

    async fn current_account(&self) -> StoreResult<Account> {
        let url = format!("{}/account", self.config.base_url());
        let response = self.send("get_account", self.request(Method::GET, url)).await?;
        Ok(read_json::<AccountBody>(response).await?.into())
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<Account> {
        let url = format!("{}/account", self.config.base_url());
        let request = self.request(Method::POST, url).json(&json!({
            "userId": super::unique_id(),
            "email": email,
            "password": password,
            "name": name,
        }));
        let response = self.send("create_account", request).await?;
        Ok(read_json::<AccountBody>(response).await?.into())
    }

    async fn create_session(&self, email: &str, password: &str) -> StoreResult<Account> {
        let url = format!("{}/account/sessions/email", self.config.base_url());
        let request = self
            .request(Method::POST, url)
            .json(&json!({ "email": email, "password": password }));
        self.send("create_session", request).await?;
        self.current_account().await
    }

    async fn delete_session(&self) -> StoreResult<()> {
        let url = format!("{}/account/sessions/current", self.config.base_url());
        self.send("delete_session", self.request(Method::DELETE, url))
            .await?;
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> StoreResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| StoreError::Network(format!("malformed response body: {err}")))
}

/// Maps a non-success HTTP status to a store error.
///
/// - 401: no session.
/// - other 4xx: input rejected; code from the body `type`.
/// - 5xx and anything else: transient.
pub fn map_error_status(status: StatusCode, body: Option<ErrorBody>) -> StoreError {
    let body = body.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return StoreError::NotAuthenticated;
    }
    if status.is_client_error() {
        let code = if body.kind.trim().is_empty() {
            format!("http_{}", status.as_u16())
        } else {
            body.kind
        };
        return StoreError::RemoteValidation {
            code,
            message: body.message,
        };
    }
    StoreError::Network(format!("server responded {}: {}", status.as_u16(), body.message))
}

/// Splits backend metadata from user fields.
pub fn parse_document(collection: Collection, value: Value) -> StoreResult<Document> {
    let Value::Object(mut object) = value else {
        return Err(StoreError::Network(
            "malformed document: expected object".to_string(),
        ));
    };

    let id = match object.remove("$id") {
        Some(Value::String(id)) => id,
        _ => {
            return Err(StoreError::Network(
                "malformed document: missing `$id`".to_string(),
            ))
        }
    };
    let created_at = timestamp_ms(object.get("$createdAt"));
    let updated_at = timestamp_ms(object.get("$updatedAt")).max(created_at);
    object.retain(|key, _| !key.starts_with('$'));

    Ok(Document {
        id,
        collection,
        created_at,
        updated_at,
        fields: object,
    })
}

/// Query parameters for one list request. Unbounded lists page by cursor.
fn page_queries(
    filters: &[Filter],
    paged: bool,
    cursor: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut queries: Vec<(&'static str, String)> = filters
        .iter()
        .map(|filter| ("queries[]", filter.to_query()))
        .collect();
    if paged {
        queries.push(("queries[]", Filter::limit(PAGE_SIZE).to_query()));
        if let Some(id) = cursor {
            queries.push((
                "queries[]",
                json!({ "method": "cursorAfter", "values": [id] }).to_string(),
            ));
        }
    }
    queries
}

fn timestamp_ms(value: Option<&Value>) -> i64 {
    value
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map_or(0, |parsed| parsed.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::{
        map_error_status, page_queries, parse_document, ErrorBody, HttpStore, PAGE_SIZE,
    };
    use crate::store::Filter;
    use crate::config::StoreConfig;
    use crate::store::{Collection, StoreError};
    use reqwest::StatusCode;
    use serde_json::json;

    fn config() -> StoreConfig {
        StoreConfig::from_vars(
            [
                ("TEXTEXT_ENDPOINT", "https://backend.example/v1/"),
                ("TEXTEXT_PLATFORM", "com.textext.app"),
                ("TEXTEXT_PROJECT_ID", "proj"),
                ("TEXTEXT_STORAGE_ID", "bucket"),
                ("TEXTEXT_DATABASE_ID", "main"),
                ("TEXTEXT_TASK_COLLECTION_ID", "tasks_v2"),
            ]
            .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn builds_collection_urls_from_config() {
        let store = HttpStore::new(config()).unwrap();
        assert_eq!(
            store.document_url(Collection::Tasks, "t1"),
            "https://backend.example/v1/databases/main/collections/tasks_v2/documents/t1"
        );
        assert_eq!(
            store.documents_url(Collection::Users),
            "https://backend.example/v1/databases/main/collections/users/documents"
        );
    }

    #[test]
    fn unbounded_lists_page_with_limit_and_cursor() {
        let filters = [Filter::equal("Creator", "acct")];
        let first = page_queries(&filters, true, None);
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].1, Filter::limit(PAGE_SIZE).to_query());

        let next = page_queries(&filters, true, Some("t100"));
        let cursor: serde_json::Value = serde_json::from_str(&next[2].1).unwrap();
        assert_eq!(cursor, json!({ "method": "cursorAfter", "values": ["t100"] }));
    }

    #[test]
    fn explicit_limit_is_sent_as_is() {
        let filters = [Filter::search("username", "ada"), Filter::limit(25)];
        let queries = page_queries(&filters, false, None);
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|(key, _)| *key == "queries[]"));
    }

    #[test]
    fn unauthorized_maps_to_not_authenticated() {
        let err = map_error_status(StatusCode::UNAUTHORIZED, None);
        assert_eq!(err, StoreError::NotAuthenticated);
    }

    #[test]
    fn client_errors_keep_backend_type_as_code() {
        let err = map_error_status(
            StatusCode::NOT_FOUND,
            Some(ErrorBody {
                message: "Document with the requested ID could not be found.".to_string(),
                kind: "document_not_found".to_string(),
            }),
        );
        assert!(err.is_not_found());

        let err = map_error_status(StatusCode::BAD_REQUEST, None);
        assert_eq!(err.code(), "http_400");
    }

    #[test]
    fn server_errors_are_network_errors() {
        let err = map_error_status(StatusCode::BAD_GATEWAY, None);
        assert!(matches!(err, StoreError::Network(_)));
    }

    #[test]
    fn parse_document_strips_metadata() {
        let document = parse_document(
            Collection::Meetings,
            json!({
                "$id": "m1",
                "$collectionId": "meetings",
                "$createdAt": "2025-01-10T09:00:00.000+00:00",
                "$updatedAt": "2025-01-11T09:00:00.000+00:00",
                "Title": "Review",
                "Attendees": ["u2"]
            }),
        )
        .unwrap();
        assert_eq!(document.id, "m1");
        assert_eq!(document.created_at, 1_736_499_600_000);
        assert!(document.updated_at > document.created_at);
        assert!(document.fields.keys().all(|key| !key.starts_with('$')));
        assert_eq!(document.fields["Title"], "Review");
    }

    #[test]
    fn parse_document_requires_id() {
        let err = parse_document(Collection::Tasks, json!({ "Title": "x" })).unwrap_err();
        assert!(matches!(err, StoreError::Network(_)));
    }
}
