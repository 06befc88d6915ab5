//! Firestore REST v1 adapter.
//!
//! Create posts to the collection and lets the server pick the document id.
//! Update is a `PATCH` with one `updateMask.fieldPaths` per top-level key and
//! the `currentDocument.exists=true` precondition, so it can never create.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use survey_spec::{Fields, wire};
use tracing::debug;

use crate::store::{DocumentStore, StoreError};

const PRODUCTION_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_DATABASE: &str = "(default)";
// The emulator accepts this token as an admin caller.
const EMULATOR_TOKEN: &str = "owner";

pub struct FirestoreStore {
    client: Client,
    documents_url: String,
    token: Option<String>,
}

impl FirestoreStore {
    pub fn new(project_id: &str, access_token: impl Into<String>) -> Self {
        Self::with_base_url(PRODUCTION_BASE_URL, project_id, Some(access_token.into()))
    }

    /// Targets a local emulator, e.g. `localhost:8080`.
    pub fn emulator(host: &str, project_id: &str) -> Self {
        let base = format!("http://{}/v1", host.trim_end_matches('/'));
        Self::with_client(
            local_client(),
            &base,
            project_id,
            Some(EMULATOR_TOKEN.to_string()),
        )
    }

    pub fn with_base_url(base_url: &str, project_id: &str, token: Option<String>) -> Self {
        Self::with_client(Client::new(), base_url, project_id, token)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        project_id: &str,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            documents_url: documents_url(base_url, project_id),
            token,
        }
    }

    pub fn documents_url(&self) -> &str {
        &self.documents_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

// Local emulators are reached directly, never through a configured proxy.
fn local_client() -> Client {
    Client::builder()
        .no_proxy()
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn documents_url(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/projects/{}/databases/{}/documents",
        base_url.trim_end_matches('/'),
        project_id,
        DEFAULT_DATABASE
    )
}

/// Query pairs for a merge patch of the given top-level keys.
pub fn update_query(fields: &Fields) -> Vec<(&'static str, String)> {
    let mut query = fields
        .keys()
        .map(|key| ("updateMask.fieldPaths", key.clone()))
        .collect::<Vec<_>>();
    query.push(("currentDocument.exists", "true".to_string()));
    query
}

/// Last segment of a full resource name such as
/// `projects/p/databases/(default)/documents/diagnosticos/AbC123`.
pub fn document_id_from_name(name: &str) -> Option<&str> {
    name.rsplit('/').next().filter(|segment| !segment.is_empty())
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    name: String,
    #[serde(default)]
    fields: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{}: {}", status, envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Maps a non-success response onto the store error taxonomy.
pub fn map_http_error(
    status: StatusCode,
    body: &str,
    collection: &str,
    id: Option<&str>,
) -> StoreError {
    let message = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        StatusCode::NOT_FOUND => StoreError::NotFound {
            collection: collection.to_string(),
            id: id.unwrap_or_default().to_string(),
        },
        _ => StoreError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

fn read_document(
    response: Response,
    collection: &str,
    id: Option<&str>,
) -> Result<DocumentResponse, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(map_http_error(status, &body, collection, id));
    }
    response
        .json::<DocumentResponse>()
        .map_err(|err| StoreError::Decode(err.to_string()))
}

impl DocumentStore for FirestoreStore {
    fn create(&self, collection: &str, fields: &Fields) -> Result<String, StoreError> {
        let url = self.collection_url(collection);
        debug!(%url, "creating document");
        let response = self
            .authorize(self.client.post(&url))
            .json(&wire::encode_document(fields))
            .send()?;
        let document = read_document(response, collection, None)?;
        document_id_from_name(&document.name)
            .map(str::to_string)
            .ok_or_else(|| {
                StoreError::Decode(format!("document name '{}' has no id", document.name))
            })
    }

    fn update(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError> {
        let url = self.document_url(collection, id);
        debug!(%url, keys = ?fields.keys().collect::<Vec<_>>(), "patching document");
        let response = self
            .authorize(self.client.patch(&url))
            .query(&update_query(fields))
            .json(&wire::encode_document(fields))
            .send()?;
        read_document(response, collection, Some(id)).map(|_| ())
    }

    fn fetch(&self, collection: &str, id: &str) -> Result<Fields, StoreError> {
        let url = self.document_url(collection, id);
        debug!(%url, "fetching document");
        let response = self.authorize(self.client.get(&url)).send()?;
        let document = read_document(response, collection, Some(id))?;
        Ok(wire::decode_fields(document.fields.as_ref())?)
    }
}
