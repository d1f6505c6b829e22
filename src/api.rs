//! Hosted backend bridge.
//!
//! The dashboard owns no data: every entity lives in the hosted backend,
//! which exposes the realtime tree (`users`, `inventory`, `tables`,
//! `menuItems`) and the document collections (`orders`, `billing`, mounted
//! under `documents/`) through the same JSON REST surface. This module
//! provides authenticated access to that surface plus the hosted identity
//! endpoint used by the owner sign-in.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::info;

use crate::storage;

/// Default timeout for backend requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used specifically for the lightweight connectivity test.
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Hosted identity service (external collaborator, not reproduced).
const IDENTITY_SIGN_IN_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";

/// Document collections are mounted under this tree prefix.
pub const DOCUMENTS_PREFIX: &str = "documents";

/// Placeholder the backend resolves to its own clock when a write lands.
/// Records never carry client timestamps.
pub fn server_timestamp() -> Value {
    serde_json::json!({ ".sv": "timestamp" })
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Dashboard not configured: {0}")]
    NotConfigured(&'static str),
    #[error("Cannot reach backend at {url}")]
    Unreachable { url: String },
    #[error("Connection to {url} timed out")]
    Timeout { url: String },
    #[error("Invalid backend URL: {url}")]
    InvalidUrl { url: String },
    #[error("Network error communicating with {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0}")]
    Status(String),
    #[error("Invalid JSON from backend: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<ApiError> for String {
    fn from(err: ApiError) -> Self {
        err.to_string()
    }
}

/// Convert a `reqwest::Error` into the matching `ApiError` variant.
fn request_error(url: &str, err: reqwest::Error) -> ApiError {
    if err.is_connect() {
        return ApiError::Unreachable { url: url.into() };
    }
    if err.is_timeout() {
        return ApiError::Timeout { url: url.into() };
    }
    if err.is_builder() {
        return ApiError::InvalidUrl { url: url.into() };
    }
    ApiError::Network {
        url: url.into(),
        source: err,
    }
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "API key is invalid or expired".to_string(),
        403 => "Access to this backend path is denied".to_string(),
        404 => "Backend resource not found".to_string(),
        s if s >= 500 => format!("Backend server error (HTTP {s})"),
        s => format!("Unexpected response from backend (HTTP {s})"),
    }
}

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend base URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_backend_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Connection codes
// ---------------------------------------------------------------------------

/// A connection code is the JSON `{"url": ..., "key": ...}` handed out when
/// the backend project is provisioned, either raw or base64-encoded
/// (url-safe alphabet tolerated) so it can be pasted as one opaque string.
fn decode_connection_code(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str::<Value>(trimmed).ok();
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.starts_with('{') {
        return serde_json::from_str::<Value>(&compact).ok();
    }
    if compact.len() < 20 {
        return None;
    }

    let base64 = compact.replace('-', "+").replace('_', "/");
    let padded = format!(
        "{}{}",
        base64,
        "=".repeat((4usize.wrapping_sub(base64.len() % 4)) % 4)
    );
    let decoded = BASE64_STANDARD.decode(padded).ok()?;
    serde_json::from_slice::<Value>(&decoded).ok()
}

pub fn extract_api_key_from_connection_code(raw: &str) -> Option<String> {
    decode_connection_code(raw)
        .and_then(|v| {
            v.get("key")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
}

pub fn extract_backend_url_from_connection_code(raw: &str) -> Option<String> {
    decode_connection_code(raw)
        .and_then(|v| {
            v.get("url")
                .and_then(Value::as_str)
                .map(normalize_backend_url)
        })
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Request plumbing
// ---------------------------------------------------------------------------

fn stored_base_and_key() -> Result<(String, String), ApiError> {
    let base = storage::backend_url()
        .map(|u| normalize_backend_url(&u))
        .filter(|u| !u.is_empty())
        .ok_or(ApiError::NotConfigured("missing backend URL"))?;
    let key = storage::web_api_key()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(ApiError::NotConfigured("missing web API key"))?;
    Ok((base, key))
}

fn client(timeout: Duration) -> Result<Client, ApiError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ApiError::Status(format!("Failed to create HTTP client: {e}")))
}

/// Build the node URL for a tree path (and optional record id), with the
/// API key attached the way the backend expects it.
fn node_url(base: &str, key: &str, path: &str, id: Option<&str>) -> String {
    let path = path.trim_matches('/');
    match id {
        Some(id) => format!("{base}/{path}/{id}.json?auth={key}"),
        None => format!("{base}/{path}.json?auth={key}"),
    }
}

async fn read_json_body(resp: reqwest::Response) -> Result<Value, ApiError> {
    let status = resp.status();
    let body_text = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        // The backend reports failures as {"error": "..."}; fall back to the
        // generic status message when the body is opaque.
        let detail = serde_json::from_str::<Value>(&body_text)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(Value::as_str)
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| status_error(status));
        return Err(ApiError::Status(format!(
            "{detail} (HTTP {})",
            status.as_u16()
        )));
    }

    if body_text.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body_text)?)
}

// ---------------------------------------------------------------------------
// Realtime tree operations
// ---------------------------------------------------------------------------

/// Fetch the full snapshot of a tree path. An empty path yields `null`.
pub async fn fetch_tree(path: &str) -> Result<Value, ApiError> {
    let (base, key) = stored_base_and_key()?;
    let url = node_url(&base, &key, path, None);
    let resp = client(DEFAULT_TIMEOUT)?
        .get(&url)
        .send()
        .await
        .map_err(|e| request_error(&base, e))?;
    read_json_body(resp).await
}

/// Push a new record under a tree path. The backend assigns the id and
/// returns it as `{"name": id}`.
pub async fn push_tree(path: &str, body: &Value) -> Result<String, ApiError> {
    let (base, key) = stored_base_and_key()?;
    let url = node_url(&base, &key, path, None);
    let resp = client(DEFAULT_TIMEOUT)?
        .post(&url)
        .json(body)
        .send()
        .await
        .map_err(|e| request_error(&base, e))?;
    let value = read_json_body(resp).await?;
    value
        .get("name")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| ApiError::Status("Backend did not return an id for the new record".into()))
}

/// Partial update of an existing record: only the fields present in `body`
/// are written, everything else is left untouched.
pub async fn update_tree(path: &str, id: &str, body: &Value) -> Result<(), ApiError> {
    let (base, key) = stored_base_and_key()?;
    let url = node_url(&base, &key, path, Some(id));
    let resp = client(DEFAULT_TIMEOUT)?
        .patch(&url)
        .json(body)
        .send()
        .await
        .map_err(|e| request_error(&base, e))?;
    read_json_body(resp).await.map(|_| ())
}

/// Delete a record from a tree path.
pub async fn remove_tree(path: &str, id: &str) -> Result<(), ApiError> {
    let (base, key) = stored_base_and_key()?;
    let url = node_url(&base, &key, path, Some(id));
    let resp = client(DEFAULT_TIMEOUT)?
        .delete(&url)
        .send()
        .await
        .map_err(|e| request_error(&base, e))?;
    read_json_body(resp).await.map(|_| ())
}

// ---------------------------------------------------------------------------
// Document collections
// ---------------------------------------------------------------------------

/// Tree path backing a document collection.
pub fn collection_path(collection: &str) -> String {
    format!("{DOCUMENTS_PREFIX}/{collection}")
}

/// Fetch a document collection's full snapshot.
pub async fn fetch_collection(collection: &str) -> Result<Value, ApiError> {
    fetch_tree(&collection_path(collection)).await
}

/// Add a document to a collection; returns the backend-assigned id.
pub async fn add_document(collection: &str, body: &Value) -> Result<String, ApiError> {
    push_tree(&collection_path(collection), body).await
}

/// Partial update of a single document.
pub async fn update_document(collection: &str, id: &str, body: &Value) -> Result<(), ApiError> {
    update_tree(&collection_path(collection), id, body).await
}

// ---------------------------------------------------------------------------
// Identity endpoint
// ---------------------------------------------------------------------------

/// Exchange email/password for an identity at the hosted auth service.
/// Returns the raw identity payload (`localId`, `email`, `idToken`, ...).
pub async fn sign_in_with_password(email: &str, password: &str) -> Result<Value, ApiError> {
    let api_key = storage::web_api_key()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(ApiError::NotConfigured("missing web API key"))?;

    let url = format!("{IDENTITY_SIGN_IN_URL}?key={api_key}");
    let resp = client(DEFAULT_TIMEOUT)?
        .post(&url)
        .json(&serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        }))
        .send()
        .await
        .map_err(|e| request_error(IDENTITY_SIGN_IN_URL, e))?;
    read_json_body(resp).await
}

// ---------------------------------------------------------------------------
// Connectivity test
// ---------------------------------------------------------------------------

/// Result of a connectivity test.
#[derive(serde::Serialize)]
pub struct ConnectivityResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Test connectivity to the hosted backend with a lightweight shallow read
/// of the tree root.
pub async fn test_connectivity(backend_url: &str, api_key: &str) -> ConnectivityResult {
    let base = normalize_backend_url(backend_url);
    let resolved_key =
        extract_api_key_from_connection_code(api_key).unwrap_or_else(|| api_key.to_string());
    let probe_url = format!("{base}/.json?shallow=true&auth={resolved_key}");

    let client = match Client::builder().timeout(CONNECTIVITY_TIMEOUT).build() {
        Ok(c) => c,
        Err(e) => {
            return ConnectivityResult {
                success: false,
                latency_ms: None,
                error: Some(format!("Failed to create HTTP client: {e}")),
            };
        }
    };

    let start = Instant::now();

    let resp = match client.get(&probe_url).send().await {
        Ok(r) => r,
        Err(e) => {
            return ConnectivityResult {
                success: false,
                latency_ms: None,
                error: Some(request_error(&base, e).to_string()),
            };
        }
    };

    let latency = start.elapsed().as_millis() as u64;
    let status = resp.status();

    if status.is_success() {
        info!(latency_ms = latency, "connectivity test passed");
        ConnectivityResult {
            success: true,
            latency_ms: Some(latency),
            error: None,
        }
    } else {
        ConnectivityResult {
            success: false,
            latency_ms: Some(latency),
            error: Some(status_error(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_backend_url_adds_scheme_and_strips_api_suffix() {
        assert_eq!(
            normalize_backend_url("coll-495ac.example.app/api/"),
            "https://coll-495ac.example.app"
        );
        assert_eq!(
            normalize_backend_url("localhost:9000"),
            "http://localhost:9000"
        );
        assert_eq!(
            normalize_backend_url("https://db.example.app///"),
            "https://db.example.app"
        );
    }

    #[test]
    fn connection_code_decodes_raw_and_base64_json() {
        let raw = r#"{"url": "db.example.app", "key": "k-123"}"#;
        assert_eq!(
            extract_api_key_from_connection_code(raw).as_deref(),
            Some("k-123")
        );
        assert_eq!(
            extract_backend_url_from_connection_code(raw).as_deref(),
            Some("https://db.example.app")
        );

        let encoded = BASE64_STANDARD.encode(raw);
        assert_eq!(
            extract_api_key_from_connection_code(&encoded).as_deref(),
            Some("k-123")
        );
    }

    #[test]
    fn connection_code_rejects_garbage() {
        assert!(extract_api_key_from_connection_code("not a code").is_none());
        assert!(extract_api_key_from_connection_code("").is_none());
    }

    #[test]
    fn node_url_places_id_and_auth() {
        assert_eq!(
            node_url("https://db.example.app", "k", "tables", Some("t-1")),
            "https://db.example.app/tables/t-1.json?auth=k"
        );
        assert_eq!(
            node_url("https://db.example.app", "k", "/menuItems/", None),
            "https://db.example.app/menuItems.json?auth=k"
        );
    }

    #[test]
    fn collection_path_mounts_under_documents() {
        assert_eq!(collection_path("orders"), "documents/orders");
    }
}
