//! Secure backend config storage using the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the Secret Service API. The dashboard stores the hosted
//! backend base URL and the two API keys here so they never land in a flat
//! config file.

use keyring::Entry;
use serde_json::Value;
use tracing::{info, warn};

const SERVICE_NAME: &str = "allrounder-dashboard";

// Credential keys
const KEY_BACKEND_URL: &str = "backend_url";
const KEY_WEB_API_KEY: &str = "web_api_key";
const KEY_INSIGHT_API_KEY: &str = "insight_api_key";

/// All credential keys managed by this module.
const ALL_KEYS: &[&str] = &[KEY_BACKEND_URL, KEY_WEB_API_KEY, KEY_INSIGHT_API_KEY];

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

pub fn has_credential(key: &str) -> bool {
    get_credential(key).is_some()
}

// ---------------------------------------------------------------------------
// High-level API
// ---------------------------------------------------------------------------

/// The dashboard is considered configured when the backend URL and the web
/// API key are both present in the credential store. The insight key is
/// optional; without it only the AI features fail.
pub fn is_configured() -> bool {
    has_credential(KEY_BACKEND_URL) && has_credential(KEY_WEB_API_KEY)
}

/// Currently stored backend base URL, if any.
pub fn backend_url() -> Option<String> {
    get_credential(KEY_BACKEND_URL)
}

/// Currently stored web API key (identity endpoint + tree access), if any.
pub fn web_api_key() -> Option<String> {
    get_credential(KEY_WEB_API_KEY)
}

/// Currently stored generative-text endpoint key, if any.
pub fn insight_api_key() -> Option<String> {
    get_credential(KEY_INSIGHT_API_KEY)
}

/// Return the stored backend config as the JSON shape the settings screen
/// expects. Keys are reported as present/absent, never echoed back.
pub fn get_backend_config() -> Value {
    serde_json::json!({
        "backend_url": get_credential(KEY_BACKEND_URL),
        "has_web_api_key": has_credential(KEY_WEB_API_KEY),
        "has_insight_api_key": has_credential(KEY_INSIGHT_API_KEY),
    })
}

/// Store backend credentials received during onboarding.
///
/// Expected JSON shape (camelCase, matching the settings screen payload):
/// ```json
/// {
///   "backendUrl": "...",
///   "webApiKey": "...",      // or a pasted connection code
///   "insightApiKey": "..."   // optional
/// }
/// ```
///
/// `webApiKey` may also be a connection code (base64 JSON `{url, key}`), in
/// which case the embedded URL wins over `backendUrl`.
pub fn update_backend_credentials(payload: &Value) -> Result<Value, String> {
    let raw_key = payload
        .get("webApiKey")
        .or_else(|| payload.get("web_api_key"))
        .and_then(Value::as_str)
        .ok_or("Missing required field: webApiKey")?;
    let mut backend_url = payload
        .get("backendUrl")
        .or_else(|| payload.get("backend_url"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let mut web_api_key = raw_key.trim().to_string();
    if let Some(decoded_key) = crate::api::extract_api_key_from_connection_code(raw_key) {
        web_api_key = decoded_key;
        if let Some(decoded_url) = crate::api::extract_backend_url_from_connection_code(raw_key) {
            backend_url = Some(decoded_url);
        }
    }

    if web_api_key.trim().is_empty() {
        return Err("Missing required field: webApiKey".to_string());
    }
    let backend_url = backend_url.ok_or("Missing required field: backendUrl")?;
    let normalized = crate::api::normalize_backend_url(&backend_url);
    if normalized.trim().is_empty() {
        return Err("Invalid backend URL".to_string());
    }

    set_credential(KEY_BACKEND_URL, normalized.trim())?;
    set_credential(KEY_WEB_API_KEY, web_api_key.trim())?;

    if let Some(insight_key) = payload
        .get("insightApiKey")
        .or_else(|| payload.get("insight_api_key"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        set_credential(KEY_INSIGHT_API_KEY, insight_key)?;
    }

    info!(backend_url = %normalized, "backend credentials updated");
    Ok(serde_json::json!({ "success": true }))
}

/// Delete every stored credential (factory reset).
pub fn factory_reset() -> Result<Value, String> {
    info!("performing factory reset - deleting all credentials");
    for key in ALL_KEYS {
        delete_credential(key)?;
    }
    Ok(serde_json::json!({ "success": true }))
}
