use serde_json::Value;
use tauri::Emitter;
use tracing::info;

use crate::{api, auth, live, storage};

#[tauri::command]
pub async fn settings_is_configured() -> Result<bool, String> {
    Ok(storage::is_configured())
}

#[tauri::command]
pub async fn settings_get_backend_config() -> Result<Value, String> {
    Ok(storage::get_backend_config())
}

#[tauri::command]
pub async fn settings_update_backend_credentials(arg0: Option<Value>) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing credentials payload")?;
    storage::update_backend_credentials(&payload)
}

/// Lightweight reachability probe for the settings screen. Accepts an
/// explicit URL/key pair so the onboarding form can test before saving;
/// otherwise the stored credentials are used.
#[tauri::command]
pub async fn settings_test_connection(arg0: Option<Value>) -> Result<Value, String> {
    let payload = arg0.unwrap_or_else(|| serde_json::json!({}));
    let url = payload
        .get("backendUrl")
        .or_else(|| payload.get("backend_url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(storage::backend_url)
        .ok_or("No backend URL to test")?;
    let key = payload
        .get("webApiKey")
        .or_else(|| payload.get("web_api_key"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(storage::web_api_key)
        .ok_or("No API key to test")?;

    let result = api::test_connectivity(&url, &key).await;
    serde_json::to_value(result).map_err(|e| e.to_string())
}

/// Wipe every credential, drop the session, and release all live
/// subscriptions, then tell the frontend to fall back to onboarding.
#[tauri::command]
pub async fn settings_factory_reset(
    auth_state: tauri::State<'_, auth::AuthState>,
    live_state: tauri::State<'_, live::LiveState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    info!("factory reset requested");
    live_state.cancel_all();
    auth::sign_out(&auth_state);
    let result = storage::factory_reset()?;
    let _ = app.emit("app_reset", serde_json::json!({ "reason": "factory_reset" }));
    Ok(result)
}
