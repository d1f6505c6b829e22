use serde_json::Value;

use crate::diagnostics;

#[tauri::command]
pub async fn app_get_version() -> Result<String, String> {
    Ok(env!("CARGO_PKG_VERSION").to_string())
}

#[tauri::command]
pub async fn app_get_about() -> Result<Value, String> {
    Ok(diagnostics::get_about_info())
}
