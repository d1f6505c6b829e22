use serde_json::Value;

use crate::qrcode;

fn parse_count_payload(arg0: Option<Value>) -> Result<String, String> {
    match arg0 {
        Some(Value::String(raw)) => Ok(raw),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Object(map)) => map
            .get("count")
            .or_else(|| map.get("tables"))
            .or_else(|| map.get("value"))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| "Missing table count".to_string()),
        _ => Err("Missing table count".into()),
    }
}

/// Kick off the sequenced reveal for the requested number of tables.
/// Invalid counts are rejected before a single card is shown.
#[tauri::command]
pub async fn qr_generate(
    arg0: Option<Value>,
    app: tauri::AppHandle,
    state: tauri::State<'_, qrcode::QrState>,
) -> Result<Value, String> {
    let raw_count = parse_count_payload(arg0)?;
    qrcode::start_reveal(app, &state, &raw_count)
}

#[tauri::command]
pub async fn qr_cancel(state: tauri::State<'_, qrcode::QrState>) -> Result<bool, String> {
    Ok(qrcode::cancel_reveal(&state))
}

/// The scanned inventory, so the frontend knows how many codes exist
/// before asking for a count.
#[tauri::command]
pub async fn qr_get_inventory(
    state: tauri::State<'_, qrcode::QrState>,
) -> Result<Value, String> {
    let cards = qrcode::scan_inventory(state.inventory_dir());
    serde_json::to_value(&cards).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn qr_print(
    app: tauri::AppHandle,
    state: tauri::State<'_, qrcode::QrState>,
) -> Result<Value, String> {
    qrcode::request_print(&app, &state)
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn count_payload_accepts_string_number_and_object() {
        assert_eq!(parse_count_payload(Some(serde_json::json!("5"))), Ok("5".into()));
        assert_eq!(parse_count_payload(Some(serde_json::json!(12))), Ok("12".into()));
        assert_eq!(
            parse_count_payload(Some(serde_json::json!({ "count": "7" }))),
            Ok("7".into())
        );
        assert_eq!(
            parse_count_payload(Some(serde_json::json!({ "tables": 3 }))),
            Ok("3".into())
        );
        assert!(parse_count_payload(None).is_err());
        assert!(parse_count_payload(Some(serde_json::json!({}))).is_err());
    }
}
