use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{api, live, payload_arg0_as_string, split_id_from_payload};

/// Realtime-tree path holding the restaurant's tables.
pub const TABLES_PATH: &str = "tables";

/// The three states a table can be in. The billing flow writes Occupied
/// as a side effect of bill generation; everything else is set here.
pub const TABLE_STATUSES: &[&str] = &["Available", "Occupied", "Reserved"];

const SUBSCRIPTION_KEY: &str = "tables";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TablePayload {
    #[serde(alias = "table_number", alias = "number")]
    table_number: String,
    capacity: Value,
}

fn parse_table_payload(arg0: Option<Value>) -> Result<TablePayload, String> {
    let payload = arg0.ok_or("Missing table payload")?;
    let mut parsed: TablePayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid table payload: {e}"))?;
    parsed.table_number = parsed.table_number.trim().to_string();
    if parsed.table_number.is_empty() {
        return Err("Table number is required".into());
    }
    parse_capacity(&parsed.capacity)?;
    Ok(parsed)
}

fn parse_capacity(capacity: &Value) -> Result<i64, String> {
    let parsed = match capacity {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(c) if c > 0 => Ok(c),
        _ => Err("Capacity must be a positive number".into()),
    }
}

pub(crate) fn validate_table_status(status: &str) -> Result<(), String> {
    if TABLE_STATUSES.contains(&status.trim()) {
        Ok(())
    } else {
        Err(format!("Unknown table status: {status}"))
    }
}

fn build_table_record(payload: &TablePayload) -> Result<Value, String> {
    let capacity = parse_capacity(&payload.capacity)?;
    Ok(serde_json::json!({
        "tableNumber": payload.table_number,
        "capacity": capacity,
        // New tables always start out free.
        "status": "Available",
        "createdAt": api::server_timestamp(),
    }))
}

#[tauri::command]
pub async fn tables_subscribe(
    app: tauri::AppHandle,
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<Value, String> {
    Ok(live::subscribe(
        app,
        &live_state,
        SUBSCRIPTION_KEY,
        live::Source::Tree(TABLES_PATH),
        None,
    ))
}

#[tauri::command]
pub async fn tables_unsubscribe(
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<bool, String> {
    Ok(live_state.cancel(SUBSCRIPTION_KEY))
}

#[tauri::command]
pub async fn table_add(arg0: Option<Value>) -> Result<Value, String> {
    let payload = parse_table_payload(arg0)?;
    let record = build_table_record(&payload)?;
    let id = api::push_tree(TABLES_PATH, &record).await?;
    info!(table_id = %id, table_number = %payload.table_number, "table added");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[tauri::command]
pub async fn table_update(arg0: Option<Value>, arg1: Option<Value>) -> Result<Value, String> {
    let (id, updates) = split_id_from_payload(arg0, arg1)?;
    if let Some(status) = updates.get("status").and_then(Value::as_str) {
        validate_table_status(status)?;
    }
    if let Some(capacity) = updates.get("capacity") {
        parse_capacity(capacity)?;
    }
    api::update_tree(TABLES_PATH, &id, &updates).await?;
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[tauri::command]
pub async fn table_delete(arg0: Option<Value>) -> Result<Value, String> {
    let id =
        payload_arg0_as_string(arg0, &["id", "tableId", "value"]).ok_or("Missing table id")?;
    api::remove_tree(TABLES_PATH, &id).await?;
    info!(table_id = %id, "table deleted");
    Ok(serde_json::json!({ "success": true, "id": id }))
}
