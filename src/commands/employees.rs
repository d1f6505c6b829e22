use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{api, live, payload_arg0_as_string, split_id_from_payload};

/// Realtime-tree path holding employee records.
pub const EMPLOYEES_PATH: &str = "users";

const SUBSCRIPTION_KEY: &str = "employees";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeePayload {
    #[serde(alias = "display_name", alias = "name")]
    display_name: String,
    email: String,
    #[serde(default, alias = "phone_number", alias = "phone")]
    phone_number: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    role: String,
}

fn parse_employee_payload(arg0: Option<Value>) -> Result<EmployeePayload, String> {
    let payload = arg0.ok_or("Missing employee payload")?;
    let mut parsed: EmployeePayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid employee payload: {e}"))?;
    parsed.display_name = parsed.display_name.trim().to_string();
    parsed.email = parsed.email.trim().to_string();
    parsed.role = parsed.role.trim().to_string();
    if parsed.display_name.is_empty() {
        return Err("Employee name is required".into());
    }
    if parsed.email.is_empty() {
        return Err("Employee email is required".into());
    }
    if parsed.role.is_empty() {
        return Err("Employee role is required".into());
    }
    Ok(parsed)
}

fn build_employee_record(payload: &EmployeePayload) -> Value {
    serde_json::json!({
        "displayName": payload.display_name,
        "email": payload.email,
        "phoneNumber": payload.phone_number.as_deref().unwrap_or_default(),
        "gender": payload.gender.as_deref().unwrap_or_default(),
        "role": payload.role,
        "createdAt": api::server_timestamp(),
    })
}

#[tauri::command]
pub async fn employees_subscribe(
    app: tauri::AppHandle,
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<Value, String> {
    Ok(live::subscribe(
        app,
        &live_state,
        SUBSCRIPTION_KEY,
        live::Source::Tree(EMPLOYEES_PATH),
        None,
    ))
}

#[tauri::command]
pub async fn employees_unsubscribe(
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<bool, String> {
    Ok(live_state.cancel(SUBSCRIPTION_KEY))
}

#[tauri::command]
pub async fn employee_add(arg0: Option<Value>) -> Result<Value, String> {
    let payload = parse_employee_payload(arg0)?;
    let record = build_employee_record(&payload);
    let id = api::push_tree(EMPLOYEES_PATH, &record).await?;
    info!(employee_id = %id, "employee added");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[tauri::command]
pub async fn employee_update(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let (id, updates) = split_id_from_payload(arg0, arg1)?;
    api::update_tree(EMPLOYEES_PATH, &id, &updates).await?;
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[tauri::command]
pub async fn employee_delete(arg0: Option<Value>) -> Result<Value, String> {
    let id = payload_arg0_as_string(arg0, &["id", "employeeId", "value"])
        .ok_or("Missing employee id")?;
    api::remove_tree(EMPLOYEES_PATH, &id).await?;
    info!(employee_id = %id, "employee deleted");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn employee_payload_requires_name_email_role() {
        let parsed = parse_employee_payload(Some(serde_json::json!({
            "displayName": " John Doe ",
            "email": "john.doe@example.com",
            "phoneNumber": "+1 234 567 890",
            "gender": "Male",
            "role": "Head Chef",
        })))
        .expect("complete payload");
        assert_eq!(parsed.display_name, "John Doe");
        assert_eq!(parsed.role, "Head Chef");

        assert!(parse_employee_payload(Some(serde_json::json!({
            "displayName": "John", "email": "", "role": "Chef",
        })))
        .is_err());
        assert!(parse_employee_payload(None).is_err());
    }

    #[test]
    fn new_employee_record_gets_a_server_timestamp() {
        let payload = parse_employee_payload(Some(serde_json::json!({
            "displayName": "John Doe",
            "email": "john.doe@example.com",
            "role": "Waiter",
        })))
        .expect("valid payload");
        let record = build_employee_record(&payload);
        assert_eq!(record["displayName"].as_str(), Some("John Doe"));
        assert_eq!(record["phoneNumber"].as_str(), Some(""));
        assert_eq!(record["createdAt"], api::server_timestamp());
        assert!(record.get("id").is_none());
    }
}
