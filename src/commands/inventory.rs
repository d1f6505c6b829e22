use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{api, live, payload_arg0_as_string, split_id_from_payload};

/// Realtime-tree path holding inventory records.
pub const INVENTORY_PATH: &str = "inventory";

const SUBSCRIPTION_KEY: &str = "inventory";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryItemPayload {
    #[serde(alias = "item_name", alias = "itemName")]
    name: String,
    category: String,
    quantity: Value,
    unit: String,
    #[serde(default)]
    supplier: Option<String>,
}

fn parse_inventory_payload(arg0: Option<Value>) -> Result<InventoryItemPayload, String> {
    let payload = arg0.ok_or("Missing inventory payload")?;
    let mut parsed: InventoryItemPayload = serde_json::from_value(payload)
        .map_err(|e| format!("Invalid inventory payload: {e}"))?;
    parsed.name = parsed.name.trim().to_string();
    parsed.category = parsed.category.trim().to_string();
    parsed.unit = parsed.unit.trim().to_string();
    if parsed.name.is_empty() {
        return Err("Item name is required".into());
    }
    if parsed.category.is_empty() {
        return Err("Item category is required".into());
    }
    if parsed.unit.is_empty() {
        return Err("Item unit is required".into());
    }
    validate_quantity(&parsed.quantity)?;
    Ok(parsed)
}

/// Quantities arrive as numbers or numeric strings depending on the form;
/// either way they must be non-negative.
fn validate_quantity(quantity: &Value) -> Result<(), String> {
    let parsed = match quantity {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(q) if q >= 0.0 => Ok(()),
        _ => Err("Quantity must be a non-negative number".into()),
    }
}

fn build_inventory_record(payload: &InventoryItemPayload) -> Value {
    serde_json::json!({
        "name": payload.name,
        "category": payload.category,
        "quantity": payload.quantity,
        "unit": payload.unit,
        "supplier": payload.supplier.as_deref().unwrap_or_default(),
        "createdAt": api::server_timestamp(),
    })
}

#[tauri::command]
pub async fn inventory_subscribe(
    app: tauri::AppHandle,
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<Value, String> {
    Ok(live::subscribe(
        app,
        &live_state,
        SUBSCRIPTION_KEY,
        live::Source::Tree(INVENTORY_PATH),
        None,
    ))
}

#[tauri::command]
pub async fn inventory_unsubscribe(
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<bool, String> {
    Ok(live_state.cancel(SUBSCRIPTION_KEY))
}

#[tauri::command]
pub async fn inventory_item_add(arg0: Option<Value>) -> Result<Value, String> {
    let payload = parse_inventory_payload(arg0)?;
    let record = build_inventory_record(&payload);
    let id = api::push_tree(INVENTORY_PATH, &record).await?;
    info!(item_id = %id, "inventory item added");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[tauri::command]
pub async fn inventory_item_update(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let (id, updates) = split_id_from_payload(arg0, arg1)?;
    if let Some(quantity) = updates.get("quantity") {
        validate_quantity(quantity)?;
    }
    api::update_tree(INVENTORY_PATH, &id, &updates).await?;
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[tauri::command]
pub async fn inventory_item_delete(arg0: Option<Value>) -> Result<Value, String> {
    let id =
        payload_arg0_as_string(arg0, &["id", "itemId", "value"]).ok_or("Missing item id")?;
    api::remove_tree(INVENTORY_PATH, &id).await?;
    info!(item_id = %id, "inventory item deleted");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn inventory_payload_accepts_string_and_numeric_quantities() {
        let from_number = parse_inventory_payload(Some(serde_json::json!({
            "name": "Basmati Rice", "category": "Dry Goods",
            "quantity": 25, "unit": "kg", "supplier": "Wholesale Foods",
        })))
        .expect("numeric quantity");
        assert_eq!(from_number.name, "Basmati Rice");

        parse_inventory_payload(Some(serde_json::json!({
            "itemName": "Olive Oil", "category": "Oils",
            "quantity": "12.5", "unit": "l",
        })))
        .expect("string quantity");
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let err = parse_inventory_payload(Some(serde_json::json!({
            "name": "Flour", "category": "Dry Goods",
            "quantity": -3, "unit": "kg",
        })))
        .expect_err("negative quantity");
        assert!(err.contains("non-negative"), "unexpected error: {err}");

        assert!(validate_quantity(&serde_json::json!("lots")).is_err());
        assert!(validate_quantity(&serde_json::json!(0)).is_ok());
    }

    #[test]
    fn record_defaults_missing_supplier() {
        let payload = parse_inventory_payload(Some(serde_json::json!({
            "name": "Flour", "category": "Dry Goods", "quantity": 5, "unit": "kg",
        })))
        .expect("valid payload");
        let record = build_inventory_record(&payload);
        assert_eq!(record["supplier"].as_str(), Some(""));
        assert_eq!(record["createdAt"], api::server_timestamp());
    }
}
