use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{api, live, payload_arg0_as_string, split_id_from_payload};

/// Realtime-tree path holding the restaurant menu.
pub const MENU_ITEMS_PATH: &str = "menuItems";

const SUBSCRIPTION_KEY: &str = "menu_items";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuItemPayload {
    #[serde(alias = "dish_name", alias = "dishName")]
    name: String,
    price: Value,
    category: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityPayload {
    #[serde(alias = "item_id", alias = "itemId")]
    id: String,
    #[serde(alias = "is_available")]
    is_available: bool,
}

fn parse_menu_item_payload(arg0: Option<Value>) -> Result<(MenuItemPayload, f64), String> {
    let payload = arg0.ok_or("Missing menu item payload")?;
    let mut parsed: MenuItemPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid menu item payload: {e}"))?;
    parsed.name = parsed.name.trim().to_string();
    parsed.category = parsed.category.trim().to_string();
    if parsed.name.is_empty() {
        return Err("Dish name is required".into());
    }
    if parsed.category.is_empty() {
        return Err("Dish category is required".into());
    }
    let price = parse_price(&parsed.price)?;
    Ok((parsed, price))
}

fn parse_price(price: &Value) -> Result<f64, String> {
    let parsed = match price {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(p) if p >= 0.0 => Ok(p),
        _ => Err("Price must be a non-negative number".into()),
    }
}

fn parse_availability_payload(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<AvailabilityPayload, String> {
    let payload = match (arg0, arg1) {
        (Some(Value::String(id)), Some(Value::Object(mut extra))) => {
            extra.insert("id".to_string(), Value::String(id));
            Value::Object(extra)
        }
        (Some(v), _) => v,
        (None, Some(v)) => v,
        _ => serde_json::json!({}),
    };
    let mut parsed: AvailabilityPayload = serde_json::from_value(payload)
        .map_err(|e| format!("Invalid availability payload: {e}"))?;
    parsed.id = parsed.id.trim().to_string();
    if parsed.id.is_empty() {
        return Err("Missing menu item id".into());
    }
    Ok(parsed)
}

fn build_menu_item_record(payload: &MenuItemPayload, price: f64) -> Value {
    serde_json::json!({
        "name": payload.name,
        "price": price,
        "category": payload.category,
        "description": payload.description.as_deref().unwrap_or_default(),
        // New dishes go live immediately; the availability toggle is how
        // they come off the customer menu later.
        "isAvailable": true,
        "createdAt": api::server_timestamp(),
    })
}

#[tauri::command]
pub async fn menu_subscribe(
    app: tauri::AppHandle,
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<Value, String> {
    Ok(live::subscribe(
        app,
        &live_state,
        SUBSCRIPTION_KEY,
        live::Source::Tree(MENU_ITEMS_PATH),
        None,
    ))
}

#[tauri::command]
pub async fn menu_unsubscribe(
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<bool, String> {
    Ok(live_state.cancel(SUBSCRIPTION_KEY))
}

#[tauri::command]
pub async fn menu_item_add(arg0: Option<Value>) -> Result<Value, String> {
    let (payload, price) = parse_menu_item_payload(arg0)?;
    let record = build_menu_item_record(&payload, price);
    let id = api::push_tree(MENU_ITEMS_PATH, &record).await?;
    info!(item_id = %id, dish = %payload.name, "menu item added");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

#[tauri::command]
pub async fn menu_item_update(arg0: Option<Value>, arg1: Option<Value>) -> Result<Value, String> {
    let (id, updates) = split_id_from_payload(arg0, arg1)?;
    if let Some(price) = updates.get("price") {
        parse_price(price)?;
    }
    api::update_tree(MENU_ITEMS_PATH, &id, &updates).await?;
    Ok(serde_json::json!({ "success": true, "id": id }))
}

/// Flip a dish's availability without touching anything else on it. The
/// customer menu only ever shows available dishes.
#[tauri::command]
pub async fn menu_item_set_availability(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let payload = parse_availability_payload(arg0, arg1)?;
    api::update_tree(
        MENU_ITEMS_PATH,
        &payload.id,
        &serde_json::json!({ "isAvailable": payload.is_available }),
    )
    .await?;
    info!(
        item_id = %payload.id,
        is_available = payload.is_available,
        "menu item availability changed"
    );
    Ok(serde_json::json!({ "success": true, "id": payload.id }))
}

#[tauri::command]
pub async fn menu_item_delete(arg0: Option<Value>) -> Result<Value, String> {
    let id =
        payload_arg0_as_string(arg0, &["id", "itemId", "value"]).ok_or("Missing menu item id")?;
    api::remove_tree(MENU_ITEMS_PATH, &id).await?;
    info!(item_id = %id, "menu item deleted");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

/// Group a menu snapshot by category, keeping only available dishes.
/// Shared with the customer view.
pub(crate) fn group_available_menu(records: Vec<Value>) -> Value {
    let mut grouped = serde_json::Map::new();
    for record in records {
        if record.get("isAvailable").and_then(Value::as_bool) != Some(true) {
            continue;
        }
        let category = record
            .get("category")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("uncategorized")
            .to_string();
        if let Some(items) = grouped
            .entry(category)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
        {
            items.push(record);
        }
    }
    Value::Object(grouped)
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn menu_item_payload_validates_price() {
        let (payload, price) = parse_menu_item_payload(Some(serde_json::json!({
            "dishName": "Paneer Tikka", "price": "7.50", "category": "starters",
            "description": "Char-grilled paneer",
        })))
        .expect("valid payload");
        assert_eq!(payload.name, "Paneer Tikka");
        assert!((price - 7.5).abs() < f64::EPSILON);

        assert!(parse_menu_item_payload(Some(serde_json::json!({
            "name": "Dal", "price": -2, "category": "mains",
        })))
        .is_err());
        assert!(parse_menu_item_payload(Some(serde_json::json!({
            "name": "Dal", "price": "free", "category": "mains",
        })))
        .is_err());
    }

    #[test]
    fn new_dishes_are_available_by_default() {
        let (payload, price) = parse_menu_item_payload(Some(serde_json::json!({
            "name": "Dal Makhani", "price": 6.0, "category": "mains",
        })))
        .expect("valid payload");
        let record = build_menu_item_record(&payload, price);
        assert_eq!(record["isAvailable"].as_bool(), Some(true));
        assert_eq!(record["description"].as_str(), Some(""));
        assert_eq!(record["createdAt"], api::server_timestamp());
    }

    #[test]
    fn availability_payload_supports_both_forms() {
        let parsed = parse_availability_payload(
            Some(serde_json::json!({ "id": "m-1", "isAvailable": false })),
            None,
        )
        .expect("object payload");
        assert_eq!(parsed.id, "m-1");
        assert!(!parsed.is_available);

        let parsed = parse_availability_payload(
            Some(serde_json::json!("m-2")),
            Some(serde_json::json!({ "isAvailable": true })),
        )
        .expect("tuple payload");
        assert_eq!(parsed.id, "m-2");
        assert!(parsed.is_available);
    }

    #[test]
    fn grouping_filters_unavailable_dishes() {
        let records = vec![
            serde_json::json!({ "id": "m-1", "name": "Samosa", "category": "starters", "isAvailable": true }),
            serde_json::json!({ "id": "m-2", "name": "Dal", "category": "mains", "isAvailable": true }),
            serde_json::json!({ "id": "m-3", "name": "Off menu", "category": "mains", "isAvailable": false }),
            serde_json::json!({ "id": "m-4", "name": "Mystery", "isAvailable": true }),
        ];
        let grouped = group_available_menu(records);
        assert_eq!(
            grouped["starters"].as_array().map(|a| a.len()),
            Some(1)
        );
        assert_eq!(grouped["mains"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(
            grouped["uncategorized"].as_array().map(|a| a.len()),
            Some(1)
        );
        assert_eq!(
            grouped["mains"][0]["name"].as_str(),
            Some("Dal")
        );
    }
}
