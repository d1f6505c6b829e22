use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::orders::OrderStatus;
use crate::{api, billing, live};

const ORDERS_SUBSCRIPTION_KEY: &str = "billing_orders";
const TABLES_SUBSCRIPTION_KEY: &str = "billing_tables";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillPayload {
    #[serde(alias = "table_id")]
    table_id: String,
    #[serde(default, alias = "table_number")]
    table_number: Option<Value>,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStatusUpdatePayload {
    #[serde(alias = "order_id", alias = "orderId")]
    id: String,
    #[serde(alias = "current_status", alias = "currentStatus")]
    from: String,
    #[serde(alias = "next_status", alias = "nextStatus", alias = "status")]
    to: String,
}

fn parse_bill_payload(arg0: Option<Value>) -> Result<BillPayload, String> {
    let payload = arg0.ok_or("Missing bill payload")?;
    let mut parsed: BillPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid bill payload: {e}"))?;
    parsed.table_id = parsed.table_id.trim().to_string();
    Ok(parsed)
}

fn parse_status_update(arg0: Option<Value>) -> Result<(String, OrderStatus, OrderStatus), String> {
    let payload = arg0.ok_or("Missing order status payload")?;
    let mut parsed: OrderStatusUpdatePayload = serde_json::from_value(payload)
        .map_err(|e| format!("Invalid order status payload: {e}"))?;
    parsed.id = parsed.id.trim().to_string();
    if parsed.id.is_empty() {
        return Err("Missing order id".into());
    }
    let from = OrderStatus::parse(&parsed.from)?;
    let to = OrderStatus::parse(&parsed.to)?;
    if !from.can_transition_to(to) {
        return Err(format!(
            "Order cannot move from {} to {}",
            from.as_str(),
            to.as_str()
        ));
    }
    Ok((parsed.id, from, to))
}

// ---------------------------------------------------------------------------
// Live feeds
// ---------------------------------------------------------------------------

/// All orders, rendered as the recent-transactions table.
#[tauri::command]
pub async fn billing_orders_subscribe(
    app: tauri::AppHandle,
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<Value, String> {
    Ok(live::subscribe(
        app,
        &live_state,
        ORDERS_SUBSCRIPTION_KEY,
        live::Source::Collection(billing::ORDERS_COLLECTION),
        None,
    ))
}

#[tauri::command]
pub async fn billing_orders_unsubscribe(
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<bool, String> {
    Ok(live_state.cancel(ORDERS_SUBSCRIPTION_KEY))
}

/// Table-availability snapshots the bill modal picks a table from.
#[tauri::command]
pub async fn billing_tables_subscribe(
    app: tauri::AppHandle,
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<Value, String> {
    Ok(live::subscribe(
        app,
        &live_state,
        TABLES_SUBSCRIPTION_KEY,
        live::Source::Collection(billing::BILLING_COLLECTION),
        None,
    ))
}

#[tauri::command]
pub async fn billing_tables_unsubscribe(
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<bool, String> {
    Ok(live_state.cancel(TABLES_SUBSCRIPTION_KEY))
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn billing_income_data() -> Result<Value, String> {
    Ok(billing::daily_income_data())
}

/// One-shot AI summary of the day's income. This is the one place where
/// a failure is surfaced as text on the page instead of dying in a log.
#[tauri::command]
pub async fn billing_ai_summary() -> Result<Value, String> {
    let summary = billing::daily_summary().await?;
    Ok(serde_json::json!({ "summary": summary }))
}

// ---------------------------------------------------------------------------
// Bill generation and order lifecycle
// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn bill_finalize(arg0: Option<Value>) -> Result<Value, String> {
    let payload = parse_bill_payload(arg0)?;
    let table_number = payload.table_number.unwrap_or(Value::Null);
    let outcome = billing::finalize_bill(&payload.table_id, &table_number, &payload.items).await?;
    info!(
        table_id = %payload.table_id,
        success = outcome.get("success").and_then(|v| v.as_bool()).unwrap_or(false),
        "bill finalized"
    );
    Ok(outcome)
}

/// Staff-driven order lifecycle step. Exactly one field is written, and
/// only single forward steps are accepted.
#[tauri::command]
pub async fn order_update_status(arg0: Option<Value>) -> Result<Value, String> {
    let (id, from, to) = parse_status_update(arg0)?;
    api::update_document(
        billing::ORDERS_COLLECTION,
        &id,
        &serde_json::json!({ "status": to.as_str() }),
    )
    .await?;
    info!(order_id = %id, from = from.as_str(), to = to.as_str(), "order status updated");
    Ok(serde_json::json!({ "success": true, "id": id, "status": to.as_str() }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn bill_payload_parses_table_and_items() {
        let parsed = parse_bill_payload(Some(serde_json::json!({
            "tableId": " t-3 ",
            "tableNumber": "T3",
            "items": [{ "name": "Item X", "price": 9.0, "quantity": 1 }],
        })))
        .expect("valid payload");
        assert_eq!(parsed.table_id, "t-3");
        assert_eq!(parsed.items.len(), 1);
    }

    #[test]
    fn status_update_accepts_single_forward_steps() {
        let (id, from, to) = parse_status_update(Some(serde_json::json!({
            "id": "o-1", "currentStatus": "Pending", "status": "Preparing",
        })))
        .expect("legal transition");
        assert_eq!(id, "o-1");
        assert_eq!(from, OrderStatus::Pending);
        assert_eq!(to, OrderStatus::Preparing);
    }

    #[test]
    fn status_update_rejects_skips_and_reversals() {
        let err = parse_status_update(Some(serde_json::json!({
            "id": "o-1", "from": "Pending", "to": "Ready",
        })))
        .expect_err("skipping Preparing");
        assert!(err.contains("cannot move"), "unexpected error: {err}");

        assert!(parse_status_update(Some(serde_json::json!({
            "id": "o-1", "from": "Ready", "to": "Preparing",
        })))
        .is_err());
        assert!(parse_status_update(Some(serde_json::json!({
            "id": "o-1", "from": "Done", "to": "Pending",
        })))
        .is_err());
    }
}
