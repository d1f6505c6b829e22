use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tauri::{Emitter, Manager};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commands::menu::group_available_menu;
use crate::orders;
use crate::session::{CartState, CustomerSession};
use crate::{api, billing, live, value_i64};

const MENU_SUBSCRIPTION_KEY: &str = "customer_menu";
const ACTIVE_ORDER_SUBSCRIPTION_KEY: &str = "customer_active_order";
const ACTIVE_ORDER_POLL_INTERVAL_MS: u64 = 2_000;

fn parse_quantity_payload(arg0: Option<Value>) -> Result<(String, i64), String> {
    let payload = arg0.ok_or("Missing cart payload")?;
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("Missing cart item id")?
        .to_string();
    let quantity = value_i64(&payload, &["quantity", "qty"]).ok_or("Missing quantity")?;
    Ok((id, quantity))
}

// ---------------------------------------------------------------------------
// Session and menu
// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn customer_get_session(
    session: tauri::State<'_, CustomerSession>,
    cart: tauri::State<'_, CartState>,
) -> Result<Value, String> {
    Ok(serde_json::json!({
        "session": session.to_json(),
        "cart": cart.snapshot(),
    }))
}

/// The customer's browse view: available dishes only, grouped by
/// category.
#[tauri::command]
pub async fn customer_menu_subscribe(
    app: tauri::AppHandle,
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<Value, String> {
    let shape: live::Shape = Arc::new(group_available_menu);
    Ok(live::subscribe(
        app,
        &live_state,
        MENU_SUBSCRIPTION_KEY,
        live::Source::Tree(crate::commands::menu::MENU_ITEMS_PATH),
        Some(shape),
    ))
}

#[tauri::command]
pub async fn customer_menu_unsubscribe(
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<bool, String> {
    Ok(live_state.cancel(MENU_SUBSCRIPTION_KEY))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn cart_add_item(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
) -> Result<Value, String> {
    let item = arg0.ok_or("Missing menu item")?;
    cart.add_item(&item)
}

#[tauri::command]
pub async fn cart_set_quantity(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
) -> Result<Value, String> {
    let (id, quantity) = parse_quantity_payload(arg0)?;
    Ok(cart.set_quantity(&id, quantity))
}

#[tauri::command]
pub async fn cart_get(cart: tauri::State<'_, CartState>) -> Result<Value, String> {
    Ok(cart.snapshot())
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Write the cart as a new order. The cart is left alone here — it is
/// cleared when the live feed echoes the active order back, never
/// optimistically.
#[tauri::command]
pub async fn customer_place_order(
    session: tauri::State<'_, CustomerSession>,
    cart: tauri::State<'_, CartState>,
) -> Result<Value, String> {
    if cart.is_empty() {
        return Err("Your cart is empty. Add some items from the menu!".into());
    }

    let items = cart.lines_json();
    let order = orders::build_customer_order(
        session.table_number,
        &session.customer_name,
        &session.customer_phone,
        &items,
    );
    let id = api::add_document(billing::ORDERS_COLLECTION, &order).await?;
    info!(order_id = %id, table = session.table_number, "customer order placed");
    Ok(serde_json::json!({ "success": true, "orderId": id }))
}

/// Watch for an active order on the session's table. While one exists the
/// customer sees its status instead of the cart, so the first sighting
/// also clears the cart. Emits `customer_active_order` with the order or
/// null every time the answer changes.
#[tauri::command]
pub async fn customer_active_order_subscribe(
    app: tauri::AppHandle,
    live_state: tauri::State<'_, live::LiveState>,
    session: tauri::State<'_, CustomerSession>,
) -> Result<Value, String> {
    let table_number = session.table_number;
    let subscription_id = Uuid::new_v4().to_string();
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    live_state.register(
        ACTIVE_ORDER_SUBSCRIPTION_KEY,
        subscription_id.clone(),
        cancel_tx,
    );

    let cadence = Duration::from_millis(ACTIVE_ORDER_POLL_INTERVAL_MS);
    info!(table = table_number, "active-order watch started");

    tauri::async_runtime::spawn(async move {
        let mut last_seen: Option<Value> = None;
        let mut first_pass = true;

        loop {
            if *cancel_rx.borrow() {
                break;
            }

            match api::fetch_collection(billing::ORDERS_COLLECTION).await {
                Ok(snapshot) => {
                    let records = live::snapshot_to_list(&snapshot);
                    let active = orders::active_order_for_table(&records, table_number);
                    let changed = first_pass || last_seen != active;
                    if changed {
                        if active.is_some() {
                            // An order is in flight; the cart's contents
                            // are now the kitchen's problem.
                            app.state::<CartState>().clear();
                        }
                        let _ = app.emit(
                            "customer_active_order",
                            serde_json::json!({
                                "tableNumber": table_number,
                                "order": active.clone().unwrap_or(Value::Null),
                            }),
                        );
                        last_seen = active;
                        first_pass = false;
                    }
                }
                Err(error) => {
                    warn!(error = %error, "active-order watch poll failed");
                }
            }

            tokio::select! {
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(cadence) => {}
            }
        }

        info!(table = table_number, "active-order watch stopped");
    });

    Ok(serde_json::json!({
        "success": true,
        "subscriptionId": subscription_id,
        "intervalMs": ACTIVE_ORDER_POLL_INTERVAL_MS,
    }))
}

#[tauri::command]
pub async fn customer_active_order_unsubscribe(
    live_state: tauri::State<'_, live::LiveState>,
) -> Result<bool, String> {
    Ok(live_state.cancel(ACTIVE_ORDER_SUBSCRIPTION_KEY))
}

/// Completed orders for this customer, newest first.
#[tauri::command]
pub async fn customer_order_history(
    session: tauri::State<'_, CustomerSession>,
) -> Result<Value, String> {
    let snapshot = api::fetch_collection(billing::ORDERS_COLLECTION).await?;
    let records = live::snapshot_to_list(&snapshot);
    let history = orders::history_for_phone(&records, &session.customer_phone);
    Ok(Value::Array(history))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn quantity_payload_requires_id_and_quantity() {
        let (id, quantity) = parse_quantity_payload(Some(serde_json::json!({
            "id": "m-1", "quantity": 3,
        })))
        .expect("valid payload");
        assert_eq!(id, "m-1");
        assert_eq!(quantity, 3);

        assert!(parse_quantity_payload(Some(serde_json::json!({ "id": "m-1" }))).is_err());
        assert!(parse_quantity_payload(Some(serde_json::json!({ "quantity": 2 }))).is_err());
        assert!(parse_quantity_payload(None).is_err());
    }

    #[test]
    fn zero_quantity_is_a_valid_removal_request() {
        let (_, quantity) = parse_quantity_payload(Some(serde_json::json!({
            "id": "m-1", "qty": 0,
        })))
        .expect("zero removes the line");
        assert_eq!(quantity, 0);
    }
}
