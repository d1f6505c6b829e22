//! Order domain: the status lifecycle and the record shapes shared by the
//! customer ordering flow and the billing page's bill generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{api, value_f64, value_i64, value_str};

/// Lifecycle of an order. Transitions are forward-only, one step at a
/// time, and driven by manual staff action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Done,
}

/// Statuses that make an order "active" for a table — the customer view
/// shows the order-status screen instead of the menu while one exists.
pub const ACTIVE_STATUSES: [OrderStatus; 3] = [
    OrderStatus::Pending,
    OrderStatus::Preparing,
    OrderStatus::Ready,
];

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Done => "Done",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "Pending" => Ok(OrderStatus::Pending),
            "Preparing" => Ok(OrderStatus::Preparing),
            "Ready" => Ok(OrderStatus::Ready),
            "Done" => Ok(OrderStatus::Done),
            other => Err(format!("Unknown order status: {other}")),
        }
    }

    /// The single legal successor, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Done),
            OrderStatus::Done => None,
        }
    }

    pub fn can_transition_to(&self, target: Self) -> bool {
        self.next() == Some(target)
    }

    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(self)
    }
}

// ---------------------------------------------------------------------------
// Line items and totals
// ---------------------------------------------------------------------------

/// Sum of price x quantity over a line-item list. Missing fields count as
/// zero rather than poisoning the whole total.
pub fn items_total(items: &[Value]) -> f64 {
    items
        .iter()
        .map(|item| {
            let price = value_f64(item, &["price"]).unwrap_or(0.0);
            let quantity = value_f64(item, &["quantity", "qty"]).unwrap_or(0.0);
            price * quantity
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

/// Order record written by the customer "place order" flow.
pub fn build_customer_order(
    table_number: i64,
    customer_name: &str,
    customer_phone: &str,
    items: &[Value],
) -> Value {
    serde_json::json!({
        "tableNumber": table_number,
        "customerName": customer_name,
        "customerPhone": customer_phone,
        "items": items,
        "status": OrderStatus::Pending.as_str(),
        "createdAt": api::server_timestamp(),
    })
}

/// Order record written by the billing page's bill modal, plus the
/// computed total.
pub fn build_bill_order(table_id: &str, table_number: &Value, items: &[Value]) -> (Value, f64) {
    let total = items_total(items);
    let order = serde_json::json!({
        "tableId": table_id,
        "tableNumber": table_number,
        "orderTime": api::server_timestamp(),
        "status": OrderStatus::Pending.as_str(),
        "totalAmount": total,
        "createdAt": api::server_timestamp(),
        "items": items,
    });
    (order, total)
}

// ---------------------------------------------------------------------------
// Order queries over live snapshots
// ---------------------------------------------------------------------------

/// Tolerant table-number comparison: orders written by the customer flow
/// carry a number, bills carry whatever the billing record held.
fn table_number_matches(record: &Value, table_number: i64) -> bool {
    match record.get("tableNumber") {
        Some(Value::Number(n)) => n.as_i64() == Some(table_number),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok() == Some(table_number),
        _ => false,
    }
}

/// First active order for the given table, if any. Mirrors the customer
/// view's query (`tableNumber ==` and `status in` the active set).
pub fn active_order_for_table(records: &[Value], table_number: i64) -> Option<Value> {
    records
        .iter()
        .find(|record| {
            let active = value_str(record, &["status"])
                .and_then(|s| OrderStatus::parse(&s).ok())
                .map(|s| s.is_active())
                .unwrap_or(false);
            active && table_number_matches(record, table_number)
        })
        .cloned()
}

/// Completed orders for the given phone, newest first, each augmented with
/// a `total` computed from its line items.
pub fn history_for_phone(records: &[Value], phone: &str) -> Vec<Value> {
    let mut history: Vec<Value> = records
        .iter()
        .filter(|record| {
            value_str(record, &["status"]).as_deref() == Some(OrderStatus::Done.as_str())
                && value_str(record, &["customerPhone"]).as_deref() == Some(phone)
        })
        .map(|record| {
            let mut entry = record.clone();
            let total = entry
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items_total(items))
                .unwrap_or(0.0);
            if let Some(fields) = entry.as_object_mut() {
                fields.insert("total".to_string(), serde_json::json!(total));
            }
            entry
        })
        .collect();

    history.sort_by_key(|record| std::cmp::Reverse(value_i64(record, &["createdAt"]).unwrap_or(0)));
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lifecycle_is_forward_only() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Done));

        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Done.next().is_none());
    }

    #[test]
    fn active_set_excludes_done() {
        assert!(OrderStatus::Pending.is_active());
        assert!(OrderStatus::Preparing.is_active());
        assert!(OrderStatus::Ready.is_active());
        assert!(!OrderStatus::Done.is_active());
    }

    #[test]
    fn status_parse_round_trips() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Done,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Ok(status));
        }
        assert!(OrderStatus::parse("Cancelled").is_err());
    }

    #[test]
    fn items_total_sums_price_times_quantity() {
        let items = vec![
            serde_json::json!({ "name": "Item X", "price": 9.00, "quantity": 1 }),
            serde_json::json!({ "name": "Item Y", "price": 5.00, "quantity": 2 }),
        ];
        assert!((items_total(&items) - 19.00).abs() < f64::EPSILON);
    }

    #[test]
    fn bill_order_carries_total_and_pending_status() {
        let items = vec![
            serde_json::json!({ "name": "Item X", "price": 9.00, "quantity": 1 }),
            serde_json::json!({ "name": "Item Y", "price": 5.00, "quantity": 2 }),
        ];
        let (order, total) = build_bill_order("t-3", &serde_json::json!("T3"), &items);
        assert!((total - 19.00).abs() < f64::EPSILON);
        assert_eq!(order.get("status").and_then(Value::as_str), Some("Pending"));
        assert_eq!(order.get("tableId").and_then(Value::as_str), Some("t-3"));
        assert_eq!(
            order.get("totalAmount").and_then(Value::as_f64),
            Some(19.00)
        );
        // Timestamps are server-assigned placeholders, never client clocks.
        assert_eq!(order.get("createdAt"), Some(&api::server_timestamp()));
        assert_eq!(order.get("orderTime"), Some(&api::server_timestamp()));
    }

    #[test]
    fn active_order_lookup_filters_table_and_status() {
        let records = vec![
            serde_json::json!({ "id": "o-1", "tableNumber": 4, "status": "Pending" }),
            serde_json::json!({ "id": "o-2", "tableNumber": 5, "status": "Done" }),
            serde_json::json!({ "id": "o-3", "tableNumber": "5", "status": "Preparing" }),
        ];
        let found = active_order_for_table(&records, 5).expect("order o-3 is active for table 5");
        assert_eq!(found.get("id").and_then(Value::as_str), Some("o-3"));
        assert!(active_order_for_table(&records, 9).is_none());
    }

    #[test]
    fn history_filters_sorts_and_totals() {
        let records = vec![
            serde_json::json!({
                "id": "o-1", "customerPhone": "+911234567890", "status": "Done",
                "createdAt": 100,
                "items": [{ "price": 2.5, "quantity": 2 }],
            }),
            serde_json::json!({
                "id": "o-2", "customerPhone": "+911234567890", "status": "Pending",
                "createdAt": 150,
                "items": [{ "price": 4.0, "quantity": 1 }],
            }),
            serde_json::json!({
                "id": "o-3", "customerPhone": "+911234567890", "status": "Done",
                "createdAt": 200,
                "items": [{ "price": 1.0, "quantity": 3 }],
            }),
            serde_json::json!({
                "id": "o-4", "customerPhone": "+910000000000", "status": "Done",
                "createdAt": 300,
                "items": [],
            }),
        ];
        let history = history_for_phone(&records, "+911234567890");
        let ids: Vec<&str> = history
            .iter()
            .map(|r| r.get("id").and_then(Value::as_str).unwrap_or_default())
            .collect();
        assert_eq!(ids, vec!["o-3", "o-1"]);
        assert_eq!(history[0].get("total").and_then(Value::as_f64), Some(3.0));
        assert_eq!(history[1].get("total").and_then(Value::as_f64), Some(5.0));
    }
}
