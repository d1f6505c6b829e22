//! Customer session provider and cart.
//!
//! The customer view is a single-session ordering flow. Who is sitting at
//! which table is an external concern (a QR scan landing page, a host
//! stand, eventually a real session service); this module only *consumes*
//! that decision, reading it from the environment with the demo values as
//! defaults. The cart is transient state owned by the Rust layer — it is
//! never persisted and is cleared when the live order feed echoes an
//! active order back.

use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::warn;

use crate::value_f64;

pub const ENV_TABLE: &str = "ALLROUNDER_TABLE";
pub const ENV_PHONE: &str = "ALLROUNDER_PHONE";
pub const ENV_CUSTOMER: &str = "ALLROUNDER_CUSTOMER";

const DEFAULT_TABLE_NUMBER: i64 = 5;
const DEFAULT_CUSTOMER_PHONE: &str = "+911234567890";
const DEFAULT_CUSTOMER_NAME: &str = "Tirth Patel";

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The seated customer, as supplied by the session provider.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSession {
    pub table_number: i64,
    pub customer_phone: String,
    pub customer_name: String,
}

impl CustomerSession {
    /// Read the session from the environment, falling back to the demo
    /// identity for any value that is missing or malformed.
    pub fn from_env() -> Self {
        let table_number = match std::env::var(ENV_TABLE) {
            Ok(raw) => raw.trim().parse::<i64>().unwrap_or_else(|_| {
                warn!(raw = %raw, "invalid {ENV_TABLE} value, using default table");
                DEFAULT_TABLE_NUMBER
            }),
            Err(_) => DEFAULT_TABLE_NUMBER,
        };
        let customer_phone = std::env::var(ENV_PHONE)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CUSTOMER_PHONE.to_string());
        let customer_name = std::env::var(ENV_CUSTOMER)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string());

        Self {
            table_number,
            customer_phone,
            customer_name,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// One cart line: a menu item plus how many of it.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

/// Tauri managed state: the session's cart.
#[derive(Default)]
pub struct CartState {
    lines: Mutex<Vec<CartLine>>,
}

impl CartState {
    /// Add a menu item. Adding an item already in the cart bumps its
    /// quantity instead of duplicating the line.
    pub fn add_item(&self, item: &Value) -> Result<Value, String> {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or("Menu item is missing an id")?;
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or("Menu item is missing a name")?;
        let price = value_f64(item, &["price"]).ok_or("Menu item is missing a price")?;
        if price < 0.0 {
            return Err(format!("Invalid price for {name}"));
        }

        let mut lines = self.lines.lock().unwrap();
        match lines.iter_mut().find(|line| line.id == id) {
            Some(line) => line.quantity += 1,
            None => lines.push(CartLine {
                id: id.to_string(),
                name: name.to_string(),
                price,
                quantity: 1,
            }),
        }
        Ok(snapshot_of(&lines))
    }

    /// Set a line's quantity; zero or less removes the line. Unknown ids
    /// leave the cart untouched.
    pub fn set_quantity(&self, id: &str, quantity: i64) -> Value {
        let mut lines = self.lines.lock().unwrap();
        if quantity <= 0 {
            lines.retain(|line| line.id != id);
        } else if let Some(line) = lines.iter_mut().find(|line| line.id == id) {
            line.quantity = quantity;
        }
        snapshot_of(&lines)
    }

    /// Current cart lines, for building an order record.
    pub fn lines_json(&self) -> Vec<Value> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|line| serde_json::to_value(line).unwrap_or(Value::Null))
            .collect()
    }

    pub fn snapshot(&self) -> Value {
        snapshot_of(&self.lines.lock().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }

    /// Empty the cart (an active order arrived on the live feed).
    pub fn clear(&self) {
        self.lines.lock().unwrap().clear();
    }
}

fn snapshot_of(lines: &[CartLine]) -> Value {
    let total: f64 = lines
        .iter()
        .map(|line| line.price * line.quantity as f64)
        .sum();
    let count: i64 = lines.iter().map(|line| line.quantity).sum();
    serde_json::json!({
        "items": lines,
        "total": total,
        "count": count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_session_env() {
        std::env::remove_var(ENV_TABLE);
        std::env::remove_var(ENV_PHONE);
        std::env::remove_var(ENV_CUSTOMER);
    }

    #[test]
    #[serial]
    fn session_defaults_to_the_demo_identity() {
        clear_session_env();
        let session = CustomerSession::from_env();
        assert_eq!(session.table_number, 5);
        assert_eq!(session.customer_phone, "+911234567890");
        assert_eq!(session.customer_name, "Tirth Patel");
    }

    #[test]
    #[serial]
    fn session_reads_environment_overrides() {
        clear_session_env();
        std::env::set_var(ENV_TABLE, "12");
        std::env::set_var(ENV_PHONE, "+301234567");
        std::env::set_var(ENV_CUSTOMER, "Nikos");
        let session = CustomerSession::from_env();
        assert_eq!(session.table_number, 12);
        assert_eq!(session.customer_phone, "+301234567");
        assert_eq!(session.customer_name, "Nikos");
        clear_session_env();
    }

    #[test]
    #[serial]
    fn malformed_table_number_falls_back_to_default() {
        clear_session_env();
        std::env::set_var(ENV_TABLE, "table five");
        let session = CustomerSession::from_env();
        assert_eq!(session.table_number, 5);
        clear_session_env();
    }

    fn menu_item(id: &str, name: &str, price: f64) -> Value {
        serde_json::json!({ "id": id, "name": name, "price": price })
    }

    #[test]
    fn adding_the_same_item_twice_bumps_quantity() {
        let cart = CartState::default();
        cart.add_item(&menu_item("m-1", "Paneer Tikka", 7.5))
            .expect("valid item");
        let snap = cart
            .add_item(&menu_item("m-1", "Paneer Tikka", 7.5))
            .expect("valid item");
        assert_eq!(snap["items"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(snap["items"][0]["quantity"].as_i64(), Some(2));
        assert_eq!(snap["total"].as_f64(), Some(15.0));
        assert_eq!(snap["count"].as_i64(), Some(2));
    }

    #[test]
    fn zero_quantity_removes_the_line() {
        let cart = CartState::default();
        cart.add_item(&menu_item("m-1", "Dal", 4.0)).expect("valid");
        cart.add_item(&menu_item("m-2", "Naan", 2.0)).expect("valid");
        let snap = cart.set_quantity("m-1", 0);
        assert_eq!(snap["items"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(snap["items"][0]["id"].as_str(), Some("m-2"));

        // Unknown id is a no-op, not an error.
        let snap = cart.set_quantity("m-9", 3);
        assert_eq!(snap["count"].as_i64(), Some(1));
    }

    #[test]
    fn invalid_items_are_rejected() {
        let cart = CartState::default();
        assert!(cart.add_item(&serde_json::json!({ "name": "x" })).is_err());
        assert!(cart
            .add_item(&serde_json::json!({ "id": "m-1", "name": "x" }))
            .is_err());
        assert!(cart
            .add_item(&serde_json::json!({ "id": "m-1", "name": "x", "price": -2.0 }))
            .is_err());
        assert!(cart.is_empty());
    }
}
