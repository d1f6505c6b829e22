#![recursion_limit = "256"]

//! Allrounder Restaurant - Tauri v2 Backend
//!
//! This module registers all IPC command handlers that the dashboard
//! frontend calls via `@tauri-apps/api/core::invoke()`. The Rust layer
//! owns every backend conversation: the hosted identity service, the
//! realtime tree and document collections, and the generative-text
//! endpoint. Live data reaches the frontend as `*_snapshot` events.

use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod auth;
mod billing;
mod commands;
mod diagnostics;
mod insights;
mod live;
mod orders;
mod qrcode;
mod session;
mod storage;

/// Directory of pre-rendered table QR images, overridable for dev setups.
const QR_DIR_ENV: &str = "ALLROUNDER_QR_DIR";

// ---------------------------------------------------------------------------
// JSON field helpers shared across command modules
// ---------------------------------------------------------------------------

pub(crate) fn value_str(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

pub(crate) fn value_f64(v: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(n) = v.get(*key).and_then(|x| x.as_f64()) {
            return Some(n);
        }
    }
    None
}

pub(crate) fn value_i64(v: &serde_json::Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        if let Some(n) = v.get(*key).and_then(|x| x.as_i64()) {
            return Some(n);
        }
    }
    None
}

/// Pull a non-empty string out of an `arg0` payload, whether it arrives
/// bare (`"t-3"`) or wrapped (`{"id": "t-3"}`).
pub(crate) fn payload_arg0_as_string(
    arg0: Option<serde_json::Value>,
    keys: &[&str],
) -> Option<String> {
    match arg0? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        serde_json::Value::Object(map) => keys
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Split an edit payload into the record id and the fields to write. The
/// id addresses the record and is never part of the written body. Accepts
/// both `{"id": ..., field: ...}` and the (`id`, `{fields}`) pair.
pub(crate) fn split_id_from_payload(
    arg0: Option<serde_json::Value>,
    arg1: Option<serde_json::Value>,
) -> Result<(String, serde_json::Value), String> {
    let merged = match (arg0, arg1) {
        (Some(serde_json::Value::String(id)), Some(serde_json::Value::Object(mut fields))) => {
            fields.insert("id".to_string(), serde_json::Value::String(id));
            serde_json::Value::Object(fields)
        }
        (Some(v), _) => v,
        (None, Some(v)) => v,
        _ => serde_json::json!({}),
    };

    let mut fields = match merged {
        serde_json::Value::Object(map) => map,
        _ => return Err("Invalid update payload: expected an object".into()),
    };
    let id = match fields.remove("id") {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err("Missing record id".into()),
    };
    if fields.is_empty() {
        return Err("Update payload has no fields to write".into());
    }
    Ok((id, serde_json::Value::Object(fields)))
}

// ---------------------------------------------------------------------------
// App entry point
// ---------------------------------------------------------------------------

pub fn run() {
    // Initialize structured logging (console + rolling file)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,allrounder_dashboard_lib=debug"));

    // Prune old log files before setting up the appender
    diagnostics::prune_old_logs();

    let log_dir = diagnostics::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, diagnostics::LOG_FILE_PREFIX);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the app — dropping it
    // flushes logs. We leak it intentionally since the app runs until
    // process exit.
    std::mem::forget(_guard);

    info!(
        "Starting Allrounder Dashboard v{}",
        env!("CARGO_PKG_VERSION")
    );

    tauri::Builder::default()
        .setup(|app| {
            use tauri::Manager;

            // Owner session gate
            app.manage(auth::AuthState::new());

            // Live subscription registry
            app.manage(live::LiveState::default());

            // Dashboard shell (active page + profile display state)
            app.manage(commands::dashboard::DashboardState::default());

            // Customer session (external session provider, env-supplied)
            // and its transient cart
            app.manage(session::CustomerSession::from_env());
            app.manage(session::CartState::default());

            // QR inventory location
            let qr_dir = std::env::var(QR_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    std::env::current_dir()
                        .unwrap_or_else(|_| PathBuf::from("."))
                        .join("qr-codes")
                });
            app.manage(qrcode::QrState::new(qr_dir));

            if storage::is_configured() {
                info!("Backend credentials found");
            } else {
                info!("Backend not configured; onboarding required");
            }

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // App lifecycle
            commands::runtime::app_get_version,
            commands::runtime::app_get_about,
            // Auth
            commands::auth::auth_sign_in,
            commands::auth::auth_sign_out,
            commands::auth::auth_get_current_user,
            commands::auth::auth_password_hint,
            // Settings
            commands::settings::settings_is_configured,
            commands::settings::settings_get_backend_config,
            commands::settings::settings_update_backend_credentials,
            commands::settings::settings_test_connection,
            commands::settings::settings_factory_reset,
            // Dashboard shell
            commands::dashboard::dashboard_get_state,
            commands::dashboard::dashboard_set_active_page,
            commands::dashboard::dashboard_set_manager_name,
            commands::dashboard::dashboard_set_manager_photo,
            // Employees
            commands::employees::employees_subscribe,
            commands::employees::employees_unsubscribe,
            commands::employees::employee_add,
            commands::employees::employee_update,
            commands::employees::employee_delete,
            // Menu
            commands::menu::menu_subscribe,
            commands::menu::menu_unsubscribe,
            commands::menu::menu_item_add,
            commands::menu::menu_item_update,
            commands::menu::menu_item_set_availability,
            commands::menu::menu_item_delete,
            // Inventory
            commands::inventory::inventory_subscribe,
            commands::inventory::inventory_unsubscribe,
            commands::inventory::inventory_item_add,
            commands::inventory::inventory_item_update,
            commands::inventory::inventory_item_delete,
            // Tables
            commands::tables::tables_subscribe,
            commands::tables::tables_unsubscribe,
            commands::tables::table_add,
            commands::tables::table_update,
            commands::tables::table_delete,
            // Billing & analytics
            commands::billing::billing_orders_subscribe,
            commands::billing::billing_orders_unsubscribe,
            commands::billing::billing_tables_subscribe,
            commands::billing::billing_tables_unsubscribe,
            commands::billing::billing_income_data,
            commands::billing::billing_ai_summary,
            commands::billing::bill_finalize,
            commands::billing::order_update_status,
            // Customer dashboard
            commands::customer::customer_get_session,
            commands::customer::customer_menu_subscribe,
            commands::customer::customer_menu_unsubscribe,
            commands::customer::cart_add_item,
            commands::customer::cart_set_quantity,
            commands::customer::cart_get,
            commands::customer::customer_place_order,
            commands::customer::customer_active_order_subscribe,
            commands::customer::customer_active_order_unsubscribe,
            commands::customer::customer_order_history,
            // QR code generator
            commands::qrcode::qr_generate,
            commands::qrcode::qr_cancel,
            commands::qrcode::qr_get_inventory,
            commands::qrcode::qr_print,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Allrounder Dashboard");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_id_from_payload_strips_the_id() {
        let (id, body) = split_id_from_payload(
            Some(serde_json::json!({ "id": "e-1", "role": "Sous Chef" })),
            None,
        )
        .expect("valid payload");
        assert_eq!(id, "e-1");
        assert!(body.get("id").is_none());
        assert_eq!(body["role"].as_str(), Some("Sous Chef"));
    }

    #[test]
    fn split_id_from_payload_rejects_empty_updates() {
        assert!(split_id_from_payload(Some(serde_json::json!({ "id": "e-1" })), None).is_err());
        assert!(split_id_from_payload(Some(serde_json::json!({ "role": "Chef" })), None).is_err());
        assert!(split_id_from_payload(None, None).is_err());
    }

    #[test]
    fn payload_arg0_as_string_handles_bare_and_wrapped_forms() {
        assert_eq!(
            payload_arg0_as_string(Some(serde_json::json!(" t-3 ")), &["id"]).as_deref(),
            Some("t-3")
        );
        assert_eq!(
            payload_arg0_as_string(Some(serde_json::json!({ "tableId": "t-4" })), &["id", "tableId"])
                .as_deref(),
            Some("t-4")
        );
        assert!(payload_arg0_as_string(Some(serde_json::json!("  ")), &["id"]).is_none());
        assert!(payload_arg0_as_string(Some(serde_json::json!(7)), &["id"]).is_none());
    }
}
