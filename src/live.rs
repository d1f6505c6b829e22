//! Live subscription engine.
//!
//! Every list page owns exactly one standing subscription to a backend
//! resource. A subscription is a background task that polls the resource
//! and, whenever the observed snapshot differs from the previous one,
//! emits an event carrying the FULL current record list — subscribers
//! replace their local state wholesale, there is no incremental diffing.
//!
//! Subscriptions are keyed; starting one under a key that is already
//! active cancels and replaces the old task, and unsubscribing (page
//! teardown) releases the handle. Cancellation uses a watch channel so an
//! in-flight fetch finishes quietly instead of being ripped out.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::Emitter;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api;

/// Default poll cadence for live subscriptions.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Floor for caller-supplied cadences.
pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;

/// What a subscription polls.
#[derive(Clone)]
pub enum Source {
    /// A realtime-tree path (`users`, `inventory`, `tables`, `menuItems`).
    Tree(&'static str),
    /// A document collection (`orders`, `billing`).
    Collection(&'static str),
}

impl Source {
    async fn fetch(&self) -> Result<Value, api::ApiError> {
        match self {
            Source::Tree(path) => api::fetch_tree(path).await,
            Source::Collection(name) => api::fetch_collection(name).await,
        }
    }
}

/// Optional reshaping applied to the record list before it is emitted
/// (filtering, grouping). `None` emits the list as-is.
pub type Shape = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

struct SubscriptionHandle {
    subscription_id: String,
    cancel_tx: watch::Sender<bool>,
}

/// Tauri managed state: the registry of active subscriptions.
#[derive(Default)]
pub struct LiveState {
    active: Mutex<HashMap<String, SubscriptionHandle>>,
}

impl LiveState {
    /// Register a cancellation handle under `key`, cancelling whatever was
    /// there before. Also used by bespoke watcher loops outside this
    /// module so they share the same teardown path.
    pub fn register(&self, key: &str, subscription_id: String, cancel_tx: watch::Sender<bool>) {
        let mut guard = self.active.lock().unwrap();
        if let Some(existing) = guard.remove(key) {
            let _ = existing.cancel_tx.send(true);
        }
        guard.insert(
            key.to_string(),
            SubscriptionHandle {
                subscription_id,
                cancel_tx,
            },
        );
    }

    /// Cancel and remove the subscription under `key`. Returns whether one
    /// was active.
    pub fn cancel(&self, key: &str) -> bool {
        let mut guard = self.active.lock().unwrap();
        match guard.remove(key) {
            Some(handle) => {
                let _ = handle.cancel_tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Cancel every active subscription (app shutdown).
    pub fn cancel_all(&self) {
        let mut guard = self.active.lock().unwrap();
        for (_, handle) in guard.drain() {
            let _ = handle.cancel_tx.send(true);
        }
    }

    /// Subscription id currently registered under `key`, if any.
    pub fn active_id(&self, key: &str) -> Option<String> {
        self.active
            .lock()
            .unwrap()
            .get(key)
            .map(|h| h.subscription_id.clone())
    }
}

/// Convert a raw tree snapshot (an object keyed by backend-generated id)
/// into a record list with the id injected as `"id"`. `null` and
/// non-object snapshots become the empty list.
pub fn snapshot_to_list(snapshot: &Value) -> Vec<Value> {
    let Some(map) = snapshot.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(id, record)| {
            let mut entry = match record {
                Value::Object(fields) => fields.clone(),
                other => {
                    let mut fields = serde_json::Map::new();
                    fields.insert("value".to_string(), other.clone());
                    fields
                }
            };
            entry.insert("id".to_string(), Value::String(id.clone()));
            Value::Object(entry)
        })
        .collect()
}

/// Start (or replace) the subscription under `key`. Returns the
/// subscription descriptor handed back to the caller.
pub fn subscribe(
    app: tauri::AppHandle,
    state: &LiveState,
    key: &str,
    source: Source,
    shape: Option<Shape>,
) -> Value {
    subscribe_every(app, state, key, source, shape, DEFAULT_POLL_INTERVAL_MS)
}

/// `subscribe` with an explicit poll cadence (floored at
/// [`MIN_POLL_INTERVAL_MS`]).
pub fn subscribe_every(
    app: tauri::AppHandle,
    state: &LiveState,
    key: &str,
    source: Source,
    shape: Option<Shape>,
    interval_ms: u64,
) -> Value {
    let cadence = Duration::from_millis(interval_ms.max(MIN_POLL_INTERVAL_MS));
    let subscription_id = Uuid::new_v4().to_string();
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    state.register(key, subscription_id.clone(), cancel_tx);

    let response = serde_json::json!({
        "success": true,
        "key": key,
        "subscriptionId": subscription_id,
        "intervalMs": cadence.as_millis() as u64,
    });

    let key = key.to_string();
    let event_name = format!("{key}_snapshot");
    let error_event = format!("{key}_error");
    let sub_id_for_task = subscription_id.clone();

    info!(key = %key, interval_ms = cadence.as_millis() as u64, "live subscription started");

    tauri::async_runtime::spawn(async move {
        let mut last_snapshot: Option<Value> = None;

        loop {
            if *cancel_rx.borrow() {
                break;
            }

            match source.fetch().await {
                Ok(snapshot) => {
                    // Full-replace semantics: only re-emit when the backend
                    // snapshot actually changed. The first successful fetch
                    // always emits, even when empty, so the page leaves its
                    // loading state.
                    if last_snapshot.as_ref() != Some(&snapshot) {
                        let records = snapshot_to_list(&snapshot);
                        let count = records.len();
                        let shaped = match &shape {
                            Some(f) => f(records),
                            None => Value::Array(records),
                        };
                        let _ = app.emit(
                            event_name.as_str(),
                            serde_json::json!({
                                "key": key,
                                "subscriptionId": sub_id_for_task,
                                "records": shaped,
                                "count": count,
                            }),
                        );
                        last_snapshot = Some(snapshot);
                    }
                }
                Err(error) => {
                    warn!(key = %key, error = %error, "live subscription poll failed");
                    let _ = app.emit(
                        error_event.as_str(),
                        serde_json::json!({
                            "key": key,
                            "subscriptionId": sub_id_for_task,
                            "error": error.to_string(),
                        }),
                    );
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

        info!(key = %key, "live subscription stopped");
    });

    response
}
