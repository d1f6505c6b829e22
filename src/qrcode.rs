//! Table QR code generator.
//!
//! Nothing is generated at runtime: the codes are a fixed inventory of 20
//! pre-rendered images (`T1.png` … `T20.png`) shipped with the app. What
//! this module owns is the sequenced reveal — cards appear one at a time
//! on a fixed cadence until the requested count is visible, after which
//! the print action becomes available. Purely local; the backend is never
//! involved.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::Emitter;
use tokio::sync::watch;
use tracing::{info, warn};

/// Size of the pre-rendered inventory.
pub const MAX_TABLE_COUNT: usize = 20;

/// Delay between consecutive card reveals.
pub const REVEAL_INTERVAL_MS: u64 = 300;

const QR_FILE_PREFIX: &str = "T";

/// One revealable card from the inventory.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCard {
    pub number: usize,
    pub path: String,
    pub width: u32,
    pub height: u32,
}

struct RevealHandle {
    cancel_tx: watch::Sender<bool>,
}

/// Tauri managed state for the QR generator.
pub struct QrState {
    inventory_dir: PathBuf,
    reveal: Mutex<Option<RevealHandle>>,
    finished: Arc<AtomicBool>,
}

impl QrState {
    pub fn new(inventory_dir: PathBuf) -> Self {
        Self {
            inventory_dir,
            reveal: Mutex::new(None),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn inventory_dir(&self) -> &Path {
        &self.inventory_dir
    }

    /// Whether the last reveal ran to completion (gates the print action).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Scan the inventory directory for `T1.png`, `T2.png`, … in order,
/// stopping at the first file that is missing or does not decode as an
/// image. The reveal can only ever show this contiguous prefix.
pub fn scan_inventory(dir: &Path) -> Vec<QrCard> {
    let mut cards = Vec::new();
    for number in 1..=MAX_TABLE_COUNT {
        let path = dir.join(format!("{QR_FILE_PREFIX}{number}.png"));
        match image::image_dimensions(&path) {
            Ok((width, height)) => cards.push(QrCard {
                number,
                path: path.to_string_lossy().to_string(),
                width,
                height,
            }),
            Err(error) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %error, "unreadable QR image, truncating inventory");
                }
                break;
            }
        }
    }
    cards
}

/// Validate a requested table count against the range and the scanned
/// inventory. Rejections happen before anything is revealed.
pub fn validate_count(raw: &str, inventory_len: usize) -> Result<usize, String> {
    let count: usize = raw
        .trim()
        .parse()
        .map_err(|_| "Please enter a valid number between 1 and 20.".to_string())?;
    if count == 0 || count > MAX_TABLE_COUNT {
        return Err("Please enter a valid number between 1 and 20.".into());
    }
    if count > inventory_len {
        return Err(format!(
            "Only {inventory_len} QR code images are available."
        ));
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Sequenced reveal
// ---------------------------------------------------------------------------

/// Start revealing `count` cards, one every [`REVEAL_INTERVAL_MS`].
/// Replaces any reveal already in progress.
pub fn start_reveal(app: tauri::AppHandle, state: &QrState, raw_count: &str) -> Result<Value, String> {
    let inventory = scan_inventory(state.inventory_dir());
    let count = validate_count(raw_count, inventory.len())?;

    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    {
        let mut guard = state.reveal.lock().unwrap();
        if let Some(existing) = guard.take() {
            let _ = existing.cancel_tx.send(true);
        }
        *guard = Some(RevealHandle { cancel_tx });
    }
    state.finished.store(false, Ordering::SeqCst);

    let finished = state.finished.clone();
    let cadence = Duration::from_millis(REVEAL_INTERVAL_MS);
    info!(count, "starting QR reveal");

    tauri::async_runtime::spawn(async move {
        for card in inventory.into_iter().take(count) {
            tokio::select! {
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        info!("QR reveal cancelled");
                        return;
                    }
                }
                _ = tokio::time::sleep(cadence) => {}
            }

            let _ = app.emit(
                "qr_code_revealed",
                serde_json::json!({
                    "number": card.number,
                    "path": card.path,
                    "total": count,
                }),
            );
        }

        finished.store(true, Ordering::SeqCst);
        let _ = app.emit("qr_reveal_finished", serde_json::json!({ "count": count }));
        info!(count, "QR reveal finished");
    });

    Ok(serde_json::json!({
        "success": true,
        "count": count,
        "intervalMs": REVEAL_INTERVAL_MS,
    }))
}

/// Cancel an in-flight reveal (component teardown). Returns whether one
/// was running.
pub fn cancel_reveal(state: &QrState) -> bool {
    state.finished.store(false, Ordering::SeqCst);
    let mut guard = state.reveal.lock().unwrap();
    match guard.take() {
        Some(handle) => {
            let _ = handle.cancel_tx.send(true);
            true
        }
        None => false,
    }
}

/// Hand the print request to the frontend, which owns the print dialog.
/// Only meaningful once a reveal has finished.
pub fn request_print(app: &tauri::AppHandle, state: &QrState) -> Result<Value, String> {
    if !state.is_finished() {
        return Err("No finished QR batch to print".into());
    }
    let _ = app.emit("qr_print_requested", serde_json::json!({}));
    Ok(serde_json::json!({ "success": true }))
}
