//! Owner authentication gate.
//!
//! Sign-in is delegated to the hosted identity service; this module only
//! decides whether the identity that comes back is allowed in. Exactly one
//! identity is: the restaurant owner's UID, hard-coded below. Anyone else
//! who authenticates successfully is signed out on the spot and never sees
//! the dashboard. The session lives in memory only.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::api;

/// The single UID allowed to access the owner dashboard.
pub const ALLOWED_OWNER_UID: &str = "SgGYmF3NLPbRDrVWFbtewGjchm33";

/// Fixed copy returned by the login screen's password-hint helper. The
/// hint flow is a stub: it is not wired to any backend call.
pub const PASSWORD_HINT_TEXT: &str =
    "Try recalling the street you grew up on combined with your birth year.";

/// Simulated latency of the password-hint helper.
pub const PASSWORD_HINT_DELAY_MS: u64 = 1_500;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The signed-in owner.
#[derive(Clone)]
pub struct OwnerSession {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub signed_in_at: DateTime<Utc>,
}

impl OwnerSession {
    /// Convert to the JSON shape the frontend expects. The id token stays
    /// inside the Rust layer.
    fn to_user_json(&self) -> Value {
        serde_json::json!({
            "uid": self.uid,
            "email": self.email,
            "signedInAt": self.signed_in_at.to_rfc3339(),
        })
    }
}

/// Tauri managed state for the owner session.
pub struct AuthState {
    session: Mutex<Option<OwnerSession>>,
}

impl AuthState {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Apply the owner gate to an identity payload returned by the hosted auth
/// service. A matching UID becomes the current session; a mismatch clears
/// whatever session existed and fails, so no dashboard state is ever
/// derived from it.
pub fn complete_sign_in(auth: &AuthState, identity: &Value) -> Result<Value, String> {
    let uid = identity
        .get("localId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("Identity service returned no UID")?;

    if uid != ALLOWED_OWNER_UID {
        warn!("unauthorized access attempt: UID mismatch");
        sign_out(auth);
        return Err("Access Denied: you are not the authorized owner.".into());
    }

    let session = OwnerSession {
        uid: uid.to_string(),
        email: identity
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        id_token: identity
            .get("idToken")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        signed_in_at: Utc::now(),
    };

    let user_json = session.to_user_json();
    {
        let mut current = auth.session.lock().unwrap();
        *current = Some(session);
    }
    info!("owner sign-in successful");

    Ok(serde_json::json!({
        "success": true,
        "user": user_json,
    }))
}

/// Sign the owner in against the hosted identity service and apply the
/// gate. The password is wiped from memory when this function returns.
pub async fn sign_in(
    auth: &AuthState,
    email: &str,
    password: Zeroizing<String>,
) -> Result<Value, String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".into());
    }
    if password.is_empty() {
        return Err("Password is required".into());
    }

    let identity = api::sign_in_with_password(email, &password)
        .await
        .map_err(String::from)?;
    complete_sign_in(auth, &identity)
}

/// Invalidate the current session.
pub fn sign_out(auth: &AuthState) {
    let mut current = auth.session.lock().unwrap();
    if current.take().is_some() {
        info!("owner signed out");
    }
}

/// Current owner as JSON, or null when nobody is signed in.
pub fn current_user_json(auth: &AuthState) -> Value {
    match auth.session.lock().unwrap().as_ref() {
        Some(s) => s.to_user_json(),
        None => Value::Null,
    }
}

/// Whether the allowed owner is currently signed in.
pub fn is_authorized(auth: &AuthState) -> bool {
    auth.session
        .lock()
        .unwrap()
        .as_ref()
        .map(|s| s.uid == ALLOWED_OWNER_UID)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(uid: &str) -> Value {
        serde_json::json!({
            "localId": uid,
            "email": "owner@allrounder.restaurant",
            "idToken": "token-abc",
        })
    }

    #[test]
    fn matching_uid_creates_session() {
        let auth = AuthState::new();
        let result =
            complete_sign_in(&auth, &identity(ALLOWED_OWNER_UID)).expect("owner should pass gate");
        assert_eq!(result.get("success").and_then(Value::as_bool), Some(true));
        assert!(is_authorized(&auth));
        assert_eq!(
            current_user_json(&auth)
                .get("uid")
                .and_then(Value::as_str)
                .unwrap_or_default(),
            ALLOWED_OWNER_UID
        );
    }

    #[test]
    fn mismatched_uid_is_signed_out_immediately() {
        let auth = AuthState::new();
        // Someone else was signed in before; the gate must clear them too.
        complete_sign_in(&auth, &identity(ALLOWED_OWNER_UID)).expect("owner should pass gate");

        let err = complete_sign_in(&auth, &identity("intruder-uid"))
            .expect_err("mismatched UID must be rejected");
        assert!(err.contains("Access Denied"), "unexpected error: {err}");
        assert!(!is_authorized(&auth));
        assert!(current_user_json(&auth).is_null());
    }

    #[test]
    fn identity_without_uid_is_rejected() {
        let auth = AuthState::new();
        let err = complete_sign_in(&auth, &serde_json::json!({ "email": "x@y.z" }))
            .expect_err("missing UID must be rejected");
        assert!(err.contains("no UID"), "unexpected error: {err}");
        assert!(!is_authorized(&auth));
    }
}
