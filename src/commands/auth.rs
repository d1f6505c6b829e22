use serde_json::Value;
use tauri::Emitter;
use zeroize::Zeroizing;

use crate::auth;

/// Extract email + password from the sign-in payload. The password is
/// moved straight into a zeroizing buffer.
fn parse_credentials_payload(arg0: Option<Value>) -> Result<(String, Zeroizing<String>), String> {
    let payload = arg0.ok_or("Missing sign-in payload")?;
    let obj = payload
        .as_object()
        .ok_or("Invalid sign-in payload: expected an object")?;

    let email = obj
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("Email is required")?
        .to_string();
    let password = obj
        .get("password")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| Zeroizing::new(s.to_string()))
        .ok_or("Password is required")?;

    Ok((email, password))
}

fn parse_email_payload(arg0: Option<Value>) -> Result<String, String> {
    let payload = match arg0 {
        Some(Value::String(email)) => serde_json::json!({ "email": email }),
        Some(v) => v,
        None => serde_json::json!({}),
    };
    payload
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or("Email is required".into())
}

#[tauri::command]
pub async fn auth_sign_in(
    arg0: Option<Value>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let (email, password) = parse_credentials_payload(arg0)?;
    let result = auth::sign_in(&auth_state, &email, password).await?;
    let _ = app.emit("auth_state_changed", serde_json::json!({ "signedIn": true }));
    Ok(result)
}

#[tauri::command]
pub async fn auth_sign_out(
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<(), String> {
    auth::sign_out(&auth_state);
    let _ = app.emit(
        "auth_state_changed",
        serde_json::json!({ "signedIn": false }),
    );
    Ok(())
}

#[tauri::command]
pub async fn auth_get_current_user(
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    Ok(auth::current_user_json(&auth_state))
}

/// The login screen's "let AI help you remember" flow. A stub by design:
/// nothing leaves the machine, the delay just sells the effect.
#[tauri::command]
pub async fn auth_password_hint(arg0: Option<Value>) -> Result<Value, String> {
    let email = parse_email_payload(arg0)?;
    tokio::time::sleep(std::time::Duration::from_millis(
        auth::PASSWORD_HINT_DELAY_MS,
    ))
    .await;
    Ok(serde_json::json!({
        "email": email,
        "hint": auth::PASSWORD_HINT_TEXT,
    }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn credentials_payload_requires_both_fields() {
        let ok = parse_credentials_payload(Some(serde_json::json!({
            "email": " owner@allrounder.restaurant ",
            "password": "hunter2",
        })))
        .expect("valid payload");
        assert_eq!(ok.0, "owner@allrounder.restaurant");

        assert!(parse_credentials_payload(None).is_err());
        assert!(
            parse_credentials_payload(Some(serde_json::json!({ "email": "a@b.c" }))).is_err()
        );
        assert!(parse_credentials_payload(Some(serde_json::json!({
            "email": "", "password": "x"
        })))
        .is_err());
    }

    #[test]
    fn email_payload_accepts_string_and_object() {
        assert_eq!(
            parse_email_payload(Some(serde_json::json!("a@b.c"))).as_deref(),
            Ok("a@b.c")
        );
        assert_eq!(
            parse_email_payload(Some(serde_json::json!({ "email": "a@b.c" }))).as_deref(),
            Ok("a@b.c")
        );
        assert!(parse_email_payload(None).is_err());
    }
}
