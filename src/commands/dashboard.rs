use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

use crate::payload_arg0_as_string;

/// The admin pages reachable from the dashboard sidebar. Exactly one is
/// active at a time; switching pages is what tears one live subscription
/// down and brings the next one up on the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPage {
    PersonalInformation,
    EmployeesManagement,
    RestaurantMenu,
    TableManagement,
    QrCodeGenerator,
    LiveInventory,
    OpeningHours,
    LoginAndPassword,
    BillingAndAnalytics,
}

impl AdminPage {
    pub fn parse(raw: &str) -> Result<Self, String> {
        serde_json::from_value(Value::String(raw.trim().to_string()))
            .map_err(|_| format!("Unknown dashboard page: {raw}"))
    }

    pub fn id(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Pages that render a placeholder instead of a real screen.
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            AdminPage::PersonalInformation | AdminPage::OpeningHours | AdminPage::LoginAndPassword
        )
    }
}

/// The owner profile shown in the sidebar. Display-only state scoped to
/// the shell's lifetime; nothing here is persisted.
struct DashboardShell {
    active_page: AdminPage,
    manager_name: String,
    manager_photo: String,
}

impl Default for DashboardShell {
    fn default() -> Self {
        Self {
            active_page: AdminPage::EmployeesManagement,
            manager_name: "Saul Goodmate".to_string(),
            manager_photo: "https://i.pravatar.cc/150?u=saulgoodman".to_string(),
        }
    }
}

/// Tauri managed state for the dashboard shell.
#[derive(Default)]
pub struct DashboardState {
    shell: Mutex<DashboardShell>,
}

impl DashboardState {
    fn to_json(&self) -> Value {
        let shell = self.shell.lock().unwrap();
        serde_json::json!({
            "activePage": shell.active_page.id(),
            "isPlaceholder": shell.active_page.is_placeholder(),
            "managerName": shell.manager_name,
            "managerPhoto": shell.manager_photo,
        })
    }

    fn set_active_page(&self, page: AdminPage) {
        self.shell.lock().unwrap().active_page = page;
    }

    fn set_manager_name(&self, name: &str) {
        self.shell.lock().unwrap().manager_name = name.to_string();
    }

    fn set_manager_photo(&self, photo: &str) {
        self.shell.lock().unwrap().manager_photo = photo.to_string();
    }
}

#[tauri::command]
pub async fn dashboard_get_state(
    state: tauri::State<'_, DashboardState>,
) -> Result<Value, String> {
    Ok(state.to_json())
}

#[tauri::command]
pub async fn dashboard_set_active_page(
    arg0: Option<Value>,
    state: tauri::State<'_, DashboardState>,
) -> Result<Value, String> {
    let raw = payload_arg0_as_string(arg0, &["page", "pageId", "id", "value"])
        .ok_or("Missing page id")?;
    let page = AdminPage::parse(&raw)?;
    state.set_active_page(page);
    Ok(state.to_json())
}

#[tauri::command]
pub async fn dashboard_set_manager_name(
    arg0: Option<Value>,
    state: tauri::State<'_, DashboardState>,
) -> Result<Value, String> {
    let name = payload_arg0_as_string(arg0, &["name", "managerName", "value"])
        .ok_or("Manager name cannot be empty")?;
    state.set_manager_name(&name);
    Ok(state.to_json())
}

#[tauri::command]
pub async fn dashboard_set_manager_photo(
    arg0: Option<Value>,
    state: tauri::State<'_, DashboardState>,
) -> Result<Value, String> {
    let photo = payload_arg0_as_string(arg0, &["photo", "managerPhoto", "url", "value"])
        .ok_or("Manager photo cannot be empty")?;
    state.set_manager_photo(&photo);
    Ok(state.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_ids_round_trip() {
        for id in [
            "personal_information",
            "employees_management",
            "restaurant_menu",
            "table_management",
            "qr_code_generator",
            "live_inventory",
            "opening_hours",
            "login_and_password",
            "billing_and_analytics",
        ] {
            let page = AdminPage::parse(id).expect("known page id");
            assert_eq!(page.id(), id);
        }
        assert!(AdminPage::parse("settings").is_err());
    }

    #[test]
    fn placeholder_pages_are_flagged() {
        assert!(AdminPage::PersonalInformation.is_placeholder());
        assert!(AdminPage::OpeningHours.is_placeholder());
        assert!(AdminPage::LoginAndPassword.is_placeholder());
        assert!(!AdminPage::EmployeesManagement.is_placeholder());
        assert!(!AdminPage::BillingAndAnalytics.is_placeholder());
    }

    #[test]
    fn shell_defaults_and_updates() {
        let state = DashboardState::default();
        let json = state.to_json();
        assert_eq!(json["activePage"].as_str(), Some("employees_management"));
        assert_eq!(json["managerName"].as_str(), Some("Saul Goodmate"));

        state.set_active_page(AdminPage::BillingAndAnalytics);
        state.set_manager_name("Kim Wexler");
        let json = state.to_json();
        assert_eq!(json["activePage"].as_str(), Some("billing_and_analytics"));
        assert_eq!(json["isPlaceholder"].as_bool(), Some(false));
        assert_eq!(json["managerName"].as_str(), Some("Kim Wexler"));
    }
}
