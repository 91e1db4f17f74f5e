//! Back-office manager model. Managers are seed data, not self-service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    pub id: String,
    pub login: String,
    pub name: String,
    /// Argon2 hash for managers created by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Plaintext fallback for hand-written seed files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerResponse {
    pub id: String,
    pub login: String,
    pub name: String,
}

impl From<&Manager> for ManagerResponse {
    fn from(manager: &Manager) -> Self {
        Self {
            id: manager.id.clone(),
            login: manager.login.clone(),
            name: manager.name.clone(),
        }
    }
}
