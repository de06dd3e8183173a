use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_CATEGORY;

/// A registered service on the dashboard.
/// This is the canonical data model used by the daemon, its store file, and the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Opaque identifier, generated at creation and never changed
    pub id: String,

    /// Display label
    pub name: String,

    /// Target URL as entered; may lack a scheme
    pub url: String,

    /// Grouping label, "General" when not given
    #[serde(default = "default_category")]
    pub category: String,

    /// Icon reference (name or URL), empty when not given
    #[serde(default)]
    pub icon: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Body of a create or update request.
///
/// Every field is optional here so that a missing `name` or `url` is reported
/// as a validation failure by the daemon rather than a deserialization error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ServiceInput {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

/// Result of one live probe against a service. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    #[serde(flatten)]
    pub service: ServiceRecord,

    pub status: ProbeStatus,

    /// HTTP status received when it fell outside the healthy range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Short failure code when no usable response arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub last_checked: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// Generic `{message}` body used for acknowledgements and every error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}
