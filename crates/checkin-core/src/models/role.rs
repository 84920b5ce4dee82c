use serde::{Deserialize, Serialize};

/// Role of the signed-in user, as reported by `GET /auth/user-role`.
///
/// Unknown role strings are kept verbatim and treated as unprivileged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserRole {
    Admin,
    Supervisor,
    #[default]
    Operator,
    Other(String),
}

impl UserRole {
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "admin" => UserRole::Admin,
            "supervisor" => UserRole::Supervisor,
            "operator" => UserRole::Operator,
            _ => UserRole::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Supervisor => "supervisor",
            UserRole::Operator => "operator",
            UserRole::Other(s) => s.as_str(),
        }
    }

    /// Whether station add/toggle/remove controls are offered to this role.
    pub fn can_manage_stations(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Supervisor)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wire shape of the role endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct RoleResponse {
    pub role: String,
}

/// The event being operated and who is operating it. Passed explicitly to
/// every component instead of being read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub event_id: String,
    pub role: UserRole,
}

impl EventContext {
    pub fn new(event_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            event_id: event_id.into(),
            role,
        }
    }
}
