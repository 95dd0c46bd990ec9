use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Signed-in administrator, as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminProfile {
    #[serde(default, alias = "_id")]
    pub id: Option<Value>,

    #[serde(default, alias = "fullName", alias = "full_name")]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    /// Anything else the backend sends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdminProfile {
    /// Whether the profile carries the admin role (case-insensitive).
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .map(|r| r.eq_ignore_ascii_case("admin"))
            .unwrap_or(false)
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Admin")
    }
}
