//! User API: current account information.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::Transport;

/// The authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    #[serde(default)]
    pub user_id: String,
    /// Account email, if set.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name, if set.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the account is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Creation timestamp (ISO-8601 string).
    #[serde(default)]
    pub created_at: String,
}

const fn default_true() -> bool {
    true
}

/// User API namespace.
#[derive(Debug, Clone, Copy)]
pub struct UserApi<'a> {
    http: &'a Transport,
}

impl<'a> UserApi<'a> {
    pub(crate) const fn new(http: &'a Transport) -> Self {
        Self { http }
    }

    /// Returns the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn get(&self) -> Result<User> {
        self.http.get("/api/user", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_from_empty_object_defaults() {
        let user: User = serde_json::from_value(json!({})).unwrap();
        assert_eq!(user.user_id, "");
        assert!(user.email.is_none());
        assert!(user.is_active);
    }
}
