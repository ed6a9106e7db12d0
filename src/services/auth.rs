use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::backend::{RestClient, TableQuery};
use crate::error::AppResult;

use super::now_iso;

/// The authenticated identity, as reported by the backend auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Driver,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Driver => "driver",
        }
    }
}

/// Row in the `users` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUserProfile {
    pub id: String,
    pub phone: String,
    pub role: Role,
    pub full_name: String,
    pub status: String,
}

impl NewUserProfile {
    pub fn active(id: String, phone: String, role: Role, full_name: String) -> Self {
        Self {
            id,
            phone,
            role,
            full_name,
            status: "active".to_string(),
        }
    }
}

/// Phone/OTP authentication plus the user-profile table.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Requests a one-time code for the phone number.
    async fn sign_in_with_phone(&self, phone: &str) -> AppResult<()>;

    /// Exchanges the one-time code for a session.
    async fn verify_otp(&self, phone: &str, code: &str) -> AppResult<Principal>;

    /// The gate lookup: the current principal, if any.
    async fn current_principal(&self) -> AppResult<Option<Principal>>;

    async fn sign_out(&self) -> AppResult<()>;

    async fn profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    async fn create_profile(&self, profile: &NewUserProfile) -> AppResult<UserProfile>;

    /// Flips the online flag and stamps last-seen.
    async fn set_online(&self, user_id: &str, online: bool) -> AppResult<UserProfile>;
}

pub struct BackendAuthService {
    rest: Arc<RestClient>,
}

impl BackendAuthService {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl AuthService for BackendAuthService {
    async fn sign_in_with_phone(&self, phone: &str) -> AppResult<()> {
        self.rest.request_otp(phone).await?;
        info!(phone, "one-time code requested");
        Ok(())
    }

    async fn verify_otp(&self, phone: &str, code: &str) -> AppResult<Principal> {
        let principal = self.rest.verify_otp(phone, code).await?;
        info!(user = %principal.id, "session established");
        Ok(principal)
    }

    async fn current_principal(&self) -> AppResult<Option<Principal>> {
        self.rest.current_user().await
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.rest.sign_out();
        info!("session cleared");
        Ok(())
    }

    async fn profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        self.rest
            .select_one("users", TableQuery::new().eq("id", user_id))
            .await
    }

    async fn create_profile(&self, profile: &NewUserProfile) -> AppResult<UserProfile> {
        self.rest.insert("users", profile).await
    }

    async fn set_online(&self, user_id: &str, online: bool) -> AppResult<UserProfile> {
        self.rest
            .update(
                "users",
                TableQuery::new().eq("id", user_id),
                &json!({ "is_online": online, "last_seen": now_iso() }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::{NewUserProfile, Role, UserProfile};

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Driver).expect("role should serialize"),
            "\"driver\""
        );
        let role: Role =
            serde_json::from_str("\"customer\"").expect("role should deserialize");
        assert_eq!(role, Role::Customer);
    }

    #[test]
    fn profile_tolerates_missing_optional_columns() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"id":"u-1","role":"driver"}"#,
        )
        .expect("profile should deserialize");
        assert_eq!(profile.role, Role::Driver);
        assert!(!profile.is_online);
        assert!(profile.last_seen.is_none());
    }

    #[test]
    fn new_profile_defaults_to_active_status() {
        let profile = NewUserProfile::active(
            "u-1".to_string(),
            "+15550100".to_string(),
            Role::Customer,
            String::new(),
        );
        assert_eq!(profile.status, "active");
    }
}
