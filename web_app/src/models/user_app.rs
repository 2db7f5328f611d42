use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, Default)]
pub enum AccountRole {
    #[default]
    #[serde(rename = "user")]
    #[display("user")]
    User,
    #[serde(rename = "staff")]
    #[display("staff")]
    Staff,
}

impl std::str::FromStr for AccountRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(AccountRole::User),
            "staff" => Ok(AccountRole::Staff),
            other => anyhow::bail!("unknown account role: {other}"),
        }
    }
}

/// Application profile row mirrored from the auth provider
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub account_role: AccountRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.account_role == AccountRole::Staff
    }

    pub fn create_default_from_auth(auth_user: &AuthUser) -> Self {
        let now = Utc::now();
        Self {
            id: auth_user.id,
            email: auth_user.email.to_lowercase(),
            full_name: auth_user.metadata_str("full_name").unwrap_or_default(),
            phone: auth_user.metadata_str("phone").filter(|p| !p.is_empty()),
            account_role: AccountRole::User,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User as returned by the auth provider
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        self.user_metadata
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Profile data sent along the sign up request
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SignUpProfile {
    pub full_name: String,
    pub phone: String,
}
