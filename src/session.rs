//! Authentication state passed explicitly to every operation that needs a user.
//!
//! A [`SessionContext`] starts anonymous, is established at sign-in with the
//! identity the backend's auth service returned, and is cleared at sign-out.

use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Third-party identity providers offered at sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            other => Err(format!("unsupported provider: {other}")),
        }
    }
}

/// Provider-supplied profile hints, used only when a profile is first created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// The authenticated user as reported by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub provider: Option<Provider>,
    pub metadata: IdentityMetadata,
}

impl Identity {
    pub fn new(user_id: &str, email: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
            provider: None,
            metadata: IdentityMetadata::default(),
        }
    }

    /// Parse the user object returned by `GET /auth/v1/user`
    pub fn from_auth_user(user: &Value) -> Result<Self, BackendError> {
        let user_id = user
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::Decode("auth user has no id".to_string()))?;

        let text = |section: &str, key: &str| {
            user.get(section)
                .and_then(|s| s.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            user_id: user_id.to_string(),
            email: user
                .get("email")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            provider: text("app_metadata", "provider").and_then(|p| p.parse().ok()),
            metadata: IdentityMetadata {
                full_name: text("user_metadata", "full_name"),
                avatar_url: text("user_metadata", "avatar_url"),
            },
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    identity: Option<Identity>,
    access_token: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity, access_token: Option<String>) -> Self {
        let mut session = Self::anonymous();
        session.sign_in(identity, access_token);
        session
    }

    pub fn sign_in(&mut self, identity: Identity, access_token: Option<String>) {
        self.identity = Some(identity);
        self.access_token = access_token;
    }

    pub fn sign_out(&mut self) {
        self.identity = None;
        self.access_token = None;
    }

    pub fn user(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_auth_user_with_metadata() {
        let user = json!({
            "id": "9f1c",
            "email": "ada@example.com",
            "app_metadata": { "provider": "google" },
            "user_metadata": { "full_name": "Ada Lovelace", "avatar_url": "" }
        });

        let identity = Identity::from_auth_user(&user).unwrap();
        assert_eq!(identity.user_id, "9f1c");
        assert_eq!(identity.provider, Some(Provider::Google));
        assert_eq!(identity.metadata.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(identity.metadata.avatar_url, None);
    }

    #[test]
    fn auth_user_without_id_is_rejected() {
        let err = Identity::from_auth_user(&json!({ "email": "x@y.z" })).unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn sign_out_clears_identity_and_token() {
        let mut session =
            SessionContext::signed_in(Identity::new("u1", "u1@example.com"), Some("tok".into()));
        assert!(session.is_authenticated());
        assert_eq!(session.access_token(), Some("tok"));

        session.sign_out();
        assert!(!session.is_authenticated());
        assert_eq!(session.access_token(), None);
    }
}
