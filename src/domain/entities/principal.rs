//! Verified caller identity.

use serde::Serialize;

/// Claims extracted from a successfully verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub email: Option<String>,
}

/// Role stored on a user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Role {
    Admin,
    Other(String),
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        if raw == "admin" {
            Role::Admin
        } else {
            Role::Other(raw)
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => "admin".to_string(),
            Role::Other(raw) => raw,
        }
    }
}

/// An authenticated caller whose role has been loaded from the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: String,
    pub email: Option<String>,
    pub role: Role,
}

impl Principal {
    pub fn new(token: VerifiedToken, role: Role) -> Self {
        Self {
            subject: token.subject,
            email: token.email,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
