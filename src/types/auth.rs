//! Wire schemas of the Identity v3 `POST /auth/tokens` exchange.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIME_JSON: &str = "application/json";

/// Response header carrying the id of the newly issued token.
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

pub const PASSWORD_METHOD: &str = "password";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub auth: Auth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    pub identity: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub methods: Vec<String>,
    pub password: PasswordMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordMethod {
    pub user: PasswordUser,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordUser {
    pub domain: DomainRef,
    pub name: String,
    pub password: String,
}

/// A domain is referenced either by id or by name, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AuthRequest {
    pub fn password(domain: DomainRef, name: &str, password: &str) -> Self {
        Self {
            auth: Auth {
                identity: Identity {
                    methods: vec![PASSWORD_METHOD.to_string()],
                    password: PasswordMethod {
                        user: PasswordUser {
                            domain,
                            name: name.to_string(),
                            password: password.to_string(),
                        },
                    },
                },
            },
        }
    }
}

impl DomainRef {
    pub fn by_name(name: &str) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
        }
    }

    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            name: None,
        }
    }
}

impl fmt::Debug for PasswordUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordUser")
            .field("domain", &self.domain)
            .field("name", &self.name)
            .field("password", &"******")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: TokenBody,
}

/// Token metadata returned in the response body. Only `expires_at` is
/// consumed, the token id travels in [`SUBJECT_TOKEN_HEADER`].
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBody {
    #[serde(default)]
    pub methods: Vec<String>,

    pub expires_at: DateTime<Utc>,

    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub user: Option<TokenUser>,

    #[serde(default)]
    pub audit_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenUser {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub domain: Option<TokenDomain>,

    #[serde(default)]
    pub password_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenDomain {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,
}
