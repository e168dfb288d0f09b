use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Principal resolved from a verified bearer token
///
/// The core trusts this value verbatim; ownership checks use `principal_id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Raw `sub` claim
    pub sub: String,
    /// Numeric account id, `None` when `sub` is not a positive integer
    pub principal_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Privileged principals are eligible as incident handlers
    pub is_privileged: bool,
}

/// Profile embedded in access tokens by the account service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenProfile {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Issued as 0/1 by the account service; booleans are accepted too
    #[serde(default)]
    pub is_admin: serde_json::Value,
}

impl TokenProfile {
    pub fn is_admin(&self) -> bool {
        match &self.is_admin {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_i64() == Some(1),
            _ => false,
        }
    }
}
