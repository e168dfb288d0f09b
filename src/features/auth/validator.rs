use super::model::{AuthenticatedUser, TokenProfile};
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Verifies HS256 access tokens issued by the account service
pub struct JwtValidator {
    decoding_key: DecodingKey,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "exp")]
    _exp: u64,
    #[serde(rename = "type")]
    token_type: String,
    #[serde(default)]
    profile: Option<TokenProfile>,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            leeway: config.jwt_leeway.as_secs(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token)
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

        if header.alg != Algorithm::HS256 {
            return Err(AppError::Unauthorized(format!(
                "Unsupported algorithm: {:?}. Only HS256 is allowed",
                header.alg
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        let claims = token_data.claims;

        if claims.token_type != "access" {
            return Err(AppError::Unauthorized(
                "Token is not an access token".to_string(),
            ));
        }

        let principal_id = claims.sub.trim().parse::<i64>().ok().filter(|id| *id > 0);
        let is_privileged = claims.profile.as_ref().is_some_and(|p| p.is_admin());
        let name = claims.profile.and_then(|p| p.name);

        Ok(AuthenticatedUser {
            sub: claims.sub,
            principal_id,
            name,
            is_privileged,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::*;
    use super::*;
    use std::time::Duration;

    fn validator() -> JwtValidator {
        JwtValidator::new(&AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            jwt_leeway: Duration::from_secs(0),
        })
    }

    #[test]
    fn test_valid_access_token() {
        let user = validator()
            .validate_token(&access_token("7", false))
            .unwrap();
        assert_eq!(user.principal_id, Some(7));
        assert_eq!(user.name.as_deref(), Some("Test User"));
        assert!(!user.is_privileged);
    }

    #[test]
    fn test_admin_profile_is_privileged() {
        let user = validator().validate_token(&access_token("3", true)).unwrap();
        assert!(user.is_privileged);
    }

    #[test]
    fn test_non_numeric_subject_has_no_principal() {
        let user = validator()
            .validate_token(&access_token("abc", false))
            .unwrap();
        assert_eq!(user.principal_id, None);
    }

    #[test]
    fn test_refresh_token_rejected() {
        let token = sign("7", "refresh", TEST_SECRET, 3600);
        assert!(matches!(
            validator().validate_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign("7", "access", "other-secret", 3600);
        assert!(matches!(
            validator().validate_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign("7", "access", TEST_SECRET, -120);
        assert!(matches!(
            validator().validate_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validator().validate_token("not-a-jwt").is_err());
    }
}
