//! Authentication middleware for JWT token validation
//!
//! Tokens are issued by the identity service; this service only verifies
//! them and trusts the `sub` claim as the caller's user id.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Platform-wide roles, e.g. `customer` or `provider`
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<String>,
}

/// How tokens are signed
#[derive(Debug, Clone)]
pub enum JwtKey {
    /// RS256 public key in PEM form
    RsaPublicPem(String),
    /// HS256 shared secret
    Secret(String),
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub key: JwtKey,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// `JWT_PUBLIC_KEY` (PEM text or a path to it) selects RS256; otherwise
    /// `JWT_SECRET` selects HS256.
    pub fn from_env() -> Result<Self, String> {
        if let Ok(public_key) = env::var("JWT_PUBLIC_KEY") {
            let public_key = if public_key.starts_with("-----BEGIN") {
                public_key
            } else {
                std::fs::read_to_string(&public_key)
                    .map_err(|e| format!("Failed to read public key file: {}", e))?
                    .trim()
                    .to_string()
            };
            return Ok(JwtConfig {
                key: JwtKey::RsaPublicPem(public_key),
            });
        }

        match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => Ok(JwtConfig {
                key: JwtKey::Secret(secret),
            }),
            _ => Err("Neither JWT_PUBLIC_KEY nor JWT_SECRET is set".to_string()),
        }
    }
}

/// Token verifier built once at startup
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &JwtConfig) -> Result<Self, jsonwebtoken::errors::Error> {
        let (decoding_key, algorithm) = match &config.key {
            JwtKey::RsaPublicPem(pem) => (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256),
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;

    let claims = state.jwt.verify(bearer.token()).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        roles: claims.roles,
    });

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serial_test::serial;

    fn now() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    fn token(secret: &str, sub: Uuid, exp: u64) -> String {
        let claims = Claims {
            sub,
            roles: vec!["customer".to_string()],
            iat: now(),
            exp,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier(secret: &str) -> JwtVerifier {
        JwtVerifier::new(&JwtConfig {
            key: JwtKey::Secret(secret.to_string()),
        })
        .unwrap()
    }

    #[test]
    fn valid_token_yields_subject() {
        let user = Uuid::new_v4();
        let claims = verifier("secret")
            .verify(&token("secret", user, now() + 600))
            .unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.roles, vec!["customer".to_string()]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let t = token("other", Uuid::new_v4(), now() + 600);
        assert!(verifier("secret").verify(&t).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let t = token("secret", Uuid::new_v4(), now() - 3600);
        assert!(verifier("secret").verify(&t).is_err());
    }

    #[test]
    fn malformed_rsa_key_fails_at_startup() {
        let config = JwtConfig {
            key: JwtKey::RsaPublicPem("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----".to_string()),
        };
        assert!(JwtVerifier::new(&config).is_err());
    }

    #[test]
    #[serial]
    fn config_prefers_public_key_then_secret() {
        unsafe {
            env::remove_var("JWT_PUBLIC_KEY");
            env::remove_var("JWT_SECRET");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            env::set_var("JWT_SECRET", "shh");
        }
        assert!(matches!(
            JwtConfig::from_env().unwrap().key,
            JwtKey::Secret(ref s) if s == "shh"
        ));

        unsafe {
            env::set_var("JWT_PUBLIC_KEY", "-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----");
        }
        assert!(matches!(
            JwtConfig::from_env().unwrap().key,
            JwtKey::RsaPublicPem(_)
        ));

        unsafe {
            env::remove_var("JWT_PUBLIC_KEY");
            env::remove_var("JWT_SECRET");
        }
    }

    #[test]
    #[serial]
    fn missing_key_file_is_reported() {
        unsafe {
            env::set_var("JWT_PUBLIC_KEY", "/definitely/not/here.pem");
        }
        let err = JwtConfig::from_env().unwrap_err();
        assert!(err.contains("Failed to read public key file"));
        unsafe {
            env::remove_var("JWT_PUBLIC_KEY");
        }
    }
}
