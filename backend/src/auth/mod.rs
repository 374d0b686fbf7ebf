use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use crates::domain::value_objects::{
    enums::actor_roles::ActorRole,
    iam::{ActorContext, StaffPermissions},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity token issued by the tenant service.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActorClaims {
    pub sub: String,
    pub business_id: Uuid,
    pub role: String,
    #[serde(default)]
    pub permissions: Option<StaffPermissions>,
    pub exp: usize,
}

/// HS256 verifier shared with handlers through a request extension.
#[derive(Clone)]
pub struct JwtKeys {
    decoding_key: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[derive(Debug)]
pub struct AuthError(anyhow::Error);

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError(err)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn validate_actor_jwt(token: &str, keys: &JwtKeys) -> Result<ActorContext, AuthError> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<ActorClaims>(token, &keys.decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;
    let claims = token_data.claims;

    let actor_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| anyhow::anyhow!("Invalid actor ID in token"))?;
    let role = ActorRole::from_str(&claims.role)
        .ok_or_else(|| anyhow::anyhow!("Unknown role in token: {}", claims.role))?;

    Ok(ActorContext::new(
        actor_id,
        claims.business_id,
        role,
        claims.permissions.unwrap_or_default(),
    ))
}

/// Authenticated tenant + actor for a staff-facing request.
#[derive(Debug, Clone, Copy)]
pub struct AuthActor(pub ActorContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = parts
            .extensions
            .get::<Arc<JwtKeys>>()
            .cloned()
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication is not configured".to_string(),
            ))?;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    (
                        StatusCode::UNAUTHORIZED,
                        "Missing or invalid Authorization header".to_string(),
                    )
                })?;

        let actor = validate_actor_jwt(bearer.token(), &keys)
            .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

        Ok(AuthActor(actor))
    }
}
