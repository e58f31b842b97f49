use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::axum_http::error_responses::ErrorResponse;

/// Shared through a request extension so every router can authenticate.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug)]
pub struct AuthError(pub String);

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(ErrorResponse {
                code: StatusCode::UNAUTHORIZED.as_u16(),
                kind: "unauthorized".to_string(),
                message: self.0,
            }),
        )
            .into_response()
    }
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<AccessClaims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.set_audience(&["authenticated"]);

    let token_data = decode::<AccessClaims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError(format!("JWT validation failed: {e}")))?;

    Ok(token_data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let settings = parts
            .extensions
            .get::<Arc<AuthSettings>>()
            .cloned()
            .ok_or_else(|| {
                warn!("auth: settings extension is missing");
                AuthError("Authentication is not configured".to_string())
            })?;

        let auth_str = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError("Missing Authorization header".to_string()))?
            .to_str()
            .map_err(|_| AuthError("Invalid Authorization header".to_string()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError("Invalid Authorization header format".to_string()))?;

        let claims = validate_jwt(token, &settings.jwt_secret)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError("Invalid user ID in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests;
