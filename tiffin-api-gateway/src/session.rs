//! Bearer/cookie sessions backed by HS256 JWTs.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tiffin_service::models::{Role, User};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::AppState;

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

pub struct SessionKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    pub access_token_expires: TimeDelta,
}

impl SessionKeys {
    pub fn new(secret_key: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_ref()),
            decoding_key: DecodingKey::from_secret(secret_key.as_ref()),
            access_token_expires: TimeDelta::hours(8),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp() as usize,
            exp: (now + self.access_token_expires).timestamp() as usize,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApiError::Internal(format!("cannot issue token: {err}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::InvalidToken)
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn cookie(&self, token: &str) -> String {
        format!(
            "{TOKEN_COOKIE}={token}; HttpOnly; Path=/; SameSite=Strict; Max-Age={}",
            self.access_token_expires.num_seconds()
        )
    }

    pub fn expired_cookie() -> String {
        format!("{TOKEN_COOKIE}=; HttpOnly; Path=/; SameSite=Strict; Max-Age=0")
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        return value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .map(str::trim);
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Any signed-in user.
#[derive(Debug, Clone)]
pub struct Session(pub Claims);

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or_else(|| {
            warn!(uri = %parts.uri, "missing session token");
            ApiError::AuthenticationRequired
        })?;

        let claims = state.keys.verify(token).inspect_err(|_| {
            warn!(uri = %parts.uri, "rejected session token");
        })?;
        Ok(Session(claims))
    }
}

/// Marker extractor: the request carries a session holding the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Session(claims) = Session::from_request_parts(parts, state).await?;
        if claims.role != Role::Admin {
            warn!(user_id = %claims.sub, role = %claims.role, "admin route refused");
            return Err(ApiError::Forbidden);
        }
        Ok(AdminSession)
    }
}
