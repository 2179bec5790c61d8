//! Bearer-token identity for the REST API and optional verification of WebSocket handshakes.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Signs session tokens. The login flow that hands these out lives outside this service.
pub fn issue_token(secret: &[u8], user_id: &str, ttl_secs: u64) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = chrono::Utc::now().timestamp().max(0) as u64 + ttl_secs;
    let claims = Claims {
        sub: user_id.to_owned(),
        exp: exp as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
}

/// Returns the token's subject if the signature and expiry check out.
pub fn verify_token(secret: &[u8], token: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims.sub)
}

/// Authenticated caller of a REST handler.
pub struct CurrentUid(pub String);

impl FromRequestParts<AppState> for CurrentUid {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "Missing bearer token"))?;
        match verify_token(&state.jwt_secret, token.trim()) {
            Ok(uid) => Ok(CurrentUid(uid)),
            Err(e) => {
                tracing::debug!("reject bearer token: {:?}", e);
                Err((StatusCode::UNAUTHORIZED, "Invalid token"))
            }
        }
    }
}

/// How an `auth` frame's claimed user id is trusted.
#[derive(Clone)]
pub enum HandshakePolicy {
    /// Accept the claimed id as-is. Any client can claim any user.
    TrustClaim,
    /// Require a token whose subject equals the claimed id.
    RequireToken { secret: Arc<Vec<u8>> },
}

impl HandshakePolicy {
    pub fn accepts(&self, user_id: &str, token: Option<&str>) -> bool {
        match self {
            HandshakePolicy::TrustClaim => true,
            HandshakePolicy::RequireToken { secret } => match token {
                Some(t) => verify_token(secret, t).is_ok_and(|sub| sub == user_id),
                None => false,
            },
        }
    }
}
