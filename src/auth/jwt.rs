use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use serde::{Deserialize, Serialize};

/// Claims of the token handed to the browser after sign-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Login ID of the viewer.
    pub sub: String,
    /// Session the token refers to.
    pub sid: String,
    pub iat: usize,
    pub exp: usize,
}

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

pub fn generate_session_token(
    session_id: &str,
    identity: &str,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    let issued = now();
    let claims = SessionClaims {
        sub: identity.to_string(),
        sid: session_id.to_string(),
        iat: issued,
        exp: issued + ttl,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<SessionClaims, String> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
