use chrono::Duration;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tokens are short-lived; every protected request carries one.
/// `sid` ties the token to its session row so logout can revoke it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub username: String,
    pub sid: Uuid,
    pub exp: usize,
}

/// Refresh tokens only ever mint new access tokens. Signed with a
/// separate secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub sid: Uuid,
    pub exp: usize,
}

pub fn new_access_claims(user_id: Uuid, username: &str, sid: Uuid) -> AccessClaims {
    AccessClaims {
        sub: user_id,
        username: username.to_string(),
        sid,
        exp: expiry(Duration::minutes(15)),
    }
}

pub fn new_refresh_claims(user_id: Uuid, sid: Uuid) -> RefreshClaims {
    RefreshClaims {
        sub: user_id,
        sid,
        exp: expiry(Duration::days(7)),
    }
}

fn expiry(ttl: Duration) -> usize {
    (chrono::Utc::now() + ttl).timestamp() as usize
}

pub fn encode_access(secret: &str, claims: &AccessClaims) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn encode_refresh(secret: &str, claims: &RefreshClaims) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_access(secret: &str, token: &str) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

pub fn decode_refresh(secret: &str, token: &str) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
