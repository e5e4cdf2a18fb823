use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;
use uuid::Uuid;

use mystic_db::Database;
use mystic_types::api::{ApiEnvelope, CurrentUserData, LoginData, LoginRequest, RegisterRequest};

use crate::convert::user_from_row;
use crate::error::ApiError;
use crate::middleware::{ACCESS_COOKIE, REFRESH_COOKIE, auth_cookie, removal_cookie};
use crate::token::{self, AccessClaims};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub access_secret: String,
    pub refresh_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_lowercase();
    let email = req.email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || req.password.trim().is_empty() {
        return Err(ApiError::bad_request("All fields are required"));
    }

    if state.db.username_or_email_taken(&username, &email)? {
        return Err(ApiError::conflict("User already exists"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("password hashing failed: {}", e);
            ApiError::internal()
        })?
        .to_string();

    let user_id = Uuid::new_v4();
    // The taken-check above and this insert are separate store operations,
    // so a concurrent register can still trip the UNIQUE constraint here
    state
        .db
        .create_user(&user_id.to_string(), &username, &email, &password_hash)
        .map_err(|e| {
            if mystic_db::is_unique_violation(&e) {
                ApiError::conflict("User already exists")
            } else {
                e.into()
            }
        })?;

    let user = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .map(user_from_row)
        .ok_or_else(ApiError::internal)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::new(201, user, "User registered successfully")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = match (req.username.as_deref(), req.email.as_deref()) {
        (Some(username), _) if !username.trim().is_empty() => {
            state.db.get_user_by_username(&username.trim().to_lowercase())?
        }
        (_, Some(email)) if !email.trim().is_empty() => {
            state.db.get_user_by_email(&email.trim().to_lowercase())?
        }
        _ => return Err(ApiError::bad_request("Username or Email is required")),
    };

    // Same message for unknown users and bad passwords
    let row = row.ok_or_else(|| ApiError::bad_request("Invalid username or password"))?;

    let parsed_hash = PasswordHash::new(&row.password).map_err(|e| {
        error!("stored password hash unparseable for '{}': {}", row.username, e);
        ApiError::internal()
    })?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::bad_request("Invalid username or password"))?;

    let user = user_from_row(row);
    let session_id = Uuid::new_v4();

    let access_claims = token::new_access_claims(user.id, &user.username, session_id);
    let access_token = token::encode_access(&state.access_secret, &access_claims)?;

    let refresh_claims = token::new_refresh_claims(user.id, session_id);
    let refresh_token = token::encode_refresh(&state.refresh_secret, &refresh_claims)?;

    // One session row per device; a second login does not displace the first
    state
        .db
        .create_session(&session_id.to_string(), &user.id.to_string(), &refresh_token)?;

    let jar = jar
        .add(auth_cookie(ACCESS_COOKIE, access_token.clone()))
        .add(auth_cookie(REFRESH_COOKIE, refresh_token.clone()));

    let data = LoginData {
        user,
        access_token,
        refresh_token,
    };
    Ok((
        jar,
        Json(ApiEnvelope::new(200, data, "user logged in successfully")),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete_session(&claims.sid.to_string())?;

    let jar = jar
        .add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE));

    Ok((
        jar,
        Json(ApiEnvelope::<()>::empty(200, "User logged out successfully")),
    ))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .map(user_from_row)
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(ApiEnvelope::new(
        200,
        CurrentUserData { user },
        "User fetched successfully",
    )))
}
