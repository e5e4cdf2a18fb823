use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{debug, warn};

use mystic_types::api::ApiEnvelope;

use crate::auth::AppState;
use crate::error::{ApiError, SESSION_EXPIRED};
use crate::token;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Auth cookies are httpOnly + Secure + SameSite=None so the SPA on a
/// different origin can send them with credentialed requests.
pub fn auth_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_path("/");
    cookie
}

pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = auth_cookie(name, String::new());
    cookie.make_removal();
    cookie
}

/// The session gate. Three outcomes:
///   Authorized — the access token verifies; claims ride along as an extension.
///   Renew      — access token dead but the refresh token and its session row
///                are alive; a fresh access cookie is set on the response.
///   Expired    — refresh token dead (or its session revoked); both cookies
///                are cleared and the client gets 419 "session expired".
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let access_token = jar
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(&req));
    let refresh_token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    if access_token.is_none() && refresh_token.is_none() {
        return Err(ApiError::unauthorized("unauthorized request"));
    }

    if let Some(token) = &access_token {
        if let Ok(claims) = token::decode_access(&state.access_secret, token) {
            req.extensions_mut().insert(claims);
            return Ok(next.run(req).await);
        }
    }

    // Access token missing, expired, or garbage. Fall back to the refresh token.
    let Some(refresh_token) = refresh_token else {
        return Ok(session_expired_response());
    };

    let claims = match token::decode_refresh(&state.refresh_secret, &refresh_token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("refresh token rejected: {}", e);
            // The stored copy, if any, must not outlive the token itself
            if state.db.delete_session_by_token(&refresh_token)? {
                warn!("revoked session holding an invalid refresh token");
            }
            return Ok(session_expired_response());
        }
    };

    // Logout (or admin revocation) deletes the session row, which makes the
    // refresh token dead even before its JWT expiry.
    if state.db.get_session(&claims.sid.to_string())?.is_none() {
        return Ok(session_expired_response());
    }

    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let access_claims = token::new_access_claims(claims.sub, &user.username, claims.sid);
    let new_access = token::encode_access(&state.access_secret, &access_claims)?;

    req.extensions_mut().insert(access_claims);
    let mut res = next.run(req).await;
    append_set_cookie(&mut res, &auth_cookie(ACCESS_COOKIE, new_access));
    Ok(res)
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// 419 with both auth cookies cleared. Built by hand because ApiError
/// responses cannot carry Set-Cookie headers.
fn session_expired_response() -> Response {
    let status = StatusCode::from_u16(SESSION_EXPIRED).unwrap_or(StatusCode::UNAUTHORIZED);
    let body = Json(ApiEnvelope::<()>::empty(SESSION_EXPIRED, "session expired"));
    let mut res = (status, body).into_response();
    append_set_cookie(&mut res, &removal_cookie(ACCESS_COOKIE));
    append_set_cookie(&mut res, &removal_cookie(REFRESH_COOKIE));
    res
}

fn append_set_cookie(res: &mut Response, cookie: &Cookie<'_>) {
    match header::HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            res.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!("Unserializable cookie '{}': {}", cookie.name(), e),
    }
}
