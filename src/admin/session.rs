use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use crate::{
    auth::jwt::{JwtKeys, TokenKind},
    error::AppError,
    state::AppState,
    users::repo_types::User,
};

pub const SESSION_COOKIE: &str = "admin_session";
pub const LOGIN_PATH: &str = "/admin/login";
pub const HOME_PATH: &str = "/admin/users";

/// Value of cookie `name` from the request's `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .find_map(|kv| {
            let (k, v) = kv.split_once('=')?;
            (k == name).then_some(v)
        })
}

pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let secure = if secure { " Secure;" } else { "" };
    format!(
        "{SESSION_COOKIE}={token}; Path=/admin; HttpOnly;{secure} SameSite=Strict; Max-Age={max_age_secs}"
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/admin; HttpOnly; SameSite=Strict; Max-Age=0")
}

/// Only same-site admin paths are honoured as post-login targets. Anything that
/// could not go into a `Location` header as-is falls back to the user list.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n)
            if n.starts_with("/admin")
                && !n.starts_with("//")
                && n.bytes().all(|b| b.is_ascii_graphic()) =>
        {
            n
        }
        _ => HOME_PATH,
    }
}

/// Redirect to the login form, remembering `target` (path plus query).
pub fn login_redirect(target: &str) -> Response {
    let query = serde_urlencoded::to_string([("next", target)]).unwrap_or_default();
    Redirect::to(&format!("{LOGIN_PATH}?{query}")).into_response()
}

/// An active staff member holding a valid admin session cookie.
pub struct StaffUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let path = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
        let Some(token) = cookie_value(&parts.headers, SESSION_COOKIE).filter(|t| !t.is_empty()) else {
            debug!(%path, "no admin session");
            return Err(login_redirect(&path));
        };

        let keys = JwtKeys::from_ref(state);
        let claims = match keys.verify_kind(token, TokenKind::Session) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid admin session");
                return Err(login_redirect(&path));
            }
        };

        let user = state
            .users()
            .get(claims.sub)
            .await
            .map_err(|e| AppError::from(e).into_response())?;
        match user {
            Some(user) if user.can_use_admin() => Ok(StaffUser(user)),
            _ => {
                warn!(user_id = %claims.sub, "admin session for non-staff user");
                Err(login_redirect(&path))
            }
        }
    }
}
