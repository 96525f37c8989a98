use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::{error::ApiError, token, AppState};

/// Name of the session cookie carrying the JWT.
pub const TOKEN_COOKIE: &str = "token";

/// Identity resolved by the auth gate, visible to handlers on protected
/// routes only and scoped to a single request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
}

/// The auth gate: extracts the `token` cookie, verifies it against the
/// process-wide keys, and injects the caller's identity. Handlers on
/// public routes simply do not declare the extractor and bypass the gate
/// entirely.
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar
            .get(TOKEN_COOKIE)
            .ok_or(ApiError::Auth("missing token"))?;

        let claims = token::parse(&state.keys, cookie.value())?;

        Ok(AuthUser {
            id: claims.sub,
            name: claims.name,
        })
    }
}

/// Best-effort variant for routes where authentication is optional:
/// browsing stays public, but a valid cookie enriches the response.
pub fn viewer_from_jar(jar: &CookieJar, state: &AppState) -> Option<AuthUser> {
    let cookie = jar.get(TOKEN_COOKIE)?;
    let claims = token::parse(&state.keys, cookie.value()).ok()?;
    Some(AuthUser {
        id: claims.sub,
        name: claims.name,
    })
}
