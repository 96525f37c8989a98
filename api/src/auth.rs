use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use cuisine_shared::{LoginRequest, Message, SignupRequest, TokenResponse};

use crate::{error::ApiError, middleware::TOKEN_COOKIE, token, AppState};

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::hours(token::TOKEN_TTL_HOURS))
        .build()
}

// ── Validation ──

const PASSWORD_SPECIALS: &str = "!@#$%^&*()";

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn valid_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

fn validate_signup(payload: &SignupRequest) -> Result<(), ApiError> {
    let mut errors = HashMap::new();

    if payload.name.trim().is_empty() {
        errors.insert("name", "name is required".to_string());
    }
    if !valid_email(payload.email.trim()) {
        errors.insert("email", "invalid email format".to_string());
    }
    if !valid_password(&payload.password) {
        errors.insert(
            "password",
            "password must be at least 8 characters long and contain a digit \
             and one of !@#$%^&*()"
                .to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Fields(errors))
    }
}

// ── Handlers ──

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&payload)?;

    let pool = state.db.clone();
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let password = payload.password;

    let user_id = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;

        let existing: Option<i64> = conn
            .query_row("SELECT id FROM users WHERE email = ?1", [&email], |row| {
                row.get(0)
            })
            .ok();
        if existing.is_some() {
            return Err(ApiError::Conflict("email already exists"));
        }

        let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        conn.execute(
            "INSERT INTO users (name, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![name, email, hash, chrono::Utc::now().timestamp()],
        )?;

        Ok::<_, ApiError>(conn.last_insert_rowid())
    })
    .await??;

    let token = token::issue(&state.keys, user_id, payload.name.trim())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let jar = jar.add(session_cookie(token.clone()));

    Ok((StatusCode::CREATED, jar, Json(TokenResponse { token })))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.db.clone();
    let email = payload.email.trim().to_lowercase();
    let password = payload.password;

    let (user_id, name) = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;

        let row: Option<(i64, String, String)> = conn
            .query_row(
                "SELECT id, name, password_hash FROM users WHERE email = ?1",
                [&email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .ok();

        let (id, name, hash) = row.ok_or(ApiError::Auth("invalid email or password"))?;

        let matches =
            bcrypt::verify(&password, &hash).map_err(|e| ApiError::Internal(e.to_string()))?;
        if !matches {
            return Err(ApiError::Auth("invalid email or password"));
        }

        Ok::<_, ApiError>((id, name))
    })
    .await??;

    let token = token::issue(&state.keys, user_id, &name)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let jar = jar.add(session_cookie(token.clone()));

    Ok((jar, Json(TokenResponse { token })))
}

/// POST /auth/logout — clears the cookie by re-setting it with an expiry
/// in the past.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(
        Cookie::build((TOKEN_COOKIE, ""))
            .http_only(true)
            .path("/")
            .build(),
    );

    (
        jar,
        Json(Message {
            message: "logged out".to_string(),
        }),
    )
}

/// GET /auth/validate — echoes the session token, empty when absent.
/// Never errors.
pub async fn validate(jar: CookieJar) -> Json<TokenResponse> {
    let token = jar
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();

    Json(TokenResponse { token })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        assert!(valid_password("Abcd1234!"));
        assert!(!valid_password("short1!"));
        assert!(!valid_password("nodigits!!"));
        assert!(!valid_password("nospecial12345"));
    }

    #[test]
    fn email_rules() {
        assert!(valid_email("a@x.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("@x.com"));
        assert!(!valid_email("a@nodot"));
    }

    #[test]
    fn signup_validation_collects_all_fields() {
        let payload = SignupRequest {
            name: "".to_string(),
            email: "bad".to_string(),
            password: "weak".to_string(),
        };
        match validate_signup(&payload) {
            Err(ApiError::Fields(map)) => {
                assert_eq!(map.len(), 3);
                assert!(map.contains_key("name"));
                assert!(map.contains_key("email"));
                assert!(map.contains_key("password"));
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }
}
