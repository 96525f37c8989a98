use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sessions live for three days, matching the cookie expiry.
pub const TOKEN_TTL_HOURS: i64 = 72;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: i64,     // user id
    pub name: String, // display name
    pub exp: usize,   // expiry (unix timestamp)
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// HS256 key pair derived from the process-wide secret, built once at
/// startup.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub fn issue(keys: &TokenKeys, user_id: i64, name: &str) -> Result<String, TokenError> {
    let exp = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(TOKEN_TTL_HOURS))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        name: name.to_owned(),
        exp,
    };

    encode(&Header::default(), &claims, &keys.encoding).map_err(|_| TokenError::Invalid)
}

pub fn parse(keys: &TokenKeys, token: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(token, &keys.decoding, &Validation::default())
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let keys = TokenKeys::new("test-secret");
        let token = issue(&keys, 42, "Ana").unwrap();
        let claims = parse(&keys, &token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.name, "Ana");
    }

    #[test]
    fn forged_signature_rejected() {
        let keys = TokenKeys::new("test-secret");
        let other = TokenKeys::new("another-secret");
        let token = issue(&other, 42, "Ana").unwrap();
        assert_eq!(parse(&keys, &token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_rejected() {
        let keys = TokenKeys::new("test-secret");
        assert_eq!(parse(&keys, "not-a-jwt"), Err(TokenError::Invalid));
    }

    #[test]
    fn expired_rejected() {
        let keys = TokenKeys::new("test-secret");
        let exp = (chrono::Utc::now().timestamp() - 3600) as usize;
        let claims = Claims {
            sub: 42,
            name: "Ana".to_string(),
            exp,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(parse(&keys, &token), Err(TokenError::Expired));
    }
}
