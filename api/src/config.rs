use std::env;

use tracing::warn;

pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub cors_origin: String,
}

impl Config {
    /// Reads the environment once at startup. Missing required variables
    /// are fatal to the process, never handled per-request.
    pub fn load() -> Self {
        Self {
            database_url: required("DATABASE_URL"),
            jwt_secret: required("JWT_SECRET"),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a number"),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}

fn required(key: &str) -> String {
    env::var(key)
        .map_err(|_| {
            warn!("required environment variable {key} is not set");
        })
        .unwrap_or_else(|_| panic!("{key} must be set"))
}
