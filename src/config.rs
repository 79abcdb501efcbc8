use std::env;

pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

/// Process configuration, read from the environment once at startup and
/// passed explicitly into the pieces that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub db_path: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "8080".to_string()),
            db_path: env::var("DB_PATH").unwrap_or_else(|_| "./data/accounts.db".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}
