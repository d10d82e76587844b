use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Database configuration
    pub database_url: String,
    pub database_namespace: String,
    pub database_name: String,
    pub database_username: String,
    pub database_password: String,
    pub database_timeout_secs: u64,

    // Authentication configuration
    pub auth_service_url: String,
    pub auth_service_token: String,
    pub jwt_secret: String,
    pub auth_cache_ttl: u64,

    // Request handling
    pub request_timeout_secs: u64,

    // Content settings
    pub max_post_length: usize,
    pub max_comment_length: usize,
    pub max_bio_length: usize,
    pub max_attribution_length: usize,
    pub posts_per_page: usize,

    // Feed settings
    pub feed_ranking: String, // "random" | "newest"

    // Background maintenance
    pub counter_reconcile_interval: u64,

    // Rate limiting
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            database_namespace: env::var("DATABASE_NAMESPACE")
                .unwrap_or_else(|_| "rainbow".to_string()),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "verse".to_string()),
            database_username: env::var("DATABASE_USERNAME")
                .unwrap_or_else(|_| "root".to_string()),
            database_password: env::var("DATABASE_PASSWORD")
                .unwrap_or_else(|_| "root".to_string()),
            database_timeout_secs: env::var("DATABASE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            auth_service_url: env::var("AUTH_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            auth_service_token: env::var("AUTH_SERVICE_TOKEN")
                .unwrap_or_else(|_| "default-token".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            auth_cache_ttl: env::var("AUTH_CACHE_TTL")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            max_post_length: env::var("MAX_POST_LENGTH")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            max_comment_length: env::var("MAX_COMMENT_LENGTH")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            max_bio_length: env::var("MAX_BIO_LENGTH")
                .unwrap_or_else(|_| "150".to_string())
                .parse()?,
            max_attribution_length: env::var("MAX_ATTRIBUTION_LENGTH")
                .unwrap_or_else(|_| "200".to_string())
                .parse()?,
            posts_per_page: env::var("POSTS_PER_PAGE")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,

            feed_ranking: env::var("FEED_RANKING")
                .unwrap_or_else(|_| "random".to_string()),

            counter_reconcile_interval: env::var("COUNTER_RECONCILE_INTERVAL")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()?,

            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            rate_limit_window: env::var("RATE_LIMIT_WINDOW")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
