//! Application configuration structures and validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate]
    pub app: AppMetadata,
    #[validate]
    pub server: ServerConfig,
    #[validate]
    pub database: DatabaseConfig,
    #[validate]
    pub security: SecurityConfig,
    #[validate]
    pub lis: LisSettings,
    #[validate]
    pub instruments: InstrumentSettings,
    pub feature_flags: FeatureFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppMetadata {
    #[validate(length(min = 1, message = "environment name must not be empty"))]
    pub environment: String,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    pub host: String,
    #[validate(range(min = 1, message = "port must be nonzero"))]
    pub port: u16,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1, message = "DATABASE_URL must not be empty"))]
    pub url: String,
    pub use_real_database: bool,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecurityConfig {
    #[validate(length(min = 16, message = "SECRET_KEY must be at least 16 characters"))]
    pub secret_key: String,
    pub jwt_algorithm: String,
    pub cors_origins: Vec<String>,
}

/// Tunable defaults new `LisConfig` rows are seeded with; not a tenant
/// override (those live in `LisConfig` itself, per-tenant, in the database).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LisSettings {
    #[validate(range(min = 1, message = "default pull interval must be positive"))]
    pub default_pull_interval_minutes: i32,
    #[validate(range(min = 1, message = "default upload batch size must be positive"))]
    pub default_upload_batch_size: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InstrumentSettings {
    #[validate(range(min = 1, message = "consecutive-failure threshold must be positive"))]
    pub disconnect_after_failures: i32,
}

/// Toggles scoped to functionality spec.md explicitly allows operators to
/// turn off; none of these gate the ambient stack itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub enable_auto_verification: bool,
    pub enable_delta_check: bool,
    pub enable_review_escalation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_auto_verification: true,
            enable_delta_check: false,
            enable_review_escalation: true,
        }
    }
}
