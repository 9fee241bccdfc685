//! Environment-variable configuration loading.

use std::env;

use ivd_domain::{IvdError, IvdResult};
use tracing::info;
use validator::Validate;

use crate::config::{
    AppConfig, AppMetadata, DatabaseConfig, FeatureFlags, InstrumentSettings, LisSettings, SecurityConfig,
    ServerConfig,
};

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(default)
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.split(',').map(|s| s.trim().to_string()).collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `AppConfig` from the process environment per spec.md §6,
    /// validates it, and returns the validated config.
    pub fn from_env() -> IvdResult<AppConfig> {
        let config = AppConfig {
            app: AppMetadata {
                environment: env_or("ENVIRONMENT", "development"),
                debug: env_bool("DEBUG", false),
            },
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_or("PORT", "8080").parse().unwrap_or(8080),
                request_timeout_seconds: env_or("REQUEST_TIMEOUT_SECONDS", "30").parse().unwrap_or(30),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", ""),
                use_real_database: env_bool("USE_REAL_DATABASE", false),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", "10").parse().unwrap_or(10),
            },
            security: SecurityConfig {
                secret_key: env_or("SECRET_KEY", ""),
                jwt_algorithm: env_or("JWT_ALGORITHM", "HS256"),
                cors_origins: env_list("CORS_ORIGINS", &["*"]),
            },
            lis: LisSettings {
                default_pull_interval_minutes: env_or("LIS_DEFAULT_PULL_INTERVAL_MINUTES", "5").parse().unwrap_or(5),
                default_upload_batch_size: env_or("LIS_DEFAULT_UPLOAD_BATCH_SIZE", "50").parse().unwrap_or(50),
            },
            instruments: InstrumentSettings {
                disconnect_after_failures: env_or("INSTRUMENT_DISCONNECT_AFTER_FAILURES", "3").parse().unwrap_or(3),
            },
            feature_flags: FeatureFlags {
                enable_auto_verification: env_bool("ENABLE_AUTO_VERIFICATION", true),
                enable_delta_check: env_bool("ENABLE_DELTA_CHECK", false),
                enable_review_escalation: env_bool("ENABLE_REVIEW_ESCALATION", true),
            },
        };

        config.validate().map_err(|e| IvdError::InvalidConfiguration(e.to_string()))?;
        info!(environment = %config.app.environment, "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_secret_key_fails_validation() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("SECRET_KEY");
        env::remove_var("DATABASE_URL");
        let err = ConfigLoader::from_env().unwrap_err();
        assert!(matches!(err, IvdError::InvalidConfiguration(_)));
    }

    #[test]
    fn valid_environment_loads_successfully() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("SECRET_KEY", "a-reasonably-long-secret-key-value");
        env::set_var("DATABASE_URL", "postgres://localhost/ivd");
        let config = ConfigLoader::from_env().unwrap();
        assert_eq!(config.security.jwt_algorithm, "HS256");
        env::remove_var("SECRET_KEY");
        env::remove_var("DATABASE_URL");
    }
}
