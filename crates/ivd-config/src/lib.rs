//! IVD Middleware - Configuration
//!
//! Environment-driven `AppConfig` with `validator`-backed field validation,
//! mirroring spec.md §6's Environment table.

pub mod config;
pub mod loader;

pub use config::{
    AppConfig, AppMetadata, DatabaseConfig, FeatureFlags, InstrumentSettings, LisSettings, SecurityConfig,
    ServerConfig,
};
pub use loader::ConfigLoader;
