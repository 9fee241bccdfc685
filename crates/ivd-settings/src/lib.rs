//! IVD Middleware - Settings
//!
//! Per-test-code auto-verification settings lifecycle and per-tenant rule
//! enablement/seeding.

pub mod service;

pub use service::SettingsService;
