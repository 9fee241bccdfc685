//! IVD Middleware - LIS Integration
//!
//! Per-tenant LIS configuration lifecycle plus the bidirectional retrieval
//! (pull) and upload (push) contracts against the `LisAdapter` port.

pub mod config_service;
pub mod integration_service;

pub use config_service::LisConfigService;
pub use integration_service::{LisIntegrationService, RetrievalOutcome, UploadRunOutcome};
