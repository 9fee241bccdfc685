//! IVD Middleware - Instrument Integration
//!
//! Instrument registry and token auth, plus the host-query and
//! result-submission contracts authenticated instruments drive.

pub mod integration_service;
pub mod registry;
pub mod repository_adapter;

pub use integration_service::InstrumentIntegrationService;
pub use registry::InstrumentRegistry;
pub use repository_adapter::RepositoryInstrumentAdapter;
