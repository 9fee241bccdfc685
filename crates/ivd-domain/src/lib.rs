//! IVD Middleware - Domain Entities & Invariants
//!
//! Owns every entity shape shared across the result lifecycle: Sample,
//! Order, Result, Review, ResultDecision, AutoVerificationSettings,
//! VerificationRule, LISConfig, Instrument and InstrumentQuery. No other
//! crate in the workspace redefines these fields.

pub mod error;
pub mod ids;
pub mod instrument;
pub mod lis_config;
pub mod order;
pub mod result;
pub mod review;
pub mod sample;
pub mod settings;

pub use error::{IvdError, IvdResult};
pub use ids::{new_id, Id};
pub use instrument::{Instrument, InstrumentQuery, InstrumentStatus, InstrumentType, ResponseStatus};
pub use lis_config::{ConnectionStatus, IntegrationModel, LisConfig, LisType};
pub use order::{Order, OrderPriority, OrderStatus};
pub use result::{Result as LabResult, UploadStatus, VerificationMethod, VerificationStatus};
pub use review::{Review, ReviewDecisionKind, ReviewState, ResultDecision, ResultDecisionKind};
pub use sample::{Sample, SampleStatus};
pub use settings::{AutoVerificationSettings, RuleType, VerificationRule};

/// Tenant identifier. Every entity and every query carries one.
pub type TenantId = Id;
