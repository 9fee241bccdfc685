//! IVD Middleware - Repository and Adapter Ports
//!
//! Abstract persistence and external-collaborator contracts. `ivd-database`
//! implements the repository traits against Postgres; `memory` implements
//! them in-process for local development and contract testing. `ivd-lis`
//! and `ivd-instrument` implement the adapter traits.

pub mod instrument_adapter;
pub mod lis_adapter;
pub mod memory;
pub mod repositories;

pub use instrument_adapter::{InstrumentAdapter, MockInstrumentAdapter};
pub use lis_adapter::{LisAdapter, MockLisAdapter};
pub use repositories::{
    InstrumentQueryRepository, InstrumentRepository, LisConfigRepository, OrderRepository, ResultDecisionRepository,
    ResultFilter, ResultRepository, ReviewFilter, ReviewRepository, RuleRepository, SampleRepository,
    SettingsRepository,
};
