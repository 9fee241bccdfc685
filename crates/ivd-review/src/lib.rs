//! IVD Middleware - Review Workflow
//!
//! The sample-scoped review state machine: creation, sample-wide and
//! per-result decisions, escalation, and auto-completion on full decision
//! coverage.

pub mod service;

pub use service::ReviewService;
