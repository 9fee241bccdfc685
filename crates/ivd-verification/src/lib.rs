//! IVD Middleware - Verification Engine & Service
//!
//! A prioritized, short-circuiting rule evaluator plus the orchestrator that
//! applies its decisions to a Result via the repository ports.

pub mod engine;
pub mod service;

pub use engine::{check_critical_range, check_delta, check_instrument_flags, check_reference_range, verify, verify_batch, VerificationDecision};
pub use service::{is_already_verified, BatchOutcome, VerificationService};
