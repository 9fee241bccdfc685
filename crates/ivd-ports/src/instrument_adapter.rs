//! Instrument Adapter port: the pluggable boundary to a physical analyzer
//! driver. Only the capability set the integration service depends on;
//! no wire protocol is specified.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::{Id, IvdResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub is_connected: bool,
    pub last_tested_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderData {
    pub external_lis_order_id: String,
    pub sample_id: Id,
    pub patient_id: String,
    pub test_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub external_instrument_result_id: String,
    pub test_code: String,
    pub value: Option<String>,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub result_id: Id,
    pub status: SubmissionStatus,
    pub verification_queued: bool,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait InstrumentAdapter: Send + Sync {
    async fn test_connection(&self) -> IvdResult<ConnectionTestResult>;
    async fn get_pending_orders(
        &self,
        tenant_id: &Id,
        instrument_id: &Id,
        patient_id: Option<&str>,
        sample_barcode: Option<&str>,
    ) -> IvdResult<Vec<OrderData>>;
    async fn process_result(
        &self,
        tenant_id: &Id,
        instrument_id: &Id,
        payload: ResultSubmission,
    ) -> IvdResult<SubmissionOutcome>;
}

/// Deterministic in-memory double for local development: every call succeeds,
/// host-query returns no orders.
#[derive(Default)]
pub struct MockInstrumentAdapter;

#[async_trait]
impl InstrumentAdapter for MockInstrumentAdapter {
    async fn test_connection(&self) -> IvdResult<ConnectionTestResult> {
        Ok(ConnectionTestResult {
            is_connected: true,
            last_tested_at: Utc::now(),
            error_message: None,
        })
    }

    async fn get_pending_orders(
        &self,
        _tenant_id: &Id,
        _instrument_id: &Id,
        _patient_id: Option<&str>,
        _sample_barcode: Option<&str>,
    ) -> IvdResult<Vec<OrderData>> {
        Ok(Vec::new())
    }

    async fn process_result(
        &self,
        _tenant_id: &Id,
        _instrument_id: &Id,
        _payload: ResultSubmission,
    ) -> IvdResult<SubmissionOutcome> {
        Ok(SubmissionOutcome {
            result_id: ivd_domain::new_id(),
            status: SubmissionStatus::Accepted,
            verification_queued: true,
            error_message: None,
        })
    }
}
