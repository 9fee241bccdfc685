//! LIS Adapter port: the pluggable boundary to the external Laboratory
//! Information System. The wire protocol is deliberately not specified here
//! — only the capability shape the integration service depends on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::{Id, IvdResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub is_connected: bool,
    pub last_tested_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleData {
    pub external_lis_id: String,
    pub patient_id: String,
    pub specimen_type: String,
    pub collection_date: DateTime<Utc>,
    pub received_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultData {
    pub external_lis_result_id: String,
    pub test_code: String,
    pub test_name: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub lis_flags: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPayload {
    pub external_lis_result_id: String,
    pub test_code: String,
    pub value: Option<String>,
    pub verification_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub total_sent: u32,
    pub total_failed: u32,
    pub failed_result_ids: Vec<Id>,
    pub retry_scheduled: bool,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait LisAdapter: Send + Sync {
    async fn test_connection(&self) -> IvdResult<ConnectionTestResult>;
    async fn get_samples(&self, since: Option<DateTime<Utc>>) -> IvdResult<Vec<SampleData>>;
    async fn get_results(&self, sample_external_lis_id: &str) -> IvdResult<Vec<ResultData>>;
    async fn send_results(&self, payloads: Vec<ResultPayload>) -> IvdResult<UploadOutcome>;
    async fn acknowledge_results(&self, external_lis_result_ids: Vec<String>) -> IvdResult<bool>;
}

/// Deterministic in-memory double for local development and the `LisType::Mock`
/// profile: every call succeeds against a small canned fixture.
pub struct MockLisAdapter {
    pub samples: Vec<SampleData>,
    pub results: std::collections::HashMap<String, Vec<ResultData>>,
}

impl Default for MockLisAdapter {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            results: std::collections::HashMap::new(),
        }
    }
}

#[async_trait]
impl LisAdapter for MockLisAdapter {
    async fn test_connection(&self) -> IvdResult<ConnectionTestResult> {
        Ok(ConnectionTestResult {
            is_connected: true,
            last_tested_at: Utc::now(),
            error_message: None,
            details: None,
        })
    }

    async fn get_samples(&self, _since: Option<DateTime<Utc>>) -> IvdResult<Vec<SampleData>> {
        Ok(self.samples.clone())
    }

    async fn get_results(&self, sample_external_lis_id: &str) -> IvdResult<Vec<ResultData>> {
        Ok(self.results.get(sample_external_lis_id).cloned().unwrap_or_default())
    }

    async fn send_results(&self, payloads: Vec<ResultPayload>) -> IvdResult<UploadOutcome> {
        Ok(UploadOutcome {
            total_sent: payloads.len() as u32,
            total_failed: 0,
            failed_result_ids: Vec::new(),
            retry_scheduled: false,
            next_retry_at: None,
            error_message: None,
        })
    }

    async fn acknowledge_results(&self, _external_lis_result_ids: Vec<String>) -> IvdResult<bool> {
        Ok(true)
    }
}
