//! Instrument Integration Service: the host-query and result-submission
//! contracts an authenticated instrument drives, each writing an immutable
//! audit row and updating the instrument's connection health.

use std::sync::Arc;

use chrono::Utc;
use ivd_domain::instrument::{InstrumentQuery, ResponseStatus};
use ivd_domain::{Id, IvdResult};
use ivd_ports::instrument_adapter::{InstrumentAdapter, OrderData, ResultSubmission, SubmissionOutcome};
use ivd_ports::{InstrumentQueryRepository, InstrumentRepository};
use tracing::{instrument, warn};

pub struct InstrumentIntegrationService {
    instruments: Arc<dyn InstrumentRepository>,
    queries: Arc<dyn InstrumentQueryRepository>,
    adapter: Arc<dyn InstrumentAdapter>,
}

impl InstrumentIntegrationService {
    pub fn new(
        instruments: Arc<dyn InstrumentRepository>,
        queries: Arc<dyn InstrumentQueryRepository>,
        adapter: Arc<dyn InstrumentAdapter>,
    ) -> Self {
        Self { instruments, queries, adapter }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, instrument_id = %instrument_id))]
    pub async fn host_query(
        &self,
        tenant_id: &Id,
        instrument_id: &Id,
        patient_id: Option<&str>,
        sample_barcode: Option<&str>,
    ) -> IvdResult<Vec<OrderData>> {
        let query_timestamp = Utc::now();
        let mut instrument = self.instruments.get_by_id(tenant_id, instrument_id).await?;

        let outcome = self.adapter.get_pending_orders(tenant_id, instrument_id, patient_id, sample_barcode).await;
        let response_timestamp = Utc::now();

        match outcome {
            Ok(orders) => {
                let audit = InstrumentQuery::new(
                    tenant_id.clone(),
                    instrument_id.clone(),
                    query_timestamp,
                    response_timestamp,
                    orders.len() as i32,
                    ResponseStatus::Success,
                    patient_id.map(String::from),
                    sample_barcode.map(String::from),
                    None,
                );
                self.queries.create(audit).await?;
                instrument.record_successful_query();
                self.instruments.update(instrument).await?;
                Ok(orders)
            }
            Err(err) => {
                let audit = InstrumentQuery::new(
                    tenant_id.clone(),
                    instrument_id.clone(),
                    query_timestamp,
                    response_timestamp,
                    0,
                    ResponseStatus::Error,
                    patient_id.map(String::from),
                    sample_barcode.map(String::from),
                    Some(err.to_string()),
                );
                self.queries.create(audit).await?;
                instrument.record_query_failure(err.to_string());
                if instrument.status == ivd_domain::InstrumentStatus::Disconnected {
                    warn!(instrument_id = %instrument_id, "instrument disconnected after 3 consecutive query failures");
                }
                self.instruments.update(instrument).await?;
                Err(err)
            }
        }
    }

    #[instrument(skip(self, payload), fields(tenant_id = %tenant_id, instrument_id = %instrument_id))]
    pub async fn submit_result(
        &self,
        tenant_id: &Id,
        instrument_id: &Id,
        payload: ResultSubmission,
    ) -> IvdResult<SubmissionOutcome> {
        let outcome = self.adapter.process_result(tenant_id, instrument_id, payload).await?;
        let mut instrument = self.instruments.get_by_id(tenant_id, instrument_id).await?;
        instrument.record_successful_result();
        self.instruments.update(instrument).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository_adapter::RepositoryInstrumentAdapter;
    use ivd_domain::instrument::InstrumentType;
    use ivd_domain::settings::NewAutoVerificationSettings;
    use ivd_ports::instrument_adapter::ResultSubmission;
    use ivd_ports::memory::{
        InMemoryInstrumentQueryRepository, InMemoryInstrumentRepository, InMemoryOrderRepository,
        InMemoryResultRepository, InMemoryRuleRepository, InMemorySettingsRepository,
    };
    use ivd_ports::{RuleRepository, SettingsRepository};

    async fn harness() -> (InstrumentIntegrationService, Arc<InMemoryInstrumentRepository>, Id) {
        let instruments = InMemoryInstrumentRepository::new();
        let queries = InMemoryInstrumentQueryRepository::new();
        let orders = InMemoryOrderRepository::new();
        let results = InMemoryResultRepository::new();
        let settings = InMemorySettingsRepository::new();
        let rules = InMemoryRuleRepository::new();
        rules.seed_defaults(&"t1".to_string()).await.unwrap();
        settings
            .create(NewAutoVerificationSettings {
                tenant_id: "t1".into(),
                test_code: "GLU".into(),
                test_name: "Glucose".into(),
                reference_range_low: Some(70.0),
                reference_range_high: Some(100.0),
                critical_range_low: None,
                critical_range_high: None,
                instrument_flags_to_block: vec![],
                delta_check_threshold_percent: None,
                delta_check_lookback_days: Some(30),
            })
            .await
            .unwrap();
        let verification = Arc::new(ivd_verification::VerificationService::new(results.clone(), settings, rules));
        let adapter = Arc::new(RepositoryInstrumentAdapter::new(orders, results, verification));

        let instrument = instruments
            .create(ivd_domain::instrument::Instrument::new("t1".into(), "Analyzer 1".into(), InstrumentType::Chemistry, None))
            .await
            .unwrap();

        let service = InstrumentIntegrationService::new(instruments.clone(), queries, adapter);
        (service, instruments, instrument.id)
    }

    #[tokio::test]
    async fn successful_host_query_marks_instrument_active() {
        let (service, instruments, id) = harness().await;
        let orders = service.host_query(&"t1".to_string(), &id, None, None).await.unwrap();
        assert!(orders.is_empty());
        let instrument = instruments.get_by_id(&"t1".to_string(), &id).await.unwrap();
        assert_eq!(instrument.status, ivd_domain::InstrumentStatus::Active);
    }

    #[tokio::test]
    async fn duplicate_submission_is_idempotent() {
        let (service, _instruments, id) = harness().await;
        let payload = ResultSubmission {
            external_instrument_result_id: "ER-1".into(),
            test_code: "GLU".into(),
            value: Some("90".into()),
            reference_range_low: Some(70.0),
            reference_range_high: Some(100.0),
        };
        let first = service.submit_result(&"t1".to_string(), &id, payload.clone()).await.unwrap();
        let second = service.submit_result(&"t1".to_string(), &id, payload).await.unwrap();
        assert_eq!(first.result_id, second.result_id);
    }

    #[tokio::test]
    async fn empty_test_code_is_rejected() {
        let (service, _instruments, id) = harness().await;
        let payload = ResultSubmission {
            external_instrument_result_id: "ER-2".into(),
            test_code: "   ".into(),
            value: Some("90".into()),
            reference_range_low: None,
            reference_range_high: None,
        };
        let outcome = service.submit_result(&"t1".to_string(), &id, payload).await.unwrap();
        assert_eq!(outcome.status, ivd_ports::instrument_adapter::SubmissionStatus::Rejected);
    }
}
