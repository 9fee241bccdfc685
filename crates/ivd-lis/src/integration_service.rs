//! LIS Integration Service: the pull (retrieval) and push (upload) sides
//! of the bidirectional LIS contract, plus idempotent ingestion.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use ivd_domain::result::NewResult;
use ivd_domain::sample::NewSample;
use ivd_domain::{Id, IvdResult};
use ivd_ports::lis_adapter::{ResultPayload, SampleData};
use ivd_ports::{LisAdapter, LisConfigRepository, ResultRepository, SampleRepository};
use ivd_verification::VerificationService;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

type TenantRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-tenant token bucket honoring `LisConfig.upload_rate_limit` (results
/// per minute). Rebuilt whenever the configured rate changes.
struct UploadRateLimiters {
    by_tenant: Mutex<HashMap<Id, (i32, Arc<TenantRateLimiter>)>>,
}

impl UploadRateLimiters {
    fn new() -> Self {
        Self { by_tenant: Mutex::new(HashMap::new()) }
    }

    async fn limiter_for(&self, tenant_id: &Id, rate_per_minute: i32) -> Arc<TenantRateLimiter> {
        let mut by_tenant = self.by_tenant.lock().await;
        if let Some((rate, limiter)) = by_tenant.get(tenant_id) {
            if *rate == rate_per_minute {
                return limiter.clone();
            }
        }
        let quota = Quota::per_minute(NonZeroU32::new(rate_per_minute.max(1) as u32).unwrap());
        let limiter = Arc::new(GovernorRateLimiter::direct(quota));
        by_tenant.insert(tenant_id.clone(), (rate_per_minute, limiter.clone()));
        limiter
    }

    /// Wait for one token from the tenant's bucket, polling at a fixed
    /// interval the way a token-bucket wait loop does when no reservation
    /// API is available.
    async fn acquire(&self, tenant_id: &Id, rate_per_minute: i32) {
        let limiter = self.limiter_for(tenant_id, rate_per_minute).await;
        loop {
            match limiter.check() {
                Ok(_) => return,
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalOutcome {
    pub samples_ingested: usize,
    pub results_ingested: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadRunOutcome {
    pub total_sent: u32,
    pub total_failed: u32,
}

pub struct LisIntegrationService {
    samples: Arc<dyn SampleRepository>,
    results: Arc<dyn ResultRepository>,
    configs: Arc<dyn LisConfigRepository>,
    adapter: Arc<dyn LisAdapter>,
    verification: Arc<VerificationService>,
    rate_limiters: UploadRateLimiters,
}

impl LisIntegrationService {
    pub fn new(
        samples: Arc<dyn SampleRepository>,
        results: Arc<dyn ResultRepository>,
        configs: Arc<dyn LisConfigRepository>,
        adapter: Arc<dyn LisAdapter>,
        verification: Arc<VerificationService>,
    ) -> Self {
        Self { samples, results, configs, adapter, verification, rate_limiters: UploadRateLimiters::new() }
    }

    /// One pull-loop tick: fetch new samples since the last successful
    /// retrieval, upsert them by `(tenant_id, external_lis_id)`, then pull
    /// and create each sample's results (idempotent on duplicate external
    /// ids). Applies the 3-strike connection policy on failure.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn retrieve(&self, tenant_id: &Id) -> IvdResult<RetrievalOutcome> {
        let mut config = self
            .configs
            .get_by_tenant(tenant_id)
            .await?
            .ok_or_else(|| ivd_domain::IvdError::not_found("LIS config", tenant_id))?;

        let outcome = self.do_retrieve(tenant_id, config.last_successful_retrieval_at).await;
        match outcome {
            Ok(result) => {
                config.record_successful_retrieval();
                self.configs.update(config).await?;
                Ok(result)
            }
            Err(err) => {
                config.record_retrieval_failure();
                self.configs.update(config).await?;
                error!(error = %err, "LIS retrieval failed");
                Err(err)
            }
        }
    }

    async fn do_retrieve(
        &self,
        tenant_id: &Id,
        since: Option<chrono::DateTime<Utc>>,
    ) -> IvdResult<RetrievalOutcome> {
        let mut outcome = RetrievalOutcome::default();
        let samples = self.adapter.get_samples(since).await?;
        for sample_data in samples {
            let was_new = self
                .samples
                .get_by_external_lis_id(tenant_id, &sample_data.external_lis_id)
                .await?
                .is_none();
            let sample = self.upsert_sample(tenant_id, sample_data.clone()).await?;
            if was_new {
                outcome.samples_ingested += 1;
            }
            let results = self.adapter.get_results(&sample_data.external_lis_id).await?;
            for result_data in results {
                if self
                    .results
                    .get_by_external_id(tenant_id, &result_data.external_lis_result_id)
                    .await?
                    .is_some()
                {
                    continue; // duplicate by external id: silent no-op
                }
                let created = self
                    .results
                    .create(NewResult {
                        tenant_id: tenant_id.clone(),
                        sample_id: sample.id.clone(),
                        external_lis_result_id: result_data.external_lis_result_id,
                        test_code: result_data.test_code,
                        test_name: result_data.test_name,
                        value: result_data.value,
                        unit: result_data.unit,
                        reference_range_low: result_data.reference_range_low,
                        reference_range_high: result_data.reference_range_high,
                        lis_flags: result_data.lis_flags,
                    })
                    .await?;
                self.verification.verify_result(tenant_id, &created.id).await?;
                outcome.results_ingested += 1;
            }
        }
        Ok(outcome)
    }

    async fn upsert_sample(&self, tenant_id: &Id, data: SampleData) -> IvdResult<ivd_domain::Sample> {
        if let Some(existing) = self.samples.get_by_external_lis_id(tenant_id, &data.external_lis_id).await? {
            return Ok(existing);
        }
        self.samples
            .create(NewSample {
                tenant_id: tenant_id.clone(),
                external_lis_id: data.external_lis_id,
                patient_id: data.patient_id,
                specimen_type: data.specimen_type,
                collection_date: data.collection_date,
                received_date: data.received_date,
            })
            .await
    }

    /// One upload-loop tick: send up to `upload_batch_size` oldest-eligible
    /// results, apply the adapter's per-id sent/failed outcome, and record
    /// aggregate success/failure on the LISConfig.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn upload_eligible(&self, tenant_id: &Id) -> IvdResult<UploadRunOutcome> {
        let mut config = self
            .configs
            .get_by_tenant(tenant_id)
            .await?
            .ok_or_else(|| ivd_domain::IvdError::not_found("LIS config", tenant_id))?;

        let eligible = self
            .results
            .list_upload_eligible(
                tenant_id,
                config.upload_verified_results,
                config.upload_rejected_results,
                config.upload_batch_size as i64,
            )
            .await?;
        if eligible.is_empty() {
            return Ok(UploadRunOutcome::default());
        }

        let mut payloads = Vec::with_capacity(eligible.len());
        for r in &eligible {
            self.rate_limiters.acquire(tenant_id, config.upload_rate_limit).await;
            payloads.push(ResultPayload {
                external_lis_result_id: r.external_lis_result_id.clone(),
                test_code: r.test_code.clone(),
                value: r.value.clone(),
                verification_status: format!("{:?}", r.verification_status).to_lowercase(),
            });
        }

        let send_outcome = self.adapter.send_results(payloads).await?;
        let failed_ids: std::collections::HashSet<String> = send_outcome
            .failed_result_ids
            .iter()
            .cloned()
            .collect();

        for mut result in eligible {
            if failed_ids.contains(&result.external_lis_result_id) {
                result.mark_upload_failed("LIS adapter reported failure");
            } else {
                result.mark_sent();
            }
            self.results.update(result).await?;
        }

        if send_outcome.total_failed > 0 {
            config.record_upload_failure();
        } else {
            config.record_successful_upload();
        }
        self.configs.update(config).await?;

        info!(sent = send_outcome.total_sent, failed = send_outcome.total_failed, "LIS upload run complete");
        Ok(UploadRunOutcome { total_sent: send_outcome.total_sent, total_failed: send_outcome.total_failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivd_domain::settings::{NewAutoVerificationSettings};
    use ivd_ports::lis_adapter::ResultData;
    use ivd_ports::memory::{InMemoryLisConfigRepository, InMemoryResultRepository, InMemoryRuleRepository, InMemorySampleRepository, InMemorySettingsRepository};
    use ivd_ports::{RuleRepository, SettingsRepository};

    async fn harness() -> (LisIntegrationService, Arc<InMemoryLisConfigRepository>, Arc<InMemoryResultRepository>) {
        let samples = InMemorySampleRepository::new();
        let results = InMemoryResultRepository::new();
        let configs = InMemoryLisConfigRepository::new();
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

        let mut adapter = ivd_ports::MockLisAdapter::default();
        adapter.samples.push(SampleData {
            external_lis_id: "LIS-1".into(),
            patient_id: "p1".into(),
            specimen_type: "blood".into(),
            collection_date: Utc::now(),
            received_date: Utc::now(),
        });
        adapter.results.insert(
            "LIS-1".into(),
            vec![ResultData {
                external_lis_result_id: "R1".into(),
                test_code: "GLU".into(),
                test_name: "Glucose".into(),
                value: Some("85".into()),
                unit: None,
                reference_range_low: Some(70.0),
                reference_range_high: Some(100.0),
                lis_flags: None,
            }],
        );
        let adapter = Arc::new(adapter);

        let service = LisIntegrationService::new(samples, results.clone(), configs.clone(), adapter, verification);
        (service, configs, results)
    }

    #[tokio::test]
    async fn rate_limiter_admits_up_to_burst_without_waiting() {
        let limiters = UploadRateLimiters::new();
        let tenant = "t1".to_string();
        let start = std::time::Instant::now();
        for _ in 0..5 {
            limiters.acquire(&tenant, 5).await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn retrieval_ingests_samples_and_auto_verifies_results() {
        let (service, configs, results) = harness().await;
        configs
            .create(ivd_domain::LisConfig::new(ivd_domain::lis_config::NewLisConfig {
                tenant_id: "t1".into(),
                lis_type: ivd_domain::LisType::Generic,
                integration_model: ivd_domain::IntegrationModel::Pull,
                api_endpoint_url: Some("https://lis.example.test".into()),
                api_auth_credentials: None,
                pull_interval_minutes: 5,
            }).unwrap())
            .await
            .unwrap();

        let outcome = service.retrieve(&"t1".to_string()).await.unwrap();
        assert_eq!(outcome.samples_ingested, 1);
        assert_eq!(outcome.results_ingested, 1);
        let all = results.list(&"t1".to_string(), Default::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].verification_status, ivd_domain::VerificationStatus::Verified);
    }
}
