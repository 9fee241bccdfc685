//! Verification Service: wraps the engine and persists its decisions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ivd_domain::result::VerificationStatus;
use ivd_domain::{Id, IvdError, IvdResult, LabResult, VerificationMethod};
use ivd_ports::{ResultFilter, ResultRepository, RuleRepository, SettingsRepository};
use tracing::{info, instrument};

use crate::engine::{verify, VerificationDecision};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub total: usize,
    pub verified: usize,
    pub needs_review: usize,
    pub errors: usize,
}

pub struct VerificationService {
    results: Arc<dyn ResultRepository>,
    settings: Arc<dyn SettingsRepository>,
    rules: Arc<dyn RuleRepository>,
}

impl VerificationService {
    pub fn new(
        results: Arc<dyn ResultRepository>,
        settings: Arc<dyn SettingsRepository>,
        rules: Arc<dyn RuleRepository>,
    ) -> Self {
        Self { results, settings, rules }
    }

    /// Run the engine for one result and persist its decision. Fails with
    /// `IvdError::Immutable` if the result is already `verified`/`rejected`.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, result_id = %result_id))]
    pub async fn verify_result(&self, tenant_id: &Id, result_id: &Id) -> IvdResult<(LabResult, VerificationDecision)> {
        let mut result = self.results.get_by_id(tenant_id, result_id).await?;
        let decision = self.evaluate(tenant_id, &result).await?;

        if decision.can_auto_verify {
            result.set_verification_status(VerificationStatus::Verified, Some(VerificationMethod::Auto))?;
        } else {
            result.set_verification_status(VerificationStatus::NeedsReview, None)?;
        }
        let updated = self.results.update(result).await?;
        info!(can_auto_verify = decision.can_auto_verify, "result verified");
        Ok((updated, decision))
    }

    pub async fn verify_batch(&self, tenant_id: &Id, result_ids: &[Id]) -> IvdResult<BatchOutcome> {
        let mut outcome = BatchOutcome { total: result_ids.len(), ..Default::default() };
        for result_id in result_ids {
            match self.verify_result(tenant_id, result_id).await {
                Ok((_, decision)) => {
                    if decision.can_auto_verify {
                        outcome.verified += 1;
                    } else {
                        outcome.needs_review += 1;
                    }
                }
                Err(_) => outcome.errors += 1,
            }
        }
        Ok(outcome)
    }

    pub async fn verify_sample_results(&self, tenant_id: &Id, sample_id: &Id) -> IvdResult<BatchOutcome> {
        let pending = self
            .results
            .list(
                tenant_id,
                ResultFilter {
                    verification_status: Some(VerificationStatus::Pending),
                    sample_id: Some(sample_id.clone()),
                    ..Default::default()
                },
            )
            .await?;
        let ids: Vec<Id> = pending.into_iter().map(|r| r.id).collect();
        self.verify_batch(tenant_id, &ids).await
    }

    async fn evaluate(&self, tenant_id: &Id, result: &LabResult) -> IvdResult<VerificationDecision> {
        let settings = self.settings.get_by_test_code(tenant_id, &result.test_code).await?;
        let Some(settings) = settings else {
            return Ok(VerificationDecision {
                can_auto_verify: false,
                failed_rules: vec!["settings_missing".to_string()],
                failure_reasons: vec![format!("no settings configured for test_code {}", result.test_code)],
            });
        };
        let rules = self.rules.list(tenant_id).await?;
        let prior = self
            .results
            .most_recent_prior(
                tenant_id,
                &result.sample_id,
                &result.test_code,
                &result.id,
                settings.delta_check_lookback_days,
                Utc::now(),
            )
            .await?;
        Ok(verify(result, Some(&settings), &rules, prior.as_ref()))
    }
}

/// Returns the error kind this service raises if a result is already terminal —
/// exposed so callers (the review workflow) can match on it without importing
/// `ivd_domain::IvdError` directly.
pub fn is_already_verified(err: &IvdError) -> bool {
    matches!(err, IvdError::Immutable(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivd_domain::result::NewResult;
    use ivd_domain::settings::NewAutoVerificationSettings;
    use ivd_ports::memory::{InMemoryResultRepository, InMemoryRuleRepository, InMemorySettingsRepository};

    async fn service() -> (VerificationService, Arc<InMemoryResultRepository>, Arc<InMemorySettingsRepository>) {
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
                critical_range_low: Some(40.0),
                critical_range_high: Some(400.0),
                instrument_flags_to_block: vec!["C".into()],
                delta_check_threshold_percent: Some(10.0),
                delta_check_lookback_days: Some(30),
            })
            .await
            .unwrap();
        let service = VerificationService::new(results.clone(), settings.clone(), rules);
        (service, results, settings)
    }

    #[tokio::test]
    async fn happy_path_auto_verifies_and_persists() {
        let (service, results, _settings) = service().await;
        let result = results
            .create(NewResult {
                tenant_id: "t1".into(),
                sample_id: "s1".into(),
                external_lis_result_id: "R1".into(),
                test_code: "GLU".into(),
                test_name: "Glucose".into(),
                value: Some("85".into()),
                unit: None,
                reference_range_low: Some(70.0),
                reference_range_high: Some(100.0),
                lis_flags: None,
            })
            .await
            .unwrap();
        let (updated, decision) = service.verify_result(&"t1".to_string(), &result.id).await.unwrap();
        assert!(decision.can_auto_verify);
        assert_eq!(updated.verification_status, VerificationStatus::Verified);
    }

    #[tokio::test]
    async fn reverifying_terminal_result_fails() {
        let (service, results, _settings) = service().await;
        let result = results
            .create(NewResult {
                tenant_id: "t1".into(),
                sample_id: "s1".into(),
                external_lis_result_id: "R2".into(),
                test_code: "GLU".into(),
                test_name: "Glucose".into(),
                value: Some("85".into()),
                unit: None,
                reference_range_low: Some(70.0),
                reference_range_high: Some(100.0),
                lis_flags: None,
            })
            .await
            .unwrap();
        service.verify_result(&"t1".to_string(), &result.id).await.unwrap();
        let err = service.verify_result(&"t1".to_string(), &result.id).await.unwrap_err();
        assert!(is_already_verified(&err));
    }
}
