//! In-memory repository realizations. These back local development and the
//! contract test suite — every method must observe the same tenant-scoping
//! and immutability rules as the Postgres realization, since both are
//! parameterized against identical contract tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use ivd_domain::order::{NewOrder, Order, OrderStatus};
use ivd_domain::result::{NewResult, UploadStatus, VerificationStatus};
use ivd_domain::review::{Review, ReviewState};
use ivd_domain::sample::{NewSample, Sample, SampleStatus};
use ivd_domain::settings::{
    AutoVerificationSettings, AutoVerificationSettingsUpdate, NewAutoVerificationSettings, RuleType,
    VerificationRule,
};
use ivd_domain::{
    Id, Instrument, InstrumentQuery as InstrumentQueryRow, InstrumentStatus, IvdError, IvdResult, LabResult,
    LisConfig, ResultDecision,
};

use crate::repositories::{
    InstrumentQueryRepository, InstrumentRepository, LisConfigRepository, OrderRepository, ResultDecisionRepository,
    ResultFilter, ResultRepository, ReviewFilter, ReviewRepository, RuleRepository, SampleRepository,
    SettingsRepository,
};

#[derive(Default)]
pub struct InMemorySampleRepository {
    rows: RwLock<HashMap<Id, Sample>>,
}

impl InMemorySampleRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SampleRepository for InMemorySampleRepository {
    async fn create(&self, input: NewSample) -> IvdResult<Sample> {
        let mut rows = self.rows.write().await;
        if rows
            .values()
            .any(|s| s.tenant_id == input.tenant_id && s.external_lis_id == input.external_lis_id)
        {
            return Err(IvdError::Conflict(format!(
                "sample with external_lis_id {} already exists",
                input.external_lis_id
            )));
        }
        let sample = Sample::new(input)?;
        rows.insert(sample.id.clone(), sample.clone());
        Ok(sample)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Sample> {
        self.rows
            .read()
            .await
            .get(id)
            .filter(|s| &s.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| IvdError::not_found("sample", id))
    }

    async fn get_by_external_lis_id(&self, tenant_id: &Id, external_lis_id: &str) -> IvdResult<Option<Sample>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|s| &s.tenant_id == tenant_id && s.external_lis_id == external_lis_id)
            .cloned())
    }

    async fn list(&self, tenant_id: &Id, status: Option<SampleStatus>) -> IvdResult<Vec<Sample>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|s| &s.tenant_id == tenant_id)
            .filter(|s| status.map(|want| s.status == want).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update(&self, sample: Sample) -> IvdResult<Sample> {
        let mut rows = self.rows.write().await;
        rows.insert(sample.id.clone(), sample.clone());
        Ok(sample)
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    rows: RwLock<HashMap<Id, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, input: NewOrder) -> IvdResult<Order> {
        let mut rows = self.rows.write().await;
        if rows
            .values()
            .any(|o| o.tenant_id == input.tenant_id && o.external_lis_order_id == input.external_lis_order_id)
        {
            return Err(IvdError::Conflict(format!(
                "order with external_lis_order_id {} already exists",
                input.external_lis_order_id
            )));
        }
        let order = Order::new(input);
        rows.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Order> {
        self.rows
            .read()
            .await
            .get(id)
            .filter(|o| &o.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| IvdError::not_found("order", id))
    }

    async fn list_pending_for_tenant(&self, tenant_id: &Id) -> IvdResult<Vec<Order>> {
        self.list_by_status(tenant_id, OrderStatus::Pending).await
    }

    async fn list_by_status(&self, tenant_id: &Id, status: OrderStatus) -> IvdResult<Vec<Order>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|o| &o.tenant_id == tenant_id && o.status == status)
            .cloned()
            .collect())
    }

    async fn update(&self, order: Order) -> IvdResult<Order> {
        let mut rows = self.rows.write().await;
        rows.insert(order.id.clone(), order.clone());
        Ok(order)
    }
}

#[derive(Default)]
pub struct InMemoryResultRepository {
    rows: RwLock<HashMap<Id, LabResult>>,
}

impl InMemoryResultRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ResultRepository for InMemoryResultRepository {
    async fn create(&self, input: NewResult) -> IvdResult<LabResult> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|r| {
            r.tenant_id == input.tenant_id && r.external_lis_result_id == input.external_lis_result_id
        }) {
            return Err(IvdError::Conflict(format!(
                "result with external_lis_result_id {} already exists",
                input.external_lis_result_id
            )));
        }
        let result = LabResult::new(input)?;
        rows.insert(result.id.clone(), result.clone());
        Ok(result)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<LabResult> {
        self.rows
            .read()
            .await
            .get(id)
            .filter(|r| &r.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| IvdError::not_found("result", id))
    }

    async fn get_by_external_id(&self, tenant_id: &Id, external_lis_result_id: &str) -> IvdResult<Option<LabResult>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|r| &r.tenant_id == tenant_id && r.external_lis_result_id == external_lis_result_id)
            .cloned())
    }

    async fn list(&self, tenant_id: &Id, filter: ResultFilter) -> IvdResult<Vec<LabResult>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| &r.tenant_id == tenant_id)
            .filter(|r| {
                filter
                    .verification_status
                    .map(|want| r.verification_status == want)
                    .unwrap_or(true)
            })
            .filter(|r| filter.upload_status.map(|want| r.upload_status == want).unwrap_or(true))
            .filter(|r| filter.sample_id.as_ref().map(|want| &r.sample_id == want).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn most_recent_prior(
        &self,
        tenant_id: &Id,
        sample_id: &Id,
        test_code: &str,
        exclude_id: &Id,
        lookback_days: i32,
        now: DateTime<Utc>,
    ) -> IvdResult<Option<LabResult>> {
        let cutoff = now - chrono::Duration::days(lookback_days as i64);
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| {
                &r.tenant_id == tenant_id
                    && &r.sample_id == sample_id
                    && r.test_code == test_code
                    && &r.id != exclude_id
                    && r.created_at >= cutoff
            })
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn list_upload_eligible(
        &self,
        tenant_id: &Id,
        upload_verified: bool,
        upload_rejected: bool,
        limit: i64,
    ) -> IvdResult<Vec<LabResult>> {
        let mut eligible: Vec<LabResult> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| &r.tenant_id == tenant_id)
            .filter(|r| r.upload_status == UploadStatus::Pending)
            .filter(|r| match r.verification_status {
                VerificationStatus::Verified => upload_verified,
                VerificationStatus::Rejected => upload_rejected,
                _ => false,
            })
            .cloned()
            .collect();
        eligible.sort_by_key(|r| r.created_at);
        eligible.truncate(limit.max(0) as usize);
        Ok(eligible)
    }

    async fn update(&self, result: LabResult) -> IvdResult<LabResult> {
        let mut rows = self.rows.write().await;
        let existing = rows
            .get(&result.id)
            .filter(|r| r.tenant_id == result.tenant_id)
            .ok_or_else(|| IvdError::not_found("result", &result.id))?;
        if existing.verification_status.is_terminal() && !result.differs_only_in_upload_fields(existing) {
            return Err(IvdError::Immutable(format!(
                "result {} is {:?} and cannot be modified",
                result.id, existing.verification_status
            )));
        }
        rows.insert(result.id.clone(), result.clone());
        Ok(result)
    }
}

#[derive(Default)]
pub struct InMemoryReviewRepository {
    rows: RwLock<HashMap<Id, Review>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn create(&self, tenant_id: Id, sample_id: Id, reviewer_user_id: Option<Id>) -> IvdResult<Review> {
        let mut rows = self.rows.write().await;
        if rows
            .values()
            .any(|r| r.tenant_id == tenant_id && r.sample_id == sample_id)
        {
            return Err(IvdError::Conflict(format!(
                "a review already exists for sample {sample_id}"
            )));
        }
        let review = Review::new(tenant_id, sample_id, reviewer_user_id);
        rows.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Review> {
        self.rows
            .read()
            .await
            .get(id)
            .filter(|r| &r.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| IvdError::not_found("review", id))
    }

    async fn get_by_sample_id(&self, tenant_id: &Id, sample_id: &Id) -> IvdResult<Option<Review>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|r| &r.tenant_id == tenant_id && &r.sample_id == sample_id)
            .cloned())
    }

    async fn list(&self, tenant_id: &Id, filter: ReviewFilter) -> IvdResult<Vec<Review>> {
        let mut rows: Vec<Review> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| &r.tenant_id == tenant_id)
            .filter(|r| filter.state.map(|want| r.state == want).unwrap_or(true))
            .filter(|r| {
                filter
                    .reviewer_user_id
                    .as_ref()
                    .map(|want| r.reviewer_user_id.as_ref() == Some(want))
                    .unwrap_or(true)
            })
            .filter(|r| !filter.escalated_only || r.state == ReviewState::Escalated)
            .filter(|r| filter.created_after.map(|after| r.created_at >= after).unwrap_or(true))
            .filter(|r| filter.created_before.map(|before| r.created_at <= before).unwrap_or(true))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if filter.limit > 0 {
            let offset = filter.offset.max(0) as usize;
            rows = rows.into_iter().skip(offset).take(filter.limit as usize).collect();
        }
        Ok(rows)
    }

    async fn update(&self, review: Review) -> IvdResult<Review> {
        let mut rows = self.rows.write().await;
        rows.insert(review.id.clone(), review.clone());
        Ok(review)
    }
}

#[derive(Default)]
pub struct InMemoryResultDecisionRepository {
    rows: RwLock<Vec<ResultDecision>>,
}

impl InMemoryResultDecisionRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ResultDecisionRepository for InMemoryResultDecisionRepository {
    async fn create(&self, decision: ResultDecision) -> IvdResult<ResultDecision> {
        let mut rows = self.rows.write().await;
        rows.push(decision.clone());
        Ok(decision)
    }

    async fn list_by_review(&self, tenant_id: &Id, review_id: &Id) -> IvdResult<Vec<ResultDecision>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|d| &d.tenant_id == tenant_id && &d.review_id == review_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemorySettingsRepository {
    rows: RwLock<HashMap<(Id, String), AutoVerificationSettings>>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn create(&self, input: NewAutoVerificationSettings) -> IvdResult<AutoVerificationSettings> {
        let mut rows = self.rows.write().await;
        let key = (input.tenant_id.clone(), input.test_code.clone());
        if rows.contains_key(&key) {
            return Err(IvdError::Conflict(format!(
                "settings for test_code {} already exist",
                input.test_code
            )));
        }
        let settings = AutoVerificationSettings::new(input)?;
        rows.insert(key, settings.clone());
        Ok(settings)
    }

    async fn get_by_test_code(&self, tenant_id: &Id, test_code: &str) -> IvdResult<Option<AutoVerificationSettings>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&(tenant_id.clone(), test_code.to_string()))
            .cloned())
    }

    async fn list(&self, tenant_id: &Id) -> IvdResult<Vec<AutoVerificationSettings>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|s| &s.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        tenant_id: &Id,
        test_code: &str,
        update: AutoVerificationSettingsUpdate,
    ) -> IvdResult<AutoVerificationSettings> {
        let mut rows = self.rows.write().await;
        let key = (tenant_id.clone(), test_code.to_string());
        let settings = rows
            .get_mut(&key)
            .ok_or_else(|| IvdError::not_found("settings", test_code))?;
        settings.apply_update(update)?;
        Ok(settings.clone())
    }

    async fn delete(&self, tenant_id: &Id, test_code: &str) -> IvdResult<()> {
        let mut rows = self.rows.write().await;
        rows.remove(&(tenant_id.clone(), test_code.to_string()))
            .map(|_| ())
            .ok_or_else(|| IvdError::not_found("settings", test_code))
    }
}

#[derive(Default)]
pub struct InMemoryRuleRepository {
    rows: RwLock<HashMap<(Id, RuleType), VerificationRule>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn list(&self, tenant_id: &Id) -> IvdResult<Vec<VerificationRule>> {
        let mut rules: Vec<VerificationRule> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| &r.tenant_id == tenant_id)
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }

    async fn get_by_type(&self, tenant_id: &Id, rule_type: RuleType) -> IvdResult<Option<VerificationRule>> {
        Ok(self.rows.read().await.get(&(tenant_id.clone(), rule_type)).cloned())
    }

    async fn upsert(&self, rule: VerificationRule) -> IvdResult<VerificationRule> {
        let mut rows = self.rows.write().await;
        rows.insert((rule.tenant_id.clone(), rule.rule_type), rule.clone());
        Ok(rule)
    }

    async fn seed_defaults(&self, tenant_id: &Id) -> IvdResult<Vec<VerificationRule>> {
        let mut rows = self.rows.write().await;
        let existing: Vec<VerificationRule> = rows
            .values()
            .filter(|r| &r.tenant_id == tenant_id)
            .cloned()
            .collect();
        if !existing.is_empty() {
            return Ok(existing);
        }
        let seeded = VerificationRule::default_seed(tenant_id);
        for rule in &seeded {
            rows.insert((rule.tenant_id.clone(), rule.rule_type), rule.clone());
        }
        Ok(seeded)
    }
}

#[derive(Default)]
pub struct InMemoryLisConfigRepository {
    rows: RwLock<HashMap<Id, LisConfig>>,
}

impl InMemoryLisConfigRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl LisConfigRepository for InMemoryLisConfigRepository {
    async fn create(&self, config: LisConfig) -> IvdResult<LisConfig> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&config.tenant_id) {
            return Err(IvdError::Conflict(format!(
                "LIS config already exists for tenant {}",
                config.tenant_id
            )));
        }
        rows.insert(config.tenant_id.clone(), config.clone());
        Ok(config)
    }

    async fn get_by_tenant(&self, tenant_id: &Id) -> IvdResult<Option<LisConfig>> {
        Ok(self.rows.read().await.get(tenant_id).cloned())
    }

    async fn update(&self, config: LisConfig) -> IvdResult<LisConfig> {
        let mut rows = self.rows.write().await;
        rows.insert(config.tenant_id.clone(), config.clone());
        Ok(config)
    }
}

#[derive(Default)]
pub struct InMemoryInstrumentRepository {
    rows: RwLock<HashMap<Id, Instrument>>,
}

impl InMemoryInstrumentRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl InstrumentRepository for InMemoryInstrumentRepository {
    async fn create(&self, instrument: Instrument) -> IvdResult<Instrument> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|i| i.api_token == instrument.api_token) {
            return Err(IvdError::Conflict("api_token already in use".to_string()));
        }
        if rows
            .values()
            .any(|i| i.tenant_id == instrument.tenant_id && i.name == instrument.name)
        {
            return Err(IvdError::Conflict(format!(
                "instrument named {} already exists for tenant",
                instrument.name
            )));
        }
        rows.insert(instrument.id.clone(), instrument.clone());
        Ok(instrument)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Instrument> {
        self.rows
            .read()
            .await
            .get(id)
            .filter(|i| &i.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| IvdError::not_found("instrument", id))
    }

    async fn get_by_api_token(&self, api_token: &str) -> IvdResult<Option<Instrument>> {
        Ok(self.rows.read().await.values().find(|i| i.api_token == api_token).cloned())
    }

    async fn get_by_name(&self, tenant_id: &Id, name: &str) -> IvdResult<Option<Instrument>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|i| &i.tenant_id == tenant_id && i.name == name)
            .cloned())
    }

    async fn list(&self, tenant_id: &Id, status: Option<InstrumentStatus>) -> IvdResult<Vec<Instrument>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|i| &i.tenant_id == tenant_id)
            .filter(|i| status.map(|want| i.status == want).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update(&self, instrument: Instrument) -> IvdResult<Instrument> {
        let mut rows = self.rows.write().await;
        rows.insert(instrument.id.clone(), instrument.clone());
        Ok(instrument)
    }

    async fn soft_delete(&self, tenant_id: &Id, id: &Id) -> IvdResult<()> {
        let mut rows = self.rows.write().await;
        let instrument = rows
            .get_mut(id)
            .filter(|i| &i.tenant_id == tenant_id)
            .ok_or_else(|| IvdError::not_found("instrument", id))?;
        instrument.deactivate();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInstrumentQueryRepository {
    rows: RwLock<Vec<InstrumentQueryRow>>,
}

impl InMemoryInstrumentQueryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl InstrumentQueryRepository for InMemoryInstrumentQueryRepository {
    async fn create(&self, query: InstrumentQueryRow) -> IvdResult<InstrumentQueryRow> {
        let mut rows = self.rows.write().await;
        rows.push(query.clone());
        Ok(query)
    }

    async fn list_by_instrument(&self, tenant_id: &Id, instrument_id: &Id, limit: i64) -> IvdResult<Vec<InstrumentQueryRow>> {
        let mut rows: Vec<InstrumentQueryRow> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|q| &q.tenant_id == tenant_id && &q.instrument_id == instrument_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.query_timestamp.cmp(&a.query_timestamp));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivd_domain::sample::NewSample;

    fn sample_input(tenant: &str, external_id: &str) -> NewSample {
        let now = Utc::now();
        NewSample {
            tenant_id: tenant.into(),
            external_lis_id: external_id.into(),
            patient_id: "p1".into(),
            specimen_type: "blood".into(),
            collection_date: now,
            received_date: now,
        }
    }

    #[tokio::test]
    async fn wrong_tenant_lookup_is_not_found() {
        let repo = InMemorySampleRepository::new();
        let sample = repo.create(sample_input("t1", "LIS-1")).await.unwrap();
        let err = repo.get_by_id(&"t2".to_string(), &sample.id).await.unwrap_err();
        assert!(matches!(err, IvdError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_external_lis_id_conflicts() {
        let repo = InMemorySampleRepository::new();
        repo.create(sample_input("t1", "LIS-1")).await.unwrap();
        let err = repo.create(sample_input("t1", "LIS-1")).await.unwrap_err();
        assert!(matches!(err, IvdError::Conflict(_)));
    }

    #[tokio::test]
    async fn rule_seeding_is_idempotent() {
        let repo = InMemoryRuleRepository::new();
        let first = repo.seed_defaults(&"t1".to_string()).await.unwrap();
        let second = repo.seed_defaults(&"t1".to_string()).await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].id, second[0].id);
    }

    fn result_input(tenant: &str, external_id: &str) -> NewResult {
        NewResult {
            tenant_id: tenant.into(),
            sample_id: "sample-1".into(),
            external_lis_result_id: external_id.into(),
            test_code: "GLU".into(),
            test_name: "Glucose".into(),
            value: Some("85".into()),
            unit: Some("mg/dL".into()),
            reference_range_low: Some(70.0),
            reference_range_high: Some(100.0),
            lis_flags: None,
        }
    }

    // Mirrors the contract the Postgres realization must also satisfy:
    // terminal results reject data edits but still accept upload bookkeeping.
    #[tokio::test]
    async fn update_rejects_edits_to_terminal_results() {
        let repo = InMemoryResultRepository::new();
        let mut result = repo.create(result_input("t1", "RES-1")).await.unwrap();
        result
            .set_verification_status(VerificationStatus::Verified, None)
            .unwrap();
        let result = repo.update(result).await.unwrap();

        let mut edited = result.clone();
        edited.test_name = "Changed".to_string();
        let err = repo.update(edited).await.unwrap_err();
        assert!(matches!(err, IvdError::Immutable(_)));
    }

    #[tokio::test]
    async fn update_allows_upload_bookkeeping_on_terminal_results() {
        let repo = InMemoryResultRepository::new();
        let mut result = repo.create(result_input("t1", "RES-1")).await.unwrap();
        result
            .set_verification_status(VerificationStatus::Verified, None)
            .unwrap();
        let result = repo.update(result).await.unwrap();

        let mut uploaded = result.clone();
        uploaded.mark_sent();
        let updated = repo.update(uploaded).await.unwrap();
        assert_eq!(updated.upload_status, UploadStatus::Sent);
    }

    #[tokio::test]
    async fn update_missing_result_is_not_found() {
        let repo = InMemoryResultRepository::new();
        let result = LabResult::new(result_input("t1", "RES-1")).unwrap();
        let err = repo.update(result).await.unwrap_err();
        assert!(matches!(err, IvdError::NotFound(_)));
    }
}
