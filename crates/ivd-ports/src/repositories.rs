//! Repository ports: abstract, tenant-scoped persistence for every domain
//! entity. Every method is implicitly filtered by `tenant_id`; a lookup with
//! the wrong tenant must behave identically to "not found".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::order::{NewOrder, Order, OrderStatus};
use ivd_domain::result::{NewResult, UploadStatus, VerificationStatus};
use ivd_domain::review::{Review, ReviewState};
use ivd_domain::sample::{NewSample, Sample, SampleStatus};
use ivd_domain::settings::{
    AutoVerificationSettings, AutoVerificationSettingsUpdate, NewAutoVerificationSettings, RuleType,
    VerificationRule,
};
use ivd_domain::{
    Id, Instrument, InstrumentQuery, InstrumentStatus, IvdResult, LabResult, LisConfig, ResultDecision,
};

#[async_trait]
pub trait SampleRepository: Send + Sync {
    async fn create(&self, input: NewSample) -> IvdResult<Sample>;
    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Sample>;
    async fn get_by_external_lis_id(&self, tenant_id: &Id, external_lis_id: &str) -> IvdResult<Option<Sample>>;
    async fn list(&self, tenant_id: &Id, status: Option<SampleStatus>) -> IvdResult<Vec<Sample>>;
    async fn update(&self, sample: Sample) -> IvdResult<Sample>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, input: NewOrder) -> IvdResult<Order>;
    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Order>;
    async fn list_pending_for_tenant(&self, tenant_id: &Id) -> IvdResult<Vec<Order>>;
    async fn list_by_status(&self, tenant_id: &Id, status: OrderStatus) -> IvdResult<Vec<Order>>;
    async fn update(&self, order: Order) -> IvdResult<Order>;
}

#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub verification_status: Option<VerificationStatus>,
    pub upload_status: Option<UploadStatus>,
    pub sample_id: Option<Id>,
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn create(&self, input: NewResult) -> IvdResult<LabResult>;
    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<LabResult>;
    async fn get_by_external_id(&self, tenant_id: &Id, external_lis_result_id: &str) -> IvdResult<Option<LabResult>>;
    async fn list(&self, tenant_id: &Id, filter: ResultFilter) -> IvdResult<Vec<LabResult>>;
    /// Most recent prior result for `(sample_id, test_code)`, excluding `exclude_id`,
    /// created within `lookback_days` of `now`. Used by the delta-check rule.
    async fn most_recent_prior(
        &self,
        tenant_id: &Id,
        sample_id: &Id,
        test_code: &str,
        exclude_id: &Id,
        lookback_days: i32,
        now: DateTime<Utc>,
    ) -> IvdResult<Option<LabResult>>;
    /// Results eligible for upload per the tenant's upload settings, oldest-first.
    async fn list_upload_eligible(
        &self,
        tenant_id: &Id,
        upload_verified: bool,
        upload_rejected: bool,
        limit: i64,
    ) -> IvdResult<Vec<LabResult>>;
    /// Fails with `IvdError::Immutable` if the stored result's verification
    /// status is terminal and the update attempts to change anything other
    /// than upload bookkeeping.
    async fn update(&self, result: LabResult) -> IvdResult<LabResult>;
}

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub state: Option<ReviewState>,
    pub reviewer_user_id: Option<Id>,
    pub escalated_only: bool,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, tenant_id: Id, sample_id: Id, reviewer_user_id: Option<Id>) -> IvdResult<Review>;
    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Review>;
    async fn get_by_sample_id(&self, tenant_id: &Id, sample_id: &Id) -> IvdResult<Option<Review>>;
    /// Stable pagination by `created_at` descending.
    async fn list(&self, tenant_id: &Id, filter: ReviewFilter) -> IvdResult<Vec<Review>>;
    async fn update(&self, review: Review) -> IvdResult<Review>;
}

#[async_trait]
pub trait ResultDecisionRepository: Send + Sync {
    async fn create(&self, decision: ResultDecision) -> IvdResult<ResultDecision>;
    async fn list_by_review(&self, tenant_id: &Id, review_id: &Id) -> IvdResult<Vec<ResultDecision>>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn create(&self, input: NewAutoVerificationSettings) -> IvdResult<AutoVerificationSettings>;
    async fn get_by_test_code(&self, tenant_id: &Id, test_code: &str) -> IvdResult<Option<AutoVerificationSettings>>;
    async fn list(&self, tenant_id: &Id) -> IvdResult<Vec<AutoVerificationSettings>>;
    async fn update(
        &self,
        tenant_id: &Id,
        test_code: &str,
        update: AutoVerificationSettingsUpdate,
    ) -> IvdResult<AutoVerificationSettings>;
    async fn delete(&self, tenant_id: &Id, test_code: &str) -> IvdResult<()>;
}

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn list(&self, tenant_id: &Id) -> IvdResult<Vec<VerificationRule>>;
    async fn get_by_type(&self, tenant_id: &Id, rule_type: RuleType) -> IvdResult<Option<VerificationRule>>;
    async fn upsert(&self, rule: VerificationRule) -> IvdResult<VerificationRule>;
    /// Seed the default rule set for a tenant. Idempotent: if rules already
    /// exist, returns them unchanged rather than re-seeding.
    async fn seed_defaults(&self, tenant_id: &Id) -> IvdResult<Vec<VerificationRule>>;
}

#[async_trait]
pub trait LisConfigRepository: Send + Sync {
    async fn create(&self, config: LisConfig) -> IvdResult<LisConfig>;
    async fn get_by_tenant(&self, tenant_id: &Id) -> IvdResult<Option<LisConfig>>;
    async fn update(&self, config: LisConfig) -> IvdResult<LisConfig>;
}

#[async_trait]
pub trait InstrumentRepository: Send + Sync {
    async fn create(&self, instrument: Instrument) -> IvdResult<Instrument>;
    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Instrument>;
    async fn get_by_api_token(&self, api_token: &str) -> IvdResult<Option<Instrument>>;
    async fn get_by_name(&self, tenant_id: &Id, name: &str) -> IvdResult<Option<Instrument>>;
    async fn list(&self, tenant_id: &Id, status: Option<InstrumentStatus>) -> IvdResult<Vec<Instrument>>;
    async fn update(&self, instrument: Instrument) -> IvdResult<Instrument>;
    /// Soft-delete: flips status to `inactive` rather than removing the row.
    async fn soft_delete(&self, tenant_id: &Id, id: &Id) -> IvdResult<()>;
}

#[async_trait]
pub trait InstrumentQueryRepository: Send + Sync {
    async fn create(&self, query: InstrumentQuery) -> IvdResult<InstrumentQuery>;
    async fn list_by_instrument(&self, tenant_id: &Id, instrument_id: &Id, limit: i64) -> IvdResult<Vec<InstrumentQuery>>;
}
