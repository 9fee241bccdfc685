//! Settings Service: thin orchestration over per-test-code auto-verification
//! settings and per-tenant rule enablement, with default-rule seeding.

use std::sync::Arc;

use ivd_domain::settings::{AutoVerificationSettings, AutoVerificationSettingsUpdate, NewAutoVerificationSettings, RuleType, VerificationRule};
use ivd_domain::{Id, IvdError, IvdResult};
use ivd_ports::{RuleRepository, SettingsRepository};
use tracing::instrument;

pub struct SettingsService {
    settings: Arc<dyn SettingsRepository>,
    rules: Arc<dyn RuleRepository>,
}

impl SettingsService {
    pub fn new(settings: Arc<dyn SettingsRepository>, rules: Arc<dyn RuleRepository>) -> Self {
        Self { settings, rules }
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, test_code = %input.test_code))]
    pub async fn create(&self, input: NewAutoVerificationSettings) -> IvdResult<AutoVerificationSettings> {
        if self.settings.get_by_test_code(&input.tenant_id, &input.test_code).await?.is_some() {
            return Err(IvdError::Conflict(format!(
                "settings already exist for test_code '{}'",
                input.test_code
            )));
        }
        self.settings.create(input).await
    }

    pub async fn get(&self, tenant_id: &Id, test_code: &str) -> IvdResult<AutoVerificationSettings> {
        self.settings
            .get_by_test_code(tenant_id, test_code)
            .await?
            .ok_or_else(|| IvdError::not_found("settings", test_code))
    }

    pub async fn list(&self, tenant_id: &Id) -> IvdResult<Vec<AutoVerificationSettings>> {
        self.settings.list(tenant_id).await
    }

    pub async fn update(
        &self,
        tenant_id: &Id,
        test_code: &str,
        update: AutoVerificationSettingsUpdate,
    ) -> IvdResult<AutoVerificationSettings> {
        self.settings.update(tenant_id, test_code, update).await
    }

    pub async fn delete(&self, tenant_id: &Id, test_code: &str) -> IvdResult<()> {
        self.settings.delete(tenant_id, test_code).await
    }

    pub async fn list_rules(&self, tenant_id: &Id) -> IvdResult<Vec<VerificationRule>> {
        self.rules.list(tenant_id).await
    }

    /// Seeds the default rule set on first use of a tenant; a no-op if rules
    /// already exist.
    pub async fn ensure_default_rules(&self, tenant_id: &Id) -> IvdResult<Vec<VerificationRule>> {
        self.rules.seed_defaults(tenant_id).await
    }

    async fn set_rule_enabled(&self, tenant_id: &Id, rule_type_str: &str, enabled: bool) -> IvdResult<VerificationRule> {
        let rule_type = RuleType::parse(rule_type_str)
            .ok_or_else(|| IvdError::InvalidConfiguration(format!("unknown rule_type '{rule_type_str}'")))?;
        let mut rule = self
            .rules
            .get_by_type(tenant_id, rule_type)
            .await?
            .ok_or_else(|| IvdError::not_found("rule", rule_type_str))?;
        rule.set_enabled(enabled);
        self.rules.upsert(rule).await
    }

    pub async fn enable_rule(&self, tenant_id: &Id, rule_type: &str) -> IvdResult<VerificationRule> {
        self.set_rule_enabled(tenant_id, rule_type, true).await
    }

    pub async fn disable_rule(&self, tenant_id: &Id, rule_type: &str) -> IvdResult<VerificationRule> {
        self.set_rule_enabled(tenant_id, rule_type, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivd_ports::memory::{InMemoryRuleRepository, InMemorySettingsRepository};

    fn base_input() -> NewAutoVerificationSettings {
        NewAutoVerificationSettings {
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
        }
    }

    fn harness() -> SettingsService {
        SettingsService::new(InMemorySettingsRepository::new(), InMemoryRuleRepository::new())
    }

    #[tokio::test]
    async fn duplicate_test_code_conflicts() {
        let service = harness();
        service.create(base_input()).await.unwrap();
        let err = service.create(base_input()).await.unwrap_err();
        assert!(matches!(err, IvdError::Conflict(_)));
    }

    #[tokio::test]
    async fn seeding_is_idempotent_through_the_service() {
        let service = harness();
        let first = service.ensure_default_rules(&"t1".to_string()).await.unwrap();
        let second = service.ensure_default_rules(&"t1".to_string()).await.unwrap();
        assert_eq!(first.len(), second.len());
    }

    #[tokio::test]
    async fn unknown_rule_type_is_invalid_configuration() {
        let service = harness();
        service.ensure_default_rules(&"t1".to_string()).await.unwrap();
        let err = service.enable_rule(&"t1".to_string(), "made_up_rule").await.unwrap_err();
        assert!(matches!(err, IvdError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn disable_then_enable_round_trips() {
        let service = harness();
        service.ensure_default_rules(&"t1".to_string()).await.unwrap();
        let rule = service.disable_rule(&"t1".to_string(), "delta_check").await.unwrap();
        assert!(!rule.enabled);
        let rule = service.enable_rule(&"t1".to_string(), "delta_check").await.unwrap();
        assert!(rule.enabled);
    }
}
