use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::settings::{
    AutoVerificationSettings, AutoVerificationSettingsUpdate, NewAutoVerificationSettings, RuleType, VerificationRule,
};
use ivd_domain::{Id, IvdError, IvdResult};
use ivd_ports::{RuleRepository, SettingsRepository};
use sqlx::{FromRow, PgPool};

use super::util::map_err;

#[derive(FromRow)]
struct SettingsRow {
    id: String,
    tenant_id: String,
    test_code: String,
    test_name: String,
    reference_range_low: Option<f64>,
    reference_range_high: Option<f64>,
    critical_range_low: Option<f64>,
    critical_range_high: Option<f64>,
    instrument_flags_to_block: Vec<String>,
    delta_check_threshold_percent: Option<f64>,
    delta_check_lookback_days: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SettingsRow> for AutoVerificationSettings {
    fn from(row: SettingsRow) -> Self {
        AutoVerificationSettings {
            id: row.id,
            tenant_id: row.tenant_id,
            test_code: row.test_code,
            test_name: row.test_name,
            reference_range_low: row.reference_range_low,
            reference_range_high: row.reference_range_high,
            critical_range_low: row.critical_range_low,
            critical_range_high: row.critical_range_high,
            instrument_flags_to_block: row.instrument_flags_to_block,
            delta_check_threshold_percent: row.delta_check_threshold_percent,
            delta_check_lookback_days: row.delta_check_lookback_days,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn create(&self, input: NewAutoVerificationSettings) -> IvdResult<AutoVerificationSettings> {
        let settings = AutoVerificationSettings::new(input)?;
        sqlx::query(
            "INSERT INTO auto_verification_settings
                (id, tenant_id, test_code, test_name, reference_range_low, reference_range_high,
                 critical_range_low, critical_range_high, instrument_flags_to_block,
                 delta_check_threshold_percent, delta_check_lookback_days, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&settings.id)
        .bind(&settings.tenant_id)
        .bind(&settings.test_code)
        .bind(&settings.test_name)
        .bind(settings.reference_range_low)
        .bind(settings.reference_range_high)
        .bind(settings.critical_range_low)
        .bind(settings.critical_range_high)
        .bind(&settings.instrument_flags_to_block)
        .bind(settings.delta_check_threshold_percent)
        .bind(settings.delta_check_lookback_days)
        .bind(settings.created_at)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("settings", e))?;
        Ok(settings)
    }

    async fn get_by_test_code(&self, tenant_id: &Id, test_code: &str) -> IvdResult<Option<AutoVerificationSettings>> {
        let row: Option<SettingsRow> =
            sqlx::query_as("SELECT * FROM auto_verification_settings WHERE tenant_id = $1 AND test_code = $2")
                .bind(tenant_id)
                .bind(test_code)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_err("settings", e))?;
        Ok(row.map(AutoVerificationSettings::from))
    }

    async fn list(&self, tenant_id: &Id) -> IvdResult<Vec<AutoVerificationSettings>> {
        let rows: Vec<SettingsRow> =
            sqlx::query_as("SELECT * FROM auto_verification_settings WHERE tenant_id = $1 ORDER BY test_code")
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_err("settings", e))?;
        Ok(rows.into_iter().map(AutoVerificationSettings::from).collect())
    }

    async fn update(
        &self,
        tenant_id: &Id,
        test_code: &str,
        update: AutoVerificationSettingsUpdate,
    ) -> IvdResult<AutoVerificationSettings> {
        let mut settings = self
            .get_by_test_code(tenant_id, test_code)
            .await?
            .ok_or_else(|| IvdError::not_found("settings", test_code))?;
        settings.apply_update(update)?;
        sqlx::query(
            "UPDATE auto_verification_settings
             SET test_name = $1, reference_range_low = $2, reference_range_high = $3, critical_range_low = $4,
                 critical_range_high = $5, instrument_flags_to_block = $6, delta_check_threshold_percent = $7,
                 delta_check_lookback_days = $8, updated_at = $9
             WHERE tenant_id = $10 AND test_code = $11",
        )
        .bind(&settings.test_name)
        .bind(settings.reference_range_low)
        .bind(settings.reference_range_high)
        .bind(settings.critical_range_low)
        .bind(settings.critical_range_high)
        .bind(&settings.instrument_flags_to_block)
        .bind(settings.delta_check_threshold_percent)
        .bind(settings.delta_check_lookback_days)
        .bind(settings.updated_at)
        .bind(tenant_id)
        .bind(test_code)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("settings", e))?;
        Ok(settings)
    }

    async fn delete(&self, tenant_id: &Id, test_code: &str) -> IvdResult<()> {
        let outcome = sqlx::query("DELETE FROM auto_verification_settings WHERE tenant_id = $1 AND test_code = $2")
            .bind(tenant_id)
            .bind(test_code)
            .execute(&self.pool)
            .await
            .map_err(|e| map_err("settings", e))?;
        if outcome.rows_affected() == 0 {
            return Err(IvdError::not_found("settings", test_code));
        }
        Ok(())
    }
}

#[derive(FromRow)]
struct RuleRow {
    id: String,
    tenant_id: String,
    rule_type: String,
    enabled: bool,
    priority: i32,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn rule_type_from_str(s: &str) -> IvdResult<RuleType> {
    RuleType::parse(s).ok_or_else(|| IvdError::Upstream(format!("unknown rule type '{s}'")))
}

impl RuleRow {
    fn into_domain(self) -> IvdResult<VerificationRule> {
        Ok(VerificationRule {
            id: self.id,
            tenant_id: self.tenant_id,
            rule_type: rule_type_from_str(&self.rule_type)?,
            enabled: self.enabled,
            priority: self.priority,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgRuleRepository {
    pool: PgPool,
}

impl PgRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for PgRuleRepository {
    async fn list(&self, tenant_id: &Id) -> IvdResult<Vec<VerificationRule>> {
        let rows: Vec<RuleRow> =
            sqlx::query_as("SELECT * FROM verification_rules WHERE tenant_id = $1 ORDER BY priority")
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_err("rule", e))?;
        rows.into_iter().map(RuleRow::into_domain).collect()
    }

    async fn get_by_type(&self, tenant_id: &Id, rule_type: RuleType) -> IvdResult<Option<VerificationRule>> {
        let row: Option<RuleRow> =
            sqlx::query_as("SELECT * FROM verification_rules WHERE tenant_id = $1 AND rule_type = $2")
                .bind(tenant_id)
                .bind(rule_type.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_err("rule", e))?;
        row.map(RuleRow::into_domain).transpose()
    }

    async fn upsert(&self, rule: VerificationRule) -> IvdResult<VerificationRule> {
        sqlx::query(
            "INSERT INTO verification_rules (id, tenant_id, rule_type, enabled, priority, description, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (tenant_id, rule_type) DO UPDATE
               SET enabled = EXCLUDED.enabled, priority = EXCLUDED.priority, description = EXCLUDED.description,
                   updated_at = EXCLUDED.updated_at",
        )
        .bind(&rule.id)
        .bind(&rule.tenant_id)
        .bind(rule.rule_type.as_str())
        .bind(rule.enabled)
        .bind(rule.priority)
        .bind(&rule.description)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("rule", e))?;
        Ok(rule)
    }

    async fn seed_defaults(&self, tenant_id: &Id) -> IvdResult<Vec<VerificationRule>> {
        let existing = self.list(tenant_id).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }
        let seeded = VerificationRule::default_seed(tenant_id);
        for rule in &seeded {
            self.upsert(rule.clone()).await?;
        }
        Ok(seeded)
    }
}
