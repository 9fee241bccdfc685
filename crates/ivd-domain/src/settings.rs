//! AutoVerificationSettings and VerificationRule — per-test-code and
//! per-rule-type tenant configuration consumed by the verification engine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IvdError, IvdResult};
use crate::ids::{new_id, Id};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoVerificationSettings {
    pub id: Id,
    pub tenant_id: Id,
    pub test_code: String,
    pub test_name: String,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub critical_range_low: Option<f64>,
    pub critical_range_high: Option<f64>,
    pub instrument_flags_to_block: Vec<String>,
    pub delta_check_threshold_percent: Option<f64>,
    pub delta_check_lookback_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewAutoVerificationSettings {
    pub tenant_id: Id,
    pub test_code: String,
    pub test_name: String,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub critical_range_low: Option<f64>,
    pub critical_range_high: Option<f64>,
    pub instrument_flags_to_block: Vec<String>,
    pub delta_check_threshold_percent: Option<f64>,
    pub delta_check_lookback_days: Option<i32>,
}

/// Partial update: only fields set to `Some` override the stored value.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AutoVerificationSettingsUpdate {
    pub test_name: Option<String>,
    pub reference_range_low: Option<Option<f64>>,
    pub reference_range_high: Option<Option<f64>>,
    pub critical_range_low: Option<Option<f64>>,
    pub critical_range_high: Option<Option<f64>>,
    pub instrument_flags_to_block: Option<Vec<String>>,
    pub delta_check_threshold_percent: Option<Option<f64>>,
    pub delta_check_lookback_days: Option<i32>,
}

fn validate_ranges(
    reference_range_low: Option<f64>,
    reference_range_high: Option<f64>,
    critical_range_low: Option<f64>,
    critical_range_high: Option<f64>,
    delta_check_threshold_percent: Option<f64>,
    delta_check_lookback_days: i32,
) -> IvdResult<()> {
    if let (Some(low), Some(high)) = (reference_range_low, reference_range_high) {
        if !(low < high) {
            return Err(IvdError::InvalidConfiguration(
                "reference_range_low must be less than reference_range_high".to_string(),
            ));
        }
    }
    if let (Some(low), Some(high)) = (critical_range_low, critical_range_high) {
        if !(low < high) {
            return Err(IvdError::InvalidConfiguration(
                "critical_range_low must be less than critical_range_high".to_string(),
            ));
        }
    }
    if let Some(threshold) = delta_check_threshold_percent {
        if !(0.0..=1000.0).contains(&threshold) {
            return Err(IvdError::InvalidConfiguration(
                "delta_check_threshold_percent must be between 0 and 1000".to_string(),
            ));
        }
    }
    if !(1..=365).contains(&delta_check_lookback_days) {
        return Err(IvdError::InvalidConfiguration(
            "delta_check_lookback_days must be between 1 and 365".to_string(),
        ));
    }
    Ok(())
}

impl AutoVerificationSettings {
    pub fn new(input: NewAutoVerificationSettings) -> IvdResult<Self> {
        let lookback_days = input.delta_check_lookback_days.unwrap_or(30);
        validate_ranges(
            input.reference_range_low,
            input.reference_range_high,
            input.critical_range_low,
            input.critical_range_high,
            input.delta_check_threshold_percent,
            lookback_days,
        )?;
        let now = Utc::now();
        Ok(Self {
            id: new_id(),
            tenant_id: input.tenant_id,
            test_code: input.test_code,
            test_name: input.test_name,
            reference_range_low: input.reference_range_low,
            reference_range_high: input.reference_range_high,
            critical_range_low: input.critical_range_low,
            critical_range_high: input.critical_range_high,
            instrument_flags_to_block: dedupe(input.instrument_flags_to_block),
            delta_check_threshold_percent: input.delta_check_threshold_percent,
            delta_check_lookback_days: lookback_days,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, update: AutoVerificationSettingsUpdate) -> IvdResult<()> {
        let reference_range_low = update.reference_range_low.unwrap_or(self.reference_range_low);
        let reference_range_high = update.reference_range_high.unwrap_or(self.reference_range_high);
        let critical_range_low = update.critical_range_low.unwrap_or(self.critical_range_low);
        let critical_range_high = update.critical_range_high.unwrap_or(self.critical_range_high);
        let delta_check_threshold_percent = update
            .delta_check_threshold_percent
            .unwrap_or(self.delta_check_threshold_percent);
        let delta_check_lookback_days = update
            .delta_check_lookback_days
            .unwrap_or(self.delta_check_lookback_days);

        validate_ranges(
            reference_range_low,
            reference_range_high,
            critical_range_low,
            critical_range_high,
            delta_check_threshold_percent,
            delta_check_lookback_days,
        )?;

        if let Some(test_name) = update.test_name {
            self.test_name = test_name;
        }
        self.reference_range_low = reference_range_low;
        self.reference_range_high = reference_range_high;
        self.critical_range_low = critical_range_low;
        self.critical_range_high = critical_range_high;
        if let Some(flags) = update.instrument_flags_to_block {
            self.instrument_flags_to_block = dedupe(flags);
        }
        self.delta_check_threshold_percent = delta_check_threshold_percent;
        self.delta_check_lookback_days = delta_check_lookback_days;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_instrument_flags_to_block(&mut self, flags: Vec<String>) {
        self.instrument_flags_to_block = dedupe(flags);
        self.updated_at = Utc::now();
    }

    pub fn get_instrument_flags_to_block(&self) -> &[String] {
        &self.instrument_flags_to_block
    }
}

fn dedupe(flags: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for flag in flags {
        if seen.insert(flag.clone()) {
            out.push(flag);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    ReferenceRange,
    CriticalRange,
    InstrumentFlag,
    DeltaCheck,
}

impl RuleType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reference_range" => Some(Self::ReferenceRange),
            "critical_range" => Some(Self::CriticalRange),
            "instrument_flag" => Some(Self::InstrumentFlag),
            "delta_check" => Some(Self::DeltaCheck),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReferenceRange => "reference_range",
            Self::CriticalRange => "critical_range",
            Self::InstrumentFlag => "instrument_flag",
            Self::DeltaCheck => "delta_check",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRule {
    pub id: Id,
    pub tenant_id: Id,
    pub rule_type: RuleType,
    pub enabled: bool,
    pub priority: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRule {
    pub fn new(tenant_id: Id, rule_type: RuleType, enabled: bool, priority: i32, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            tenant_id,
            rule_type,
            enabled,
            priority,
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.updated_at = Utc::now();
    }

    /// The seeded default rules for a brand-new tenant: reference range,
    /// critical range and instrument-flag checks are on by default; delta
    /// check is off (it needs historical data the tenant may not have yet).
    pub fn default_seed(tenant_id: &Id) -> Vec<VerificationRule> {
        vec![
            VerificationRule::new(
                tenant_id.clone(),
                RuleType::ReferenceRange,
                true,
                1,
                "Check if value is within reference range",
            ),
            VerificationRule::new(
                tenant_id.clone(),
                RuleType::CriticalRange,
                true,
                2,
                "Check if value is in critical range",
            ),
            VerificationRule::new(
                tenant_id.clone(),
                RuleType::InstrumentFlag,
                true,
                3,
                "Check for blocked instrument flags",
            ),
            VerificationRule::new(
                tenant_id.clone(),
                RuleType::DeltaCheck,
                false,
                4,
                "Check for significant change from previous result",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input() -> NewAutoVerificationSettings {
        NewAutoVerificationSettings {
            tenant_id: "t1".into(),
            test_code: "GLU".into(),
            test_name: "Glucose".into(),
            reference_range_low: Some(70.0),
            reference_range_high: Some(100.0),
            critical_range_low: Some(40.0),
            critical_range_high: Some(400.0),
            instrument_flags_to_block: vec!["C".into(), "H".into(), "c".into()],
            delta_check_threshold_percent: Some(10.0),
            delta_check_lookback_days: Some(30),
        }
    }

    #[test]
    fn rejects_inverted_reference_range() {
        let mut input = base_input();
        input.reference_range_low = Some(100.0);
        input.reference_range_high = Some(70.0);
        assert!(AutoVerificationSettings::new(input).is_err());
    }

    #[test]
    fn rejects_equal_reference_range_bounds() {
        let mut input = base_input();
        input.reference_range_low = Some(80.0);
        input.reference_range_high = Some(80.0);
        assert!(AutoVerificationSettings::new(input).is_err());
    }

    #[test]
    fn rejects_out_of_bounds_threshold() {
        let mut input = base_input();
        input.delta_check_threshold_percent = Some(1500.0);
        assert!(AutoVerificationSettings::new(input).is_err());
    }

    #[test]
    fn partial_update_only_overrides_supplied_fields() {
        let mut settings = AutoVerificationSettings::new(base_input()).unwrap();
        settings
            .apply_update(AutoVerificationSettingsUpdate {
                reference_range_high: Some(Some(110.0)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.reference_range_high, Some(110.0));
        assert_eq!(settings.reference_range_low, Some(70.0));
    }

    #[test]
    fn default_seed_matches_documented_priorities() {
        let seeded = VerificationRule::default_seed(&"t1".to_string());
        assert_eq!(seeded.len(), 4);
        assert!(seeded[0].enabled && seeded[0].rule_type == RuleType::ReferenceRange);
        assert!(!seeded[3].enabled && seeded[3].rule_type == RuleType::DeltaCheck);
    }
}
