//! The Verification Engine: a prioritized, short-circuiting rule evaluator.
//! Pure over `(settings, rules, previous results)` — no writes.

use ivd_domain::settings::{AutoVerificationSettings, RuleType, VerificationRule};
use ivd_domain::LabResult;

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationDecision {
    pub can_auto_verify: bool,
    pub failed_rules: Vec<String>,
    pub failure_reasons: Vec<String>,
}

impl VerificationDecision {
    fn pass() -> Self {
        Self {
            can_auto_verify: true,
            failed_rules: Vec::new(),
            failure_reasons: Vec::new(),
        }
    }

    fn fail(rule: &str, reason: String) -> Self {
        Self {
            can_auto_verify: false,
            failed_rules: vec![rule.to_string()],
            failure_reasons: vec![reason],
        }
    }
}

/// `(passes, reason)` — `reason` is populated only on failure.
type RuleOutcome = (bool, Option<String>);

/// Both bounds null passes vacuously. Otherwise requires a numeric value;
/// boundary values (equal to low or high) pass.
pub fn check_reference_range(result: &LabResult, settings: &AutoVerificationSettings) -> RuleOutcome {
    if settings.reference_range_low.is_none() && settings.reference_range_high.is_none() {
        return (true, None);
    }
    let Some(value) = result.numeric_value() else {
        return (
            false,
            Some(format!(
                "value '{}' is not numeric, cannot evaluate reference range",
                result.value.as_deref().unwrap_or("")
            )),
        );
    };
    if let Some(low) = settings.reference_range_low {
        if value < low {
            return (false, Some(format!("value {value} is below reference range low {low}")));
        }
    }
    if let Some(high) = settings.reference_range_high {
        if value > high {
            return (false, Some(format!("value {value} is above reference range high {high}")));
        }
    }
    (true, None)
}

/// "Danger zone" semantics: equal-to-boundary fails, unlike reference range.
pub fn check_critical_range(result: &LabResult, settings: &AutoVerificationSettings) -> RuleOutcome {
    if settings.critical_range_low.is_none() && settings.critical_range_high.is_none() {
        return (true, None);
    }
    let Some(value) = result.numeric_value() else {
        return (
            false,
            Some(format!(
                "value '{}' is not numeric, cannot evaluate critical range",
                result.value.as_deref().unwrap_or("")
            )),
        );
    };
    if let Some(low) = settings.critical_range_low {
        if value <= low {
            return (
                false,
                Some(format!("value {value} is at or below critical low {low}")),
            );
        }
    }
    if let Some(high) = settings.critical_range_high {
        if value >= high {
            return (
                false,
                Some(format!("value {value} is at or above critical high {high}")),
            );
        }
    }
    (true, None)
}

/// Split on `,`, `;`, or ASCII whitespace; uppercase both sides; fail if any
/// parsed token is in the blocked set. Empty input passes.
pub fn check_instrument_flags(result: &LabResult, settings: &AutoVerificationSettings) -> RuleOutcome {
    let Some(raw) = result.lis_flags.as_deref() else {
        return (true, None);
    };
    let tokens: Vec<String> = raw
        .split(|c: char| c == ',' || c == ';' || c.is_ascii_whitespace())
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return (true, None);
    }
    let blocked: Vec<String> = settings
        .instrument_flags_to_block
        .iter()
        .map(|f| f.to_ascii_uppercase())
        .collect();
    let hits: Vec<&String> = tokens.iter().filter(|t| blocked.contains(t)).collect();
    if hits.is_empty() {
        (true, None)
    } else {
        (
            false,
            Some(format!(
                "blocked instrument flag(s): {}",
                hits.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            )),
        )
    }
}

/// Compares against the most recent prior result for the same
/// `(sample_id, test_code)` within the lookback window. `prior` is `None`
/// when no such result exists.
pub fn check_delta(result: &LabResult, settings: &AutoVerificationSettings, prior: Option<&LabResult>) -> RuleOutcome {
    let Some(threshold) = settings.delta_check_threshold_percent else {
        return (true, None);
    };
    let Some(current) = result.numeric_value() else {
        return (true, None);
    };
    let Some(prior) = prior else {
        return (true, None);
    };
    let Some(prior_value) = prior.numeric_value() else {
        return (true, None);
    };
    if prior_value == 0.0 {
        return if current == 0.0 {
            (true, None)
        } else {
            (false, Some("prior value was 0 and current value is non-zero".to_string()))
        };
    }
    let pct_change = ((current - prior_value) / prior_value).abs() * 100.0;
    if pct_change > threshold {
        (
            false,
            Some(format!(
                "delta check: {pct_change:.1}% change from prior value {prior_value} exceeds threshold {threshold}%"
            )),
        )
    } else {
        (true, None)
    }
}

/// Apply every enabled rule in ascending priority order, short-circuiting
/// at the first failure. `prior` is only consulted by the delta-check rule.
pub fn verify(
    result: &LabResult,
    settings: Option<&AutoVerificationSettings>,
    rules: &[VerificationRule],
    prior: Option<&LabResult>,
) -> VerificationDecision {
    let Some(settings) = settings else {
        return VerificationDecision::fail("settings_missing", "no AutoVerificationSettings for test_code".to_string());
    };

    let mut enabled: Vec<&VerificationRule> = rules.iter().filter(|r| r.enabled).collect();
    enabled.sort_by_key(|r| r.priority);

    for rule in enabled {
        let outcome = match rule.rule_type {
            RuleType::ReferenceRange => check_reference_range(result, settings),
            RuleType::CriticalRange => check_critical_range(result, settings),
            RuleType::InstrumentFlag => check_instrument_flags(result, settings),
            RuleType::DeltaCheck => check_delta(result, settings, prior),
        };
        if let (false, Some(reason)) = outcome {
            return VerificationDecision::fail(rule.rule_type.as_str(), reason);
        }
    }
    VerificationDecision::pass()
}

/// Batch entry point: callers load settings (one per distinct `test_code`)
/// and the tenant's rules once, then call this per result. A single result
/// whose rule evaluation panics-in-spirit (any unexpected internal error)
/// must not corrupt decisions for the rest of the batch — evaluation here
/// is a pure function over owned data, so isolation is structural rather
/// than caught at runtime.
pub fn verify_batch<'a>(
    results: &'a [LabResult],
    settings_by_test_code: &std::collections::HashMap<String, AutoVerificationSettings>,
    rules: &[VerificationRule],
    priors: &std::collections::HashMap<String, &'a LabResult>,
) -> std::collections::HashMap<String, VerificationDecision> {
    results
        .iter()
        .map(|result| {
            let settings = settings_by_test_code.get(&result.test_code);
            let prior = priors.get(&result.id).copied();
            (result.id.clone(), verify(result, settings, rules, prior))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivd_domain::result::NewResult;
    use ivd_domain::settings::NewAutoVerificationSettings;

    fn settings() -> AutoVerificationSettings {
        AutoVerificationSettings::new(NewAutoVerificationSettings {
            tenant_id: "t1".into(),
            test_code: "GLU".into(),
            test_name: "Glucose".into(),
            reference_range_low: Some(70.0),
            reference_range_high: Some(100.0),
            critical_range_low: Some(40.0),
            critical_range_high: Some(400.0),
            instrument_flags_to_block: vec!["C".into(), "H".into()],
            delta_check_threshold_percent: Some(10.0),
            delta_check_lookback_days: Some(30),
        })
        .unwrap()
    }

    fn result_with(value: &str, flags: Option<&str>) -> LabResult {
        LabResult::new(NewResult {
            tenant_id: "t1".into(),
            sample_id: "s1".into(),
            external_lis_result_id: "R1".into(),
            test_code: "GLU".into(),
            test_name: "Glucose".into(),
            value: Some(value.to_string()),
            unit: Some("mg/dL".into()),
            reference_range_low: Some(70.0),
            reference_range_high: Some(100.0),
            lis_flags: flags.map(|f| f.to_string()),
        })
        .unwrap()
    }

    #[test]
    fn reference_range_boundary_passes() {
        let settings = settings();
        assert!(check_reference_range(&result_with("70", None), &settings).0);
        assert!(check_reference_range(&result_with("100", None), &settings).0);
        assert!(!check_reference_range(&result_with("69.9", None), &settings).0);
    }

    #[test]
    fn critical_range_boundary_fails() {
        let settings = settings();
        assert!(!check_critical_range(&result_with("40", None), &settings).0);
        assert!(!check_critical_range(&result_with("400", None), &settings).0);
        assert!(check_critical_range(&result_with("100", None), &settings).0);
    }

    #[test]
    fn instrument_flag_parsing_is_separator_agnostic() {
        let settings = settings();
        for flags in ["H, C", "H;C", "H C"] {
            let (passes, _) = check_instrument_flags(&result_with("85", Some(flags)), &settings);
            assert!(!passes, "expected {flags} to block");
        }
        assert!(check_instrument_flags(&result_with("85", None), &settings).0);
    }

    #[test]
    fn delta_check_flags_large_swing() {
        let settings = settings();
        let prior = result_with("100", None);
        let current = result_with("120", None);
        let (passes, reason) = check_delta(&current, &settings, Some(&prior));
        assert!(!passes);
        assert!(reason.unwrap().contains("20.0%"));
    }

    #[test]
    fn delta_check_zero_prior_zero_current_passes() {
        let settings = settings();
        let prior = result_with("0", None);
        let current = result_with("0", None);
        assert!(check_delta(&current, &settings, Some(&prior)).0);
    }

    #[test]
    fn delta_check_zero_prior_nonzero_current_fails() {
        let settings = settings();
        let prior = result_with("0", None);
        let current = result_with("5", None);
        assert!(!check_delta(&current, &settings, Some(&prior)).0);
    }

    #[test]
    fn happy_path_auto_verifies() {
        let settings = settings();
        let rules = VerificationRule::default_seed(&"t1".to_string());
        let result = result_with("85", None);
        let decision = verify(&result, Some(&settings), &rules, None);
        assert!(decision.can_auto_verify);
    }

    #[test]
    fn instrument_flag_blocks_auto_verify() {
        let settings = settings();
        let rules = VerificationRule::default_seed(&"t1".to_string());
        let result = result_with("85", Some("C"));
        let decision = verify(&result, Some(&settings), &rules, None);
        assert!(!decision.can_auto_verify);
        assert_eq!(decision.failed_rules, vec!["instrument_flag"]);
    }

    #[test]
    fn missing_settings_yields_settings_missing_pseudo_rule() {
        let rules = VerificationRule::default_seed(&"t1".to_string());
        let result = result_with("85", None);
        let decision = verify(&result, None, &rules, None);
        assert!(!decision.can_auto_verify);
        assert_eq!(decision.failed_rules, vec!["settings_missing"]);
    }
}
