//! Auto-verification settings and rule toggling — admin-only writes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use ivd_domain::settings::{AutoVerificationSettings, AutoVerificationSettingsUpdate, NewAutoVerificationSettings, VerificationRule};
use serde::Deserialize;

use crate::auth::{AuthContext, AuthenticatedUser, Role};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSettingsRequest {
    pub test_code: String,
    pub test_name: String,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub critical_range_low: Option<f64>,
    pub critical_range_high: Option<f64>,
    #[serde(default)]
    pub instrument_flags_to_block: Vec<String>,
    pub delta_check_threshold_percent: Option<f64>,
    pub delta_check_lookback_days: Option<i32>,
}

pub async fn create_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateSettingsRequest>,
) -> Result<(StatusCode, Json<AutoVerificationSettings>), ApiError> {
    user.require_role(Role::Admin)?;
    let created = state
        .settings
        .create(NewAutoVerificationSettings {
            tenant_id: user.tenant_id.clone(),
            test_code: req.test_code,
            test_name: req.test_name,
            reference_range_low: req.reference_range_low,
            reference_range_high: req.reference_range_high,
            critical_range_low: req.critical_range_low,
            critical_range_high: req.critical_range_high,
            instrument_flags_to_block: req.instrument_flags_to_block,
            delta_check_threshold_percent: req.delta_check_threshold_percent,
            delta_check_lookback_days: req.delta_check_lookback_days,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<AutoVerificationSettings>>, ApiError> {
    let settings = state.settings.list(&user.tenant_id).await?;
    Ok(Json(settings))
}

pub async fn get_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(test_code): Path<String>,
) -> Result<Json<AutoVerificationSettings>, ApiError> {
    let settings = state.settings.get(&user.tenant_id, &test_code).await?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(test_code): Path<String>,
    Json(update): Json<AutoVerificationSettingsUpdate>,
) -> Result<Json<AutoVerificationSettings>, ApiError> {
    user.require_role(Role::Admin)?;
    let settings = state.settings.update(&user.tenant_id, &test_code, update).await?;
    Ok(Json(settings))
}

pub async fn delete_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(test_code): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require_role(Role::Admin)?;
    state.settings.delete(&user.tenant_id, &test_code).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ToggleRuleRequest {
    pub rule_type: String,
    pub enabled: bool,
}

pub async fn toggle_rule(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<ToggleRuleRequest>,
) -> Result<Json<VerificationRule>, ApiError> {
    user.require_role(Role::Admin)?;
    let rule = if req.enabled {
        state.settings.enable_rule(&user.tenant_id, &req.rule_type).await?
    } else {
        state.settings.disable_rule(&user.tenant_id, &req.rule_type).await?
    };
    Ok(Json(rule))
}
