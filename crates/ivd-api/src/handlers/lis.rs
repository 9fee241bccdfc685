//! LIS configuration lifecycle: create, fetch, test connection, upload
//! settings.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ivd_domain::lis_config::{IntegrationModel, LisConfig, LisType, NewLisConfig};
use serde::Deserialize;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateLisConfigRequest {
    pub lis_type: LisType,
    pub integration_model: IntegrationModel,
    pub api_endpoint_url: Option<String>,
    pub api_auth_credentials: Option<String>,
    pub pull_interval_minutes: i32,
}

pub async fn create_lis_config(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateLisConfigRequest>,
) -> Result<(StatusCode, Json<LisConfig>), ApiError> {
    let config = state
        .lis_config
        .create_configuration(NewLisConfig {
            tenant_id: user.tenant_id.clone(),
            lis_type: req.lis_type,
            integration_model: req.integration_model,
            api_endpoint_url: req.api_endpoint_url,
            api_auth_credentials: req.api_auth_credentials,
            pull_interval_minutes: req.pull_interval_minutes,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(config)))
}

pub async fn get_lis_config(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<LisConfig>, ApiError> {
    let config = state.lis_config.get_configuration(&user.tenant_id).await?;
    Ok(Json(config))
}

pub async fn test_connection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<LisConfig>, ApiError> {
    let config = state.lis_config.test_connection(&user.tenant_id).await?;
    Ok(Json(config))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUploadSettingsRequest {
    pub auto_upload_enabled: bool,
    pub upload_verified_results: bool,
    pub upload_rejected_results: bool,
    pub upload_batch_size: i32,
    pub upload_rate_limit: i32,
}

pub async fn update_upload_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<UpdateUploadSettingsRequest>,
) -> Result<Json<LisConfig>, ApiError> {
    let config = state
        .lis_config
        .update_upload_settings(
            &user.tenant_id,
            req.auto_upload_enabled,
            req.upload_verified_results,
            req.upload_rejected_results,
            req.upload_batch_size,
            req.upload_rate_limit,
        )
        .await?;
    Ok(Json(config))
}
