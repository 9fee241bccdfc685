//! Result list/detail and creation. Creation runs the verification engine
//! synchronously on the newly created result, per the synchronous
//! verification-on-create control flow.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use ivd_domain::result::{NewResult, Result as LabResult, UploadStatus, VerificationStatus};
use ivd_ports::ResultFilter;
use serde::Deserialize;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateResultRequest {
    pub sample_id: String,
    pub external_lis_result_id: String,
    pub test_code: String,
    pub test_name: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub lis_flags: Option<String>,
}

pub async fn create_result(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateResultRequest>,
) -> Result<(StatusCode, Json<LabResult>), ApiError> {
    let created = state
        .results
        .create(NewResult {
            tenant_id: user.tenant_id.clone(),
            sample_id: req.sample_id,
            external_lis_result_id: req.external_lis_result_id,
            test_code: req.test_code,
            test_name: req.test_name,
            value: req.value,
            unit: req.unit,
            reference_range_low: req.reference_range_low,
            reference_range_high: req.reference_range_high,
            lis_flags: req.lis_flags,
        })
        .await?;
    let (result, _decision) = state.verification.verify_result(&user.tenant_id, &created.id).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Deserialize)]
pub struct ListResultsQuery {
    pub status: Option<VerificationStatus>,
    pub upload_status: Option<UploadStatus>,
    pub sample_id: Option<String>,
}

pub async fn list_results(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListResultsQuery>,
) -> Result<Json<Vec<LabResult>>, ApiError> {
    let results = state
        .results
        .list(
            &user.tenant_id,
            ResultFilter {
                verification_status: query.status,
                upload_status: query.upload_status,
                sample_id: query.sample_id,
            },
        )
        .await?;
    Ok(Json(results))
}

pub async fn get_result(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<LabResult>, ApiError> {
    let result = state.results.get_by_id(&user.tenant_id, &id).await?;
    Ok(Json(result))
}
