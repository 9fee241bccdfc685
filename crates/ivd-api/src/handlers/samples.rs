//! Sample CRUD: register samples, list/search, and transition status.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use ivd_domain::sample::{NewSample, Sample, SampleStatus};
use serde::Deserialize;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSampleRequest {
    pub external_lis_id: String,
    pub patient_id: String,
    pub specimen_type: String,
    pub collection_date: DateTime<Utc>,
    pub received_date: DateTime<Utc>,
}

pub async fn create_sample(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateSampleRequest>,
) -> Result<(StatusCode, Json<Sample>), ApiError> {
    let sample = state
        .samples
        .create(NewSample {
            tenant_id: user.tenant_id.clone(),
            external_lis_id: req.external_lis_id,
            patient_id: req.patient_id,
            specimen_type: req.specimen_type,
            collection_date: req.collection_date,
            received_date: req.received_date,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(sample)))
}

#[derive(Debug, Deserialize)]
pub struct ListSamplesQuery {
    pub status: Option<SampleStatus>,
}

pub async fn list_samples(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListSamplesQuery>,
) -> Result<Json<Vec<Sample>>, ApiError> {
    let samples = state.samples.list(&user.tenant_id, query.status).await?;
    Ok(Json(samples))
}

pub async fn get_sample(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Sample>, ApiError> {
    let sample = state.samples.get_by_id(&user.tenant_id, &id).await?;
    Ok(Json(sample))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSampleRequest {
    pub status: SampleStatus,
}

pub async fn update_sample(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateSampleRequest>,
) -> Result<Json<Sample>, ApiError> {
    let mut sample = state.samples.get_by_id(&user.tenant_id, &id).await?;
    sample.set_status(req.status);
    let sample = state.samples.update(sample).await?;
    Ok(Json(sample))
}
