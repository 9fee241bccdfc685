//! Instrument registry (admin-facing CRUD) and the `X-Instrument-Token`
//! gated host-query/result-submission routes the instruments themselves
//! drive.

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use ivd_domain::instrument::{Instrument, InstrumentStatus, InstrumentType};
use ivd_domain::IvdError;
use ivd_ports::instrument_adapter::{OrderData, ResultSubmission, SubmissionOutcome};
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the `X-Instrument-Token` header against the instrument
/// registry. Unknown token -> 401; known but inactive -> 403.
pub struct InstrumentAuth(pub Instrument);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for InstrumentAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("X-Instrument-Token")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::from(IvdError::Unauthorized("missing X-Instrument-Token header".to_string())))?;
        let instrument = state.instruments.authenticate(token).await?;
        Ok(InstrumentAuth(instrument))
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterInstrumentRequest {
    pub name: String,
    pub instrument_type: InstrumentType,
    pub api_token: Option<String>,
}

pub async fn register_instrument(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<RegisterInstrumentRequest>,
) -> Result<(StatusCode, Json<Instrument>), ApiError> {
    let instrument = state
        .instruments
        .register(&user.tenant_id, req.name, req.instrument_type, req.api_token)
        .await?;
    Ok((StatusCode::CREATED, Json(instrument)))
}

#[derive(Debug, Deserialize)]
pub struct ListInstrumentsQuery {
    pub status: Option<InstrumentStatus>,
}

pub async fn list_instruments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    axum::extract::Query(query): axum::extract::Query<ListInstrumentsQuery>,
) -> Result<Json<Vec<Instrument>>, ApiError> {
    let instruments = state.instruments.list(&user.tenant_id, query.status).await?;
    Ok(Json(instruments))
}

pub async fn get_instrument(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Instrument>, ApiError> {
    let instrument = state.instruments.get(&user.tenant_id, &id).await?;
    Ok(Json(instrument))
}

#[derive(Debug, Serialize)]
pub struct InstrumentStatusResponse {
    pub status: InstrumentStatus,
    pub connection_failure_count: i32,
    pub last_failure_reason: Option<String>,
}

pub async fn get_instrument_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<InstrumentStatusResponse>, ApiError> {
    let instrument = state.instruments.get(&user.tenant_id, &id).await?;
    Ok(Json(InstrumentStatusResponse {
        status: instrument.status,
        connection_failure_count: instrument.connection_failure_count,
        last_failure_reason: instrument.last_failure_reason,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateInstrumentRequest {
    pub name: String,
}

pub async fn update_instrument(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateInstrumentRequest>,
) -> Result<Json<Instrument>, ApiError> {
    let instrument = state.instruments.rename(&user.tenant_id, &id, req.name).await?;
    Ok(Json(instrument))
}

pub async fn delete_instrument(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.instruments.deactivate(&user.tenant_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn regenerate_token(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Instrument>, ApiError> {
    let instrument = state.instruments.regenerate_token(&user.tenant_id, &id).await?;
    Ok(Json(instrument))
}

#[derive(Debug, Deserialize)]
pub struct QueryHostRequest {
    pub instrument_id: String,
    pub patient_id: Option<String>,
    pub sample_barcode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryHostResponse {
    pub orders: Vec<OrderData>,
    pub query_timestamp: chrono::DateTime<chrono::Utc>,
    pub instrument_status: InstrumentStatus,
}

pub async fn query_host(
    State(state): State<AppState>,
    InstrumentAuth(instrument): InstrumentAuth,
    Json(req): Json<QueryHostRequest>,
) -> Result<Json<QueryHostResponse>, ApiError> {
    let query_timestamp = chrono::Utc::now();
    let orders = state
        .instrument_integration
        .host_query(
            &instrument.tenant_id,
            &req.instrument_id,
            req.patient_id.as_deref(),
            req.sample_barcode.as_deref(),
        )
        .await?;
    let refreshed = state.instruments.get(&instrument.tenant_id, &req.instrument_id).await?;
    Ok(Json(QueryHostResponse { orders, query_timestamp, instrument_status: refreshed.status }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitResultRequest {
    pub instrument_id: String,
    #[serde(flatten)]
    pub payload: ResultSubmission,
}

pub async fn submit_result(
    State(state): State<AppState>,
    InstrumentAuth(instrument): InstrumentAuth,
    Json(req): Json<SubmitResultRequest>,
) -> Result<(StatusCode, Json<SubmissionOutcome>), ApiError> {
    let outcome = state
        .instrument_integration
        .submit_result(&instrument.tenant_id, &req.instrument_id, req.payload)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}
