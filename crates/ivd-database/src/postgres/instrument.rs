use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::{Id, Instrument, InstrumentQuery, InstrumentStatus, InstrumentType, IvdError, IvdResult, ResponseStatus};
use ivd_ports::{InstrumentQueryRepository, InstrumentRepository};
use sqlx::{FromRow, PgPool};

use super::util::map_err;

#[derive(FromRow)]
struct InstrumentRow {
    id: String,
    tenant_id: String,
    name: String,
    instrument_type: String,
    api_token: String,
    api_token_created_at: DateTime<Utc>,
    status: String,
    connection_failure_count: i32,
    last_successful_query_at: Option<DateTime<Utc>>,
    last_successful_result_at: Option<DateTime<Utc>>,
    last_failure_at: Option<DateTime<Utc>>,
    last_failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn instrument_type_to_str(instrument_type: InstrumentType) -> &'static str {
    match instrument_type {
        InstrumentType::Chemistry => "chemistry",
        InstrumentType::Hematology => "hematology",
        InstrumentType::Immunoassay => "immunoassay",
        InstrumentType::Microbiology => "microbiology",
        InstrumentType::Generic => "generic",
    }
}

fn instrument_type_from_str(s: &str) -> IvdResult<InstrumentType> {
    match s {
        "chemistry" => Ok(InstrumentType::Chemistry),
        "hematology" => Ok(InstrumentType::Hematology),
        "immunoassay" => Ok(InstrumentType::Immunoassay),
        "microbiology" => Ok(InstrumentType::Microbiology),
        "generic" => Ok(InstrumentType::Generic),
        other => Err(IvdError::Upstream(format!("unknown instrument type '{other}'"))),
    }
}

fn status_to_str(status: InstrumentStatus) -> &'static str {
    match status {
        InstrumentStatus::Active => "active",
        InstrumentStatus::Inactive => "inactive",
        InstrumentStatus::Disconnected => "disconnected",
    }
}

fn status_from_str(s: &str) -> IvdResult<InstrumentStatus> {
    match s {
        "active" => Ok(InstrumentStatus::Active),
        "inactive" => Ok(InstrumentStatus::Inactive),
        "disconnected" => Ok(InstrumentStatus::Disconnected),
        other => Err(IvdError::Upstream(format!("unknown instrument status '{other}'"))),
    }
}

impl InstrumentRow {
    fn into_domain(self) -> IvdResult<Instrument> {
        Ok(Instrument {
            id: self.id,
            tenant_id: self.tenant_id,
            name: self.name,
            instrument_type: instrument_type_from_str(&self.instrument_type)?,
            api_token: self.api_token,
            api_token_created_at: self.api_token_created_at,
            status: status_from_str(&self.status)?,
            connection_failure_count: self.connection_failure_count,
            last_successful_query_at: self.last_successful_query_at,
            last_successful_result_at: self.last_successful_result_at,
            last_failure_at: self.last_failure_at,
            last_failure_reason: self.last_failure_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgInstrumentRepository {
    pool: PgPool,
}

impl PgInstrumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstrumentRepository for PgInstrumentRepository {
    async fn create(&self, instrument: Instrument) -> IvdResult<Instrument> {
        sqlx::query(
            "INSERT INTO instruments
                (id, tenant_id, name, instrument_type, api_token, api_token_created_at, status,
                 connection_failure_count, last_successful_query_at, last_successful_result_at, last_failure_at,
                 last_failure_reason, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(&instrument.id)
        .bind(&instrument.tenant_id)
        .bind(&instrument.name)
        .bind(instrument_type_to_str(instrument.instrument_type))
        .bind(&instrument.api_token)
        .bind(instrument.api_token_created_at)
        .bind(status_to_str(instrument.status))
        .bind(instrument.connection_failure_count)
        .bind(instrument.last_successful_query_at)
        .bind(instrument.last_successful_result_at)
        .bind(instrument.last_failure_at)
        .bind(&instrument.last_failure_reason)
        .bind(instrument.created_at)
        .bind(instrument.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("instrument", e))?;
        Ok(instrument)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Instrument> {
        let row: Option<InstrumentRow> = sqlx::query_as("SELECT * FROM instruments WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err("instrument", e))?;
        row.ok_or_else(|| IvdError::not_found("instrument", id))?.into_domain()
    }

    async fn get_by_api_token(&self, api_token: &str) -> IvdResult<Option<Instrument>> {
        let row: Option<InstrumentRow> = sqlx::query_as("SELECT * FROM instruments WHERE api_token = $1")
            .bind(api_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err("instrument", e))?;
        row.map(InstrumentRow::into_domain).transpose()
    }

    async fn get_by_name(&self, tenant_id: &Id, name: &str) -> IvdResult<Option<Instrument>> {
        let row: Option<InstrumentRow> =
            sqlx::query_as("SELECT * FROM instruments WHERE tenant_id = $1 AND name = $2")
                .bind(tenant_id)
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_err("instrument", e))?;
        row.map(InstrumentRow::into_domain).transpose()
    }

    async fn list(&self, tenant_id: &Id, status: Option<InstrumentStatus>) -> IvdResult<Vec<Instrument>> {
        let rows: Vec<InstrumentRow> = sqlx::query_as(
            "SELECT * FROM instruments WHERE tenant_id = $1 AND ($2::TEXT IS NULL OR status = $2) ORDER BY name",
        )
        .bind(tenant_id)
        .bind(status.map(status_to_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("instrument", e))?;
        rows.into_iter().map(InstrumentRow::into_domain).collect()
    }

    async fn update(&self, instrument: Instrument) -> IvdResult<Instrument> {
        sqlx::query(
            "UPDATE instruments SET name = $1, api_token = $2, api_token_created_at = $3, status = $4,
                                     connection_failure_count = $5, last_successful_query_at = $6,
                                     last_successful_result_at = $7, last_failure_at = $8, last_failure_reason = $9,
                                     updated_at = $10
             WHERE id = $11 AND tenant_id = $12",
        )
        .bind(&instrument.name)
        .bind(&instrument.api_token)
        .bind(instrument.api_token_created_at)
        .bind(status_to_str(instrument.status))
        .bind(instrument.connection_failure_count)
        .bind(instrument.last_successful_query_at)
        .bind(instrument.last_successful_result_at)
        .bind(instrument.last_failure_at)
        .bind(&instrument.last_failure_reason)
        .bind(instrument.updated_at)
        .bind(&instrument.id)
        .bind(&instrument.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("instrument", e))?;
        Ok(instrument)
    }

    async fn soft_delete(&self, tenant_id: &Id, id: &Id) -> IvdResult<()> {
        let outcome = sqlx::query(
            "UPDATE instruments SET status = 'inactive', updated_at = now() WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("instrument", e))?;
        if outcome.rows_affected() == 0 {
            return Err(IvdError::not_found("instrument", id));
        }
        Ok(())
    }
}

#[derive(FromRow)]
struct InstrumentQueryRow {
    id: String,
    tenant_id: String,
    instrument_id: String,
    query_timestamp: DateTime<Utc>,
    response_timestamp: DateTime<Utc>,
    response_time_ms: i64,
    orders_returned_count: i32,
    response_status: String,
    query_patient_id: Option<String>,
    query_sample_barcode: Option<String>,
    error_reason: Option<String>,
}

fn response_status_to_str(status: ResponseStatus) -> &'static str {
    match status {
        ResponseStatus::Success => "success",
        ResponseStatus::Error => "error",
        ResponseStatus::Timeout => "timeout",
    }
}

fn response_status_from_str(s: &str) -> IvdResult<ResponseStatus> {
    match s {
        "success" => Ok(ResponseStatus::Success),
        "error" => Ok(ResponseStatus::Error),
        "timeout" => Ok(ResponseStatus::Timeout),
        other => Err(IvdError::Upstream(format!("unknown response status '{other}'"))),
    }
}

impl InstrumentQueryRow {
    fn into_domain(self) -> IvdResult<InstrumentQuery> {
        Ok(InstrumentQuery {
            id: self.id,
            tenant_id: self.tenant_id,
            instrument_id: self.instrument_id,
            query_timestamp: self.query_timestamp,
            response_timestamp: self.response_timestamp,
            response_time_ms: self.response_time_ms,
            orders_returned_count: self.orders_returned_count,
            response_status: response_status_from_str(&self.response_status)?,
            query_patient_id: self.query_patient_id,
            query_sample_barcode: self.query_sample_barcode,
            error_reason: self.error_reason,
        })
    }
}

pub struct PgInstrumentQueryRepository {
    pool: PgPool,
}

impl PgInstrumentQueryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstrumentQueryRepository for PgInstrumentQueryRepository {
    async fn create(&self, query: InstrumentQuery) -> IvdResult<InstrumentQuery> {
        sqlx::query(
            "INSERT INTO instrument_queries
                (id, tenant_id, instrument_id, query_timestamp, response_timestamp, response_time_ms,
                 orders_returned_count, response_status, query_patient_id, query_sample_barcode, error_reason)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&query.id)
        .bind(&query.tenant_id)
        .bind(&query.instrument_id)
        .bind(query.query_timestamp)
        .bind(query.response_timestamp)
        .bind(query.response_time_ms)
        .bind(query.orders_returned_count)
        .bind(response_status_to_str(query.response_status))
        .bind(&query.query_patient_id)
        .bind(&query.query_sample_barcode)
        .bind(&query.error_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("instrument_query", e))?;
        Ok(query)
    }

    async fn list_by_instrument(&self, tenant_id: &Id, instrument_id: &Id, limit: i64) -> IvdResult<Vec<InstrumentQuery>> {
        let rows: Vec<InstrumentQueryRow> = sqlx::query_as(
            "SELECT * FROM instrument_queries WHERE tenant_id = $1 AND instrument_id = $2
             ORDER BY query_timestamp DESC
             LIMIT $3",
        )
        .bind(tenant_id)
        .bind(instrument_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("instrument_query", e))?;
        rows.into_iter().map(InstrumentQueryRow::into_domain).collect()
    }
}
