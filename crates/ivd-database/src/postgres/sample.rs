use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::sample::{NewSample, Sample, SampleStatus};
use ivd_domain::{Id, IvdError, IvdResult};
use ivd_ports::SampleRepository;
use sqlx::{FromRow, PgPool};

use super::util::map_err;

#[derive(FromRow)]
struct SampleRow {
    id: String,
    tenant_id: String,
    external_lis_id: String,
    patient_id: String,
    specimen_type: String,
    collection_date: DateTime<Utc>,
    received_date: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn status_to_str(status: SampleStatus) -> &'static str {
    match status {
        SampleStatus::Pending => "pending",
        SampleStatus::Verified => "verified",
        SampleStatus::NeedsReview => "needs_review",
        SampleStatus::Rejected => "rejected",
    }
}

fn status_from_str(s: &str) -> IvdResult<SampleStatus> {
    match s {
        "pending" => Ok(SampleStatus::Pending),
        "verified" => Ok(SampleStatus::Verified),
        "needs_review" => Ok(SampleStatus::NeedsReview),
        "rejected" => Ok(SampleStatus::Rejected),
        other => Err(IvdError::Upstream(format!("unknown sample status '{other}'"))),
    }
}

impl SampleRow {
    fn into_domain(self) -> IvdResult<Sample> {
        Ok(Sample {
            id: self.id,
            tenant_id: self.tenant_id,
            external_lis_id: self.external_lis_id,
            patient_id: self.patient_id,
            specimen_type: self.specimen_type,
            collection_date: self.collection_date,
            received_date: self.received_date,
            status: status_from_str(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgSampleRepository {
    pool: PgPool,
}

impl PgSampleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SampleRepository for PgSampleRepository {
    async fn create(&self, input: NewSample) -> IvdResult<Sample> {
        let sample = Sample::new(input)?;
        sqlx::query(
            "INSERT INTO samples (id, tenant_id, external_lis_id, patient_id, specimen_type, collection_date, received_date, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&sample.id)
        .bind(&sample.tenant_id)
        .bind(&sample.external_lis_id)
        .bind(&sample.patient_id)
        .bind(&sample.specimen_type)
        .bind(sample.collection_date)
        .bind(sample.received_date)
        .bind(status_to_str(sample.status))
        .bind(sample.created_at)
        .bind(sample.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("sample", e))?;
        Ok(sample)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Sample> {
        let row: Option<SampleRow> = sqlx::query_as("SELECT * FROM samples WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err("sample", e))?;
        row.ok_or_else(|| IvdError::not_found("sample", id))?.into_domain()
    }

    async fn get_by_external_lis_id(&self, tenant_id: &Id, external_lis_id: &str) -> IvdResult<Option<Sample>> {
        let row: Option<SampleRow> =
            sqlx::query_as("SELECT * FROM samples WHERE tenant_id = $1 AND external_lis_id = $2")
                .bind(tenant_id)
                .bind(external_lis_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_err("sample", e))?;
        row.map(SampleRow::into_domain).transpose()
    }

    async fn list(&self, tenant_id: &Id, status: Option<SampleStatus>) -> IvdResult<Vec<Sample>> {
        let rows: Vec<SampleRow> = match status {
            Some(status) => sqlx::query_as("SELECT * FROM samples WHERE tenant_id = $1 AND status = $2 ORDER BY created_at")
                .bind(tenant_id)
                .bind(status_to_str(status))
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query_as("SELECT * FROM samples WHERE tenant_id = $1 ORDER BY created_at")
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await,
        }
        .map_err(|e| map_err("sample", e))?;
        rows.into_iter().map(SampleRow::into_domain).collect()
    }

    async fn update(&self, sample: Sample) -> IvdResult<Sample> {
        sqlx::query(
            "UPDATE samples SET patient_id = $1, specimen_type = $2, status = $3, updated_at = $4
             WHERE id = $5 AND tenant_id = $6",
        )
        .bind(&sample.patient_id)
        .bind(&sample.specimen_type)
        .bind(status_to_str(sample.status))
        .bind(sample.updated_at)
        .bind(&sample.id)
        .bind(&sample.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("sample", e))?;
        Ok(sample)
    }
}
