use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::result::{NewResult, UploadStatus, VerificationMethod, VerificationStatus};
use ivd_domain::{Id, IvdError, IvdResult, LabResult};
use ivd_ports::{ResultFilter, ResultRepository};
use sqlx::{FromRow, PgPool};

use super::util::map_err;

#[derive(FromRow)]
struct ResultRow {
    id: String,
    tenant_id: String,
    sample_id: String,
    external_lis_result_id: String,
    test_code: String,
    test_name: String,
    value: Option<String>,
    unit: Option<String>,
    reference_range_low: Option<f64>,
    reference_range_high: Option<f64>,
    lis_flags: Option<String>,
    verification_status: String,
    verification_method: Option<String>,
    upload_status: String,
    upload_failure_count: i32,
    upload_failure_reason: Option<String>,
    sent_to_lis_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn verification_status_to_str(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Pending => "pending",
        VerificationStatus::Verified => "verified",
        VerificationStatus::NeedsReview => "needs_review",
        VerificationStatus::Rejected => "rejected",
    }
}

fn verification_status_from_str(s: &str) -> IvdResult<VerificationStatus> {
    match s {
        "pending" => Ok(VerificationStatus::Pending),
        "verified" => Ok(VerificationStatus::Verified),
        "needs_review" => Ok(VerificationStatus::NeedsReview),
        "rejected" => Ok(VerificationStatus::Rejected),
        other => Err(IvdError::Upstream(format!("unknown verification status '{other}'"))),
    }
}

fn verification_method_to_str(method: VerificationMethod) -> &'static str {
    match method {
        VerificationMethod::Auto => "auto",
        VerificationMethod::Manual => "manual",
    }
}

fn verification_method_from_str(s: &str) -> IvdResult<VerificationMethod> {
    match s {
        "auto" => Ok(VerificationMethod::Auto),
        "manual" => Ok(VerificationMethod::Manual),
        other => Err(IvdError::Upstream(format!("unknown verification method '{other}'"))),
    }
}

fn upload_status_to_str(status: UploadStatus) -> &'static str {
    match status {
        UploadStatus::Pending => "pending",
        UploadStatus::Sent => "sent",
        UploadStatus::Failed => "failed",
    }
}

fn upload_status_from_str(s: &str) -> IvdResult<UploadStatus> {
    match s {
        "pending" => Ok(UploadStatus::Pending),
        "sent" => Ok(UploadStatus::Sent),
        "failed" => Ok(UploadStatus::Failed),
        other => Err(IvdError::Upstream(format!("unknown upload status '{other}'"))),
    }
}

impl ResultRow {
    fn into_domain(self) -> IvdResult<LabResult> {
        Ok(LabResult {
            id: self.id,
            tenant_id: self.tenant_id,
            sample_id: self.sample_id,
            external_lis_result_id: self.external_lis_result_id,
            test_code: self.test_code,
            test_name: self.test_name,
            value: self.value,
            unit: self.unit,
            reference_range_low: self.reference_range_low,
            reference_range_high: self.reference_range_high,
            lis_flags: self.lis_flags,
            verification_status: verification_status_from_str(&self.verification_status)?,
            verification_method: self.verification_method.as_deref().map(verification_method_from_str).transpose()?,
            upload_status: upload_status_from_str(&self.upload_status)?,
            upload_failure_count: self.upload_failure_count,
            upload_failure_reason: self.upload_failure_reason,
            sent_to_lis_at: self.sent_to_lis_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgResultRepository {
    pool: PgPool,
}

impl PgResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultRepository for PgResultRepository {
    async fn create(&self, input: NewResult) -> IvdResult<LabResult> {
        let result = LabResult::new(input)?;
        sqlx::query(
            "INSERT INTO results (id, tenant_id, sample_id, external_lis_result_id, test_code, test_name, value, unit,
                                   reference_range_low, reference_range_high, lis_flags, verification_status,
                                   verification_method, upload_status, upload_failure_count, upload_failure_reason,
                                   sent_to_lis_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
        )
        .bind(&result.id)
        .bind(&result.tenant_id)
        .bind(&result.sample_id)
        .bind(&result.external_lis_result_id)
        .bind(&result.test_code)
        .bind(&result.test_name)
        .bind(&result.value)
        .bind(&result.unit)
        .bind(result.reference_range_low)
        .bind(result.reference_range_high)
        .bind(&result.lis_flags)
        .bind(verification_status_to_str(result.verification_status))
        .bind(result.verification_method.map(verification_method_to_str))
        .bind(upload_status_to_str(result.upload_status))
        .bind(result.upload_failure_count)
        .bind(&result.upload_failure_reason)
        .bind(result.sent_to_lis_at)
        .bind(result.created_at)
        .bind(result.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("result", e))?;
        Ok(result)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<LabResult> {
        let row: Option<ResultRow> = sqlx::query_as("SELECT * FROM results WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err("result", e))?;
        row.ok_or_else(|| IvdError::not_found("result", id))?.into_domain()
    }

    async fn get_by_external_id(&self, tenant_id: &Id, external_lis_result_id: &str) -> IvdResult<Option<LabResult>> {
        let row: Option<ResultRow> =
            sqlx::query_as("SELECT * FROM results WHERE tenant_id = $1 AND external_lis_result_id = $2")
                .bind(tenant_id)
                .bind(external_lis_result_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_err("result", e))?;
        row.map(ResultRow::into_domain).transpose()
    }

    async fn list(&self, tenant_id: &Id, filter: ResultFilter) -> IvdResult<Vec<LabResult>> {
        let rows: Vec<ResultRow> = sqlx::query_as(
            "SELECT * FROM results WHERE tenant_id = $1
               AND ($2::TEXT IS NULL OR verification_status = $2)
               AND ($3::TEXT IS NULL OR upload_status = $3)
               AND ($4::TEXT IS NULL OR sample_id = $4)
             ORDER BY created_at",
        )
        .bind(tenant_id)
        .bind(filter.verification_status.map(verification_status_to_str))
        .bind(filter.upload_status.map(upload_status_to_str))
        .bind(filter.sample_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("result", e))?;
        rows.into_iter().map(ResultRow::into_domain).collect()
    }

    async fn most_recent_prior(
        &self,
        tenant_id: &Id,
        sample_id: &Id,
        test_code: &str,
        exclude_id: &Id,
        lookback_days: i32,
        now: DateTime<Utc>,
    ) -> IvdResult<Option<LabResult>> {
        let cutoff = now - chrono::Duration::days(lookback_days as i64);
        let row: Option<ResultRow> = sqlx::query_as(
            "SELECT * FROM results
             WHERE tenant_id = $1 AND sample_id = $2 AND test_code = $3 AND id != $4 AND created_at >= $5
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(tenant_id)
        .bind(sample_id)
        .bind(test_code)
        .bind(exclude_id)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("result", e))?;
        row.map(ResultRow::into_domain).transpose()
    }

    async fn list_upload_eligible(
        &self,
        tenant_id: &Id,
        upload_verified: bool,
        upload_rejected: bool,
        limit: i64,
    ) -> IvdResult<Vec<LabResult>> {
        let rows: Vec<ResultRow> = sqlx::query_as(
            "SELECT * FROM results
             WHERE tenant_id = $1 AND upload_status = 'pending'
               AND ((verification_status = 'verified' AND $2) OR (verification_status = 'rejected' AND $3))
             ORDER BY created_at
             LIMIT $4",
        )
        .bind(tenant_id)
        .bind(upload_verified)
        .bind(upload_rejected)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("result", e))?;
        rows.into_iter().map(ResultRow::into_domain).collect()
    }

    async fn update(&self, result: LabResult) -> IvdResult<LabResult> {
        let existing = self.get_by_id(&result.tenant_id, &result.id).await?;
        if existing.verification_status.is_terminal() && !result.differs_only_in_upload_fields(&existing) {
            return Err(IvdError::Immutable(format!(
                "result {} is {:?} and cannot be modified",
                result.id, existing.verification_status
            )));
        }
        sqlx::query(
            "UPDATE results SET value = $1, verification_status = $2, verification_method = $3, upload_status = $4,
                                 upload_failure_count = $5, upload_failure_reason = $6, sent_to_lis_at = $7, updated_at = $8
             WHERE id = $9 AND tenant_id = $10",
        )
        .bind(&result.value)
        .bind(verification_status_to_str(result.verification_status))
        .bind(result.verification_method.map(verification_method_to_str))
        .bind(upload_status_to_str(result.upload_status))
        .bind(result.upload_failure_count)
        .bind(&result.upload_failure_reason)
        .bind(result.sent_to_lis_at)
        .bind(result.updated_at)
        .bind(&result.id)
        .bind(&result.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("result", e))?;
        Ok(result)
    }
}
