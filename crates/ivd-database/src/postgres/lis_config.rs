use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::lis_config::{ConnectionStatus, IntegrationModel, LisConfig, LisType};
use ivd_domain::{Id, IvdError, IvdResult};
use ivd_ports::LisConfigRepository;
use sqlx::{FromRow, PgPool};

use super::util::map_err;

#[derive(FromRow)]
struct LisConfigRow {
    id: String,
    tenant_id: String,
    lis_type: String,
    integration_model: String,
    api_endpoint_url: Option<String>,
    api_auth_credentials: Option<String>,
    tenant_api_key: Option<String>,
    pull_interval_minutes: i32,
    connection_status: String,
    connection_failure_count: i32,
    upload_failure_count: i32,
    last_tested_at: Option<DateTime<Utc>>,
    last_successful_retrieval_at: Option<DateTime<Utc>>,
    last_successful_upload_at: Option<DateTime<Utc>>,
    last_upload_failure_at: Option<DateTime<Utc>>,
    auto_upload_enabled: bool,
    upload_verified_results: bool,
    upload_rejected_results: bool,
    upload_batch_size: i32,
    upload_rate_limit: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn lis_type_to_str(lis_type: LisType) -> &'static str {
    match lis_type {
        LisType::Generic => "generic",
        LisType::Hl7 => "hl7",
        LisType::Mock => "mock",
    }
}

fn lis_type_from_str(s: &str) -> IvdResult<LisType> {
    match s {
        "generic" => Ok(LisType::Generic),
        "hl7" => Ok(LisType::Hl7),
        "mock" => Ok(LisType::Mock),
        other => Err(IvdError::Upstream(format!("unknown lis type '{other}'"))),
    }
}

fn integration_model_to_str(model: IntegrationModel) -> &'static str {
    match model {
        IntegrationModel::Push => "push",
        IntegrationModel::Pull => "pull",
    }
}

fn integration_model_from_str(s: &str) -> IvdResult<IntegrationModel> {
    match s {
        "push" => Ok(IntegrationModel::Push),
        "pull" => Ok(IntegrationModel::Pull),
        other => Err(IvdError::Upstream(format!("unknown integration model '{other}'"))),
    }
}

fn connection_status_to_str(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Active => "active",
        ConnectionStatus::Inactive => "inactive",
        ConnectionStatus::Failed => "failed",
    }
}

fn connection_status_from_str(s: &str) -> IvdResult<ConnectionStatus> {
    match s {
        "active" => Ok(ConnectionStatus::Active),
        "inactive" => Ok(ConnectionStatus::Inactive),
        "failed" => Ok(ConnectionStatus::Failed),
        other => Err(IvdError::Upstream(format!("unknown connection status '{other}'"))),
    }
}

impl LisConfigRow {
    fn into_domain(self) -> IvdResult<LisConfig> {
        Ok(LisConfig {
            id: self.id,
            tenant_id: self.tenant_id,
            lis_type: lis_type_from_str(&self.lis_type)?,
            integration_model: integration_model_from_str(&self.integration_model)?,
            api_endpoint_url: self.api_endpoint_url,
            api_auth_credentials: self.api_auth_credentials,
            tenant_api_key: self.tenant_api_key,
            pull_interval_minutes: self.pull_interval_minutes,
            connection_status: connection_status_from_str(&self.connection_status)?,
            connection_failure_count: self.connection_failure_count,
            upload_failure_count: self.upload_failure_count,
            last_tested_at: self.last_tested_at,
            last_successful_retrieval_at: self.last_successful_retrieval_at,
            last_successful_upload_at: self.last_successful_upload_at,
            last_upload_failure_at: self.last_upload_failure_at,
            auto_upload_enabled: self.auto_upload_enabled,
            upload_verified_results: self.upload_verified_results,
            upload_rejected_results: self.upload_rejected_results,
            upload_batch_size: self.upload_batch_size,
            upload_rate_limit: self.upload_rate_limit,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgLisConfigRepository {
    pool: PgPool,
}

impl PgLisConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LisConfigRepository for PgLisConfigRepository {
    async fn create(&self, config: LisConfig) -> IvdResult<LisConfig> {
        sqlx::query(
            "INSERT INTO lis_configs
                (id, tenant_id, lis_type, integration_model, api_endpoint_url, api_auth_credentials, tenant_api_key,
                 pull_interval_minutes, connection_status, connection_failure_count, upload_failure_count,
                 last_tested_at, last_successful_retrieval_at, last_successful_upload_at, last_upload_failure_at,
                 auto_upload_enabled, upload_verified_results, upload_rejected_results, upload_batch_size,
                 upload_rate_limit, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)",
        )
        .bind(&config.id)
        .bind(&config.tenant_id)
        .bind(lis_type_to_str(config.lis_type))
        .bind(integration_model_to_str(config.integration_model))
        .bind(&config.api_endpoint_url)
        .bind(&config.api_auth_credentials)
        .bind(&config.tenant_api_key)
        .bind(config.pull_interval_minutes)
        .bind(connection_status_to_str(config.connection_status))
        .bind(config.connection_failure_count)
        .bind(config.upload_failure_count)
        .bind(config.last_tested_at)
        .bind(config.last_successful_retrieval_at)
        .bind(config.last_successful_upload_at)
        .bind(config.last_upload_failure_at)
        .bind(config.auto_upload_enabled)
        .bind(config.upload_verified_results)
        .bind(config.upload_rejected_results)
        .bind(config.upload_batch_size)
        .bind(config.upload_rate_limit)
        .bind(config.created_at)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("lis_config", e))?;
        Ok(config)
    }

    async fn get_by_tenant(&self, tenant_id: &Id) -> IvdResult<Option<LisConfig>> {
        let row: Option<LisConfigRow> = sqlx::query_as("SELECT * FROM lis_configs WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err("lis_config", e))?;
        row.map(LisConfigRow::into_domain).transpose()
    }

    async fn update(&self, config: LisConfig) -> IvdResult<LisConfig> {
        sqlx::query(
            "UPDATE lis_configs SET
                integration_model = $1, api_endpoint_url = $2, api_auth_credentials = $3, tenant_api_key = $4,
                pull_interval_minutes = $5, connection_status = $6, connection_failure_count = $7,
                upload_failure_count = $8, last_tested_at = $9, last_successful_retrieval_at = $10,
                last_successful_upload_at = $11, last_upload_failure_at = $12, auto_upload_enabled = $13,
                upload_verified_results = $14, upload_rejected_results = $15, upload_batch_size = $16,
                upload_rate_limit = $17, updated_at = $18
             WHERE tenant_id = $19",
        )
        .bind(integration_model_to_str(config.integration_model))
        .bind(&config.api_endpoint_url)
        .bind(&config.api_auth_credentials)
        .bind(&config.tenant_api_key)
        .bind(config.pull_interval_minutes)
        .bind(connection_status_to_str(config.connection_status))
        .bind(config.connection_failure_count)
        .bind(config.upload_failure_count)
        .bind(config.last_tested_at)
        .bind(config.last_successful_retrieval_at)
        .bind(config.last_successful_upload_at)
        .bind(config.last_upload_failure_at)
        .bind(config.auto_upload_enabled)
        .bind(config.upload_verified_results)
        .bind(config.upload_rejected_results)
        .bind(config.upload_batch_size)
        .bind(config.upload_rate_limit)
        .bind(config.updated_at)
        .bind(&config.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("lis_config", e))?;
        Ok(config)
    }
}
