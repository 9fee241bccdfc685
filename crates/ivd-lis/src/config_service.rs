//! LIS config lifecycle: one LISConfig per tenant, connection testing,
//! key regeneration, and upload settings.

use std::sync::Arc;

use ivd_domain::lis_config::{IntegrationModel, LisConfig, NewLisConfig};
use ivd_domain::{Id, IvdError, IvdResult};
use ivd_ports::{LisAdapter, LisConfigRepository};
use tracing::{info, instrument};

pub struct LisConfigService {
    configs: Arc<dyn LisConfigRepository>,
    adapter: Arc<dyn LisAdapter>,
}

impl LisConfigService {
    pub fn new(configs: Arc<dyn LisConfigRepository>, adapter: Arc<dyn LisAdapter>) -> Self {
        Self { configs, adapter }
    }

    pub async fn create_configuration(&self, input: NewLisConfig) -> IvdResult<LisConfig> {
        if self.configs.get_by_tenant(&input.tenant_id).await?.is_some() {
            return Err(IvdError::Conflict(format!(
                "LIS config already exists for tenant {}",
                input.tenant_id
            )));
        }
        let config = LisConfig::new(input)?;
        self.configs.create(config).await
    }

    pub async fn get_configuration(&self, tenant_id: &Id) -> IvdResult<LisConfig> {
        self.configs
            .get_by_tenant(tenant_id)
            .await?
            .ok_or_else(|| IvdError::not_found("LIS config", tenant_id))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn test_connection(&self, tenant_id: &Id) -> IvdResult<LisConfig> {
        let mut config = self.get_configuration(tenant_id).await?;
        match self.adapter.test_connection().await {
            Ok(result) if result.is_connected => config.record_connection_success(),
            _ => config.record_connection_failure(),
        }
        let config = self.configs.update(config).await?;
        info!(status = ?config.connection_status, "LIS connection tested");
        Ok(config)
    }

    pub async fn regenerate_api_key(&self, tenant_id: &Id) -> IvdResult<LisConfig> {
        let mut config = self.get_configuration(tenant_id).await?;
        config.regenerate_api_key()?;
        self.configs.update(config).await
    }

    pub async fn set_integration_model(&self, tenant_id: &Id, model: IntegrationModel) -> IvdResult<LisConfig> {
        let mut config = self.get_configuration(tenant_id).await?;
        config.set_integration_model(model);
        self.configs.update(config).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_upload_settings(
        &self,
        tenant_id: &Id,
        auto_upload_enabled: bool,
        upload_verified_results: bool,
        upload_rejected_results: bool,
        upload_batch_size: i32,
        upload_rate_limit: i32,
    ) -> IvdResult<LisConfig> {
        let mut config = self.get_configuration(tenant_id).await?;
        config.update_upload_settings(
            auto_upload_enabled,
            upload_verified_results,
            upload_rejected_results,
            upload_batch_size,
            upload_rate_limit,
        );
        self.configs.update(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivd_ports::memory::InMemoryLisConfigRepository;
    use ivd_ports::MockLisAdapter;

    fn pull_input() -> NewLisConfig {
        NewLisConfig {
            tenant_id: "t1".into(),
            lis_type: ivd_domain::lis_config::LisType::Generic,
            integration_model: IntegrationModel::Pull,
            api_endpoint_url: Some("https://lis.example.test".into()),
            api_auth_credentials: None,
            pull_interval_minutes: 5,
        }
    }

    #[tokio::test]
    async fn second_create_for_same_tenant_conflicts() {
        let configs = InMemoryLisConfigRepository::new();
        let adapter = Arc::new(MockLisAdapter::default());
        let service = LisConfigService::new(configs, adapter);
        service.create_configuration(pull_input()).await.unwrap();
        let err = service.create_configuration(pull_input()).await.unwrap_err();
        assert!(matches!(err, IvdError::Conflict(_)));
    }

    #[tokio::test]
    async fn successful_test_connection_marks_active() {
        let configs = InMemoryLisConfigRepository::new();
        let adapter = Arc::new(MockLisAdapter::default());
        let service = LisConfigService::new(configs, adapter);
        service.create_configuration(pull_input()).await.unwrap();
        let config = service.test_connection(&"t1".to_string()).await.unwrap();
        assert_eq!(config.connection_status, ivd_domain::ConnectionStatus::Active);
    }
}
