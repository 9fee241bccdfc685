//! LISConfig entity — one per tenant, the bidirectional LIS integration state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IvdError, IvdResult};
use crate::ids::{new_id, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LisType {
    Generic,
    Hl7,
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationModel {
    Push,
    Pull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Active,
    Inactive,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LisConfig {
    pub id: Id,
    pub tenant_id: Id,
    pub lis_type: LisType,
    pub integration_model: IntegrationModel,
    pub api_endpoint_url: Option<String>,
    pub api_auth_credentials: Option<String>,
    pub tenant_api_key: Option<String>,
    pub pull_interval_minutes: i32,
    pub connection_status: ConnectionStatus,
    pub connection_failure_count: i32,
    pub upload_failure_count: i32,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_successful_retrieval_at: Option<DateTime<Utc>>,
    pub last_successful_upload_at: Option<DateTime<Utc>>,
    pub last_upload_failure_at: Option<DateTime<Utc>>,
    pub auto_upload_enabled: bool,
    pub upload_verified_results: bool,
    pub upload_rejected_results: bool,
    pub upload_batch_size: i32,
    pub upload_rate_limit: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewLisConfig {
    pub tenant_id: Id,
    pub lis_type: LisType,
    pub integration_model: IntegrationModel,
    pub api_endpoint_url: Option<String>,
    pub api_auth_credentials: Option<String>,
    pub pull_interval_minutes: i32,
}

/// 32 bytes of randomness, URL-safe, matching §6's instrument-token
/// generation contract — reused here since a `tenant_api_key` carries the
/// same bearer-token shape.
pub fn generate_api_key() -> String {
    Uuid::new_v4().to_string()
}

impl LisConfig {
    pub fn new(mut input: NewLisConfig) -> IvdResult<Self> {
        // A `mock` LIS type always runs pull, against the mock endpoint —
        // it overrides whatever integration model was requested.
        if input.lis_type == LisType::Mock {
            input.integration_model = IntegrationModel::Pull;
            input.api_endpoint_url = Some("mock://lis".to_string());
        }

        if input.integration_model == IntegrationModel::Pull && input.api_endpoint_url.is_none() {
            return Err(IvdError::InvalidConfiguration(
                "pull integration model requires api_endpoint_url".to_string(),
            ));
        }

        let tenant_api_key = match input.integration_model {
            IntegrationModel::Push => Some(generate_api_key()),
            IntegrationModel::Pull => None,
        };

        let now = Utc::now();
        Ok(Self {
            id: new_id(),
            tenant_id: input.tenant_id,
            lis_type: input.lis_type,
            integration_model: input.integration_model,
            api_endpoint_url: input.api_endpoint_url,
            api_auth_credentials: input.api_auth_credentials,
            tenant_api_key,
            pull_interval_minutes: input.pull_interval_minutes,
            connection_status: ConnectionStatus::Inactive,
            connection_failure_count: 0,
            upload_failure_count: 0,
            last_tested_at: None,
            last_successful_retrieval_at: None,
            last_successful_upload_at: None,
            last_upload_failure_at: None,
            auto_upload_enabled: false,
            upload_verified_results: true,
            upload_rejected_results: false,
            upload_batch_size: 100,
            upload_rate_limit: 100,
            created_at: now,
            updated_at: now,
        })
    }

    /// 3-strike policy: any success zeroes the counter and goes `active`;
    /// at 3 consecutive failures the connection is `failed`, otherwise
    /// `inactive`.
    pub fn record_connection_success(&mut self) {
        self.connection_failure_count = 0;
        self.connection_status = ConnectionStatus::Active;
        self.last_tested_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn record_connection_failure(&mut self) {
        self.connection_failure_count += 1;
        self.connection_status = if self.connection_failure_count >= 3 {
            ConnectionStatus::Failed
        } else {
            ConnectionStatus::Inactive
        };
        self.last_tested_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn record_successful_retrieval(&mut self) {
        self.last_successful_retrieval_at = Some(Utc::now());
        self.record_connection_success();
    }

    pub fn record_retrieval_failure(&mut self) {
        self.record_connection_failure();
    }

    pub fn record_successful_upload(&mut self) {
        self.last_successful_upload_at = Some(Utc::now());
        self.upload_failure_count = 0;
        self.updated_at = Utc::now();
    }

    pub fn record_upload_failure(&mut self) {
        self.last_upload_failure_at = Some(Utc::now());
        self.upload_failure_count += 1;
        self.updated_at = Utc::now();
    }

    /// Regenerating the key is only permitted in push mode.
    pub fn regenerate_api_key(&mut self) -> IvdResult<()> {
        if self.integration_model != IntegrationModel::Push {
            return Err(IvdError::InvalidConfiguration(
                "cannot regenerate API key outside push mode".to_string(),
            ));
        }
        self.tenant_api_key = Some(generate_api_key());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Switching pull -> push issues a key iff none exists yet.
    pub fn set_integration_model(&mut self, model: IntegrationModel) {
        self.integration_model = model;
        if model == IntegrationModel::Push && self.tenant_api_key.is_none() {
            self.tenant_api_key = Some(generate_api_key());
        }
        self.updated_at = Utc::now();
    }

    pub fn update_upload_settings(
        &mut self,
        auto_upload_enabled: bool,
        upload_verified_results: bool,
        upload_rejected_results: bool,
        upload_batch_size: i32,
        upload_rate_limit: i32,
    ) {
        self.auto_upload_enabled = auto_upload_enabled;
        self.upload_verified_results = upload_verified_results;
        self.upload_rejected_results = upload_rejected_results;
        self.upload_batch_size = upload_batch_size;
        self.upload_rate_limit = upload_rate_limit;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull_input() -> NewLisConfig {
        NewLisConfig {
            tenant_id: "t1".into(),
            lis_type: LisType::Generic,
            integration_model: IntegrationModel::Pull,
            api_endpoint_url: Some("https://lis.example.test".into()),
            api_auth_credentials: None,
            pull_interval_minutes: 5,
        }
    }

    #[test]
    fn pull_requires_endpoint() {
        let mut input = pull_input();
        input.api_endpoint_url = None;
        assert!(LisConfig::new(input).is_err());
    }

    #[test]
    fn push_issues_key() {
        let mut input = pull_input();
        input.integration_model = IntegrationModel::Push;
        input.api_endpoint_url = None;
        let config = LisConfig::new(input).unwrap();
        assert!(config.tenant_api_key.is_some());
    }

    #[test]
    fn mock_forces_pull() {
        let mut input = pull_input();
        input.lis_type = LisType::Mock;
        input.integration_model = IntegrationModel::Push;
        input.api_endpoint_url = None;
        let config = LisConfig::new(input).unwrap();
        assert_eq!(config.integration_model, IntegrationModel::Pull);
        assert_eq!(config.api_endpoint_url.as_deref(), Some("mock://lis"));
    }

    #[test]
    fn three_strikes_marks_failed() {
        let mut config = LisConfig::new(pull_input()).unwrap();
        config.record_connection_failure();
        config.record_connection_failure();
        assert_eq!(config.connection_status, ConnectionStatus::Inactive);
        config.record_connection_failure();
        assert_eq!(config.connection_status, ConnectionStatus::Failed);
    }

    #[test]
    fn regenerate_key_requires_push() {
        let mut config = LisConfig::new(pull_input()).unwrap();
        assert!(config.regenerate_api_key().is_err());
    }
}
