//! Instrument registry: create/list/update/token lifecycle.

use std::sync::Arc;

use ivd_domain::instrument::{Instrument, InstrumentStatus, InstrumentType};
use ivd_domain::{Id, IvdError, IvdResult};
use ivd_ports::InstrumentRepository;
use tracing::instrument;

pub struct InstrumentRegistry {
    instruments: Arc<dyn InstrumentRepository>,
}

impl InstrumentRegistry {
    pub fn new(instruments: Arc<dyn InstrumentRepository>) -> Self {
        Self { instruments }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, name = %name))]
    pub async fn register(
        &self,
        tenant_id: &Id,
        name: String,
        instrument_type: InstrumentType,
        api_token: Option<String>,
    ) -> IvdResult<Instrument> {
        if self.instruments.get_by_name(tenant_id, &name).await?.is_some() {
            return Err(IvdError::Conflict(format!("instrument '{name}' already exists for tenant")));
        }
        let instrument = Instrument::new(tenant_id.clone(), name, instrument_type, api_token);
        if self.instruments.get_by_api_token(&instrument.api_token).await?.is_some() {
            return Err(IvdError::Conflict("api_token already in use".to_string()));
        }
        self.instruments.create(instrument).await
    }

    pub async fn get(&self, tenant_id: &Id, id: &Id) -> IvdResult<Instrument> {
        self.instruments.get_by_id(tenant_id, id).await
    }

    pub async fn list(&self, tenant_id: &Id, status: Option<InstrumentStatus>) -> IvdResult<Vec<Instrument>> {
        self.instruments.list(tenant_id, status).await
    }

    pub async fn rename(&self, tenant_id: &Id, id: &Id, name: String) -> IvdResult<Instrument> {
        let mut instrument = self.instruments.get_by_id(tenant_id, id).await?;
        if let Some(existing) = self.instruments.get_by_name(tenant_id, &name).await? {
            if existing.id != *id {
                return Err(IvdError::Conflict(format!("instrument '{name}' already exists for tenant")));
            }
        }
        instrument.name = name;
        instrument.updated_at = chrono::Utc::now();
        self.instruments.update(instrument).await
    }

    pub async fn regenerate_token(&self, tenant_id: &Id, id: &Id) -> IvdResult<Instrument> {
        let mut instrument = self.instruments.get_by_id(tenant_id, id).await?;
        instrument.regenerate_api_token();
        self.instruments.update(instrument).await
    }

    pub async fn deactivate(&self, tenant_id: &Id, id: &Id) -> IvdResult<()> {
        self.instruments.soft_delete(tenant_id, id).await
    }

    /// Resolve an incoming `X-Instrument-Token` to its owning Instrument.
    /// Unknown token -> `Unauthorized`; known token but not `active` ->
    /// `Forbidden`.
    pub async fn authenticate(&self, api_token: &str) -> IvdResult<Instrument> {
        let instrument = self
            .instruments
            .get_by_api_token(api_token)
            .await?
            .ok_or_else(|| IvdError::Unauthorized("unknown instrument token".to_string()))?;
        if instrument.status != InstrumentStatus::Active {
            return Err(IvdError::Forbidden(format!("instrument is {:?}", instrument.status)));
        }
        Ok(instrument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivd_ports::memory::InMemoryInstrumentRepository;

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let registry = InstrumentRegistry::new(InMemoryInstrumentRepository::new());
        registry.register(&"t1".to_string(), "Analyzer 1".into(), InstrumentType::Chemistry, None).await.unwrap();
        let err = registry
            .register(&"t1".to_string(), "Analyzer 1".into(), InstrumentType::Chemistry, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IvdError::Conflict(_)));
    }

    #[tokio::test]
    async fn inactive_instrument_is_forbidden_not_unauthorized() {
        let registry = InstrumentRegistry::new(InMemoryInstrumentRepository::new());
        let instrument = registry
            .register(&"t1".to_string(), "Analyzer 1".into(), InstrumentType::Chemistry, None)
            .await
            .unwrap();
        let err = registry.authenticate(&instrument.api_token).await.unwrap_err();
        assert!(matches!(err, IvdError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let registry = InstrumentRegistry::new(InMemoryInstrumentRepository::new());
        let err = registry.authenticate("bogus-token").await.unwrap_err();
        assert!(matches!(err, IvdError::Unauthorized(_)));
    }
}
