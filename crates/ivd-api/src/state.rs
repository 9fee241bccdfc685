//! `AppState`: the per-process service bundle axum hands to every handler
//! via `State<AppState>`. Built once in `ivd-server` from an `AppContext`
//! and cloned (all fields are `Arc`) into the router.

use std::sync::Arc;

use axum::extract::FromRef;
use ivd_instrument::{InstrumentIntegrationService, InstrumentRegistry};
use ivd_lis::{LisConfigService, LisIntegrationService};
use ivd_ports::{OrderRepository, ResultRepository, SampleRepository};
use ivd_review::ReviewService;
use ivd_settings::SettingsService;
use ivd_verification::VerificationService;

use crate::auth::StaticJwtAuthenticator;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<StaticJwtAuthenticator>,
    pub samples: Arc<dyn SampleRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub verification: Arc<VerificationService>,
    pub review: Arc<ReviewService>,
    pub lis_config: Arc<LisConfigService>,
    pub lis_integration: Arc<LisIntegrationService>,
    pub instruments: Arc<InstrumentRegistry>,
    pub instrument_integration: Arc<InstrumentIntegrationService>,
    pub settings: Arc<SettingsService>,
}

impl FromRef<AppState> for StaticJwtAuthenticator {
    fn from_ref(state: &AppState) -> Self {
        (*state.authenticator).clone()
    }
}
