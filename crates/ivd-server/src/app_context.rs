//! `AppContext`: built once at startup from `AppConfig`, holds the database
//! pool, adapters and every service. `ivd-api::AppState` is constructed
//! from it and cloned into the router.

use std::sync::Arc;

use ivd_api::{AppState, StaticJwtAuthenticator};
use ivd_config::AppConfig;
use ivd_database::{
    PgClient, PgInstrumentQueryRepository, PgInstrumentRepository, PgLisConfigRepository, PgOrderRepository,
    PgResultDecisionRepository, PgResultRepository, PgReviewRepository, PgRuleRepository, PgSampleRepository,
    PgSettingsRepository,
};
use ivd_domain::IvdResult;
use ivd_instrument::{InstrumentIntegrationService, InstrumentRegistry, RepositoryInstrumentAdapter};
use ivd_lis::{LisConfigService, LisIntegrationService};
use ivd_ports::{MockLisAdapter, OrderRepository, ResultRepository, SampleRepository};
use ivd_review::ReviewService;
use ivd_settings::SettingsService;
use ivd_verification::VerificationService;

/// Process-lifetime context: one instance, shared across the HTTP server
/// and every background worker.
pub struct AppContext {
    pub config: AppConfig,
    pub db: PgClient,
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

impl AppContext {
    pub async fn build(config: AppConfig) -> IvdResult<Self> {
        let db = PgClient::connect(&config.database.url, config.database.max_connections).await?;
        db.run_migrations().await?;
        let pool = db.pool().clone();

        let samples: Arc<dyn SampleRepository> = Arc::new(PgSampleRepository::new(pool.clone()));
        let orders: Arc<dyn OrderRepository> = Arc::new(PgOrderRepository::new(pool.clone()));
        let results: Arc<dyn ResultRepository> = Arc::new(PgResultRepository::new(pool.clone()));
        let reviews = Arc::new(PgReviewRepository::new(pool.clone()));
        let decisions = Arc::new(PgResultDecisionRepository::new(pool.clone()));
        let rules = Arc::new(PgRuleRepository::new(pool.clone()));
        let settings_repo = Arc::new(PgSettingsRepository::new(pool.clone()));
        let lis_configs = Arc::new(PgLisConfigRepository::new(pool.clone()));
        let instruments_repo = Arc::new(PgInstrumentRepository::new(pool.clone()));
        let instrument_queries = Arc::new(PgInstrumentQueryRepository::new(pool.clone()));

        let verification = Arc::new(VerificationService::new(results.clone(), settings_repo.clone(), rules.clone()));
        let review = Arc::new(ReviewService::new(reviews, decisions, results.clone(), samples.clone()));
        let settings = Arc::new(SettingsService::new(settings_repo, rules.clone()));

        let lis_adapter = Arc::new(MockLisAdapter::default());
        let lis_config = Arc::new(LisConfigService::new(lis_configs.clone(), lis_adapter.clone()));
        let lis_integration = Arc::new(LisIntegrationService::new(
            samples.clone(),
            results.clone(),
            lis_configs,
            lis_adapter,
            verification.clone(),
        ));

        let instruments = Arc::new(InstrumentRegistry::new(instruments_repo.clone()));
        let instrument_adapter = Arc::new(RepositoryInstrumentAdapter::new(orders.clone(), results.clone(), verification.clone()));
        let instrument_integration = Arc::new(InstrumentIntegrationService::new(
            instruments_repo,
            instrument_queries,
            instrument_adapter,
        ));

        Ok(Self {
            config,
            db,
            samples,
            orders,
            results,
            verification,
            review,
            lis_config,
            lis_integration,
            instruments,
            instrument_integration,
            settings,
        })
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            authenticator: Arc::new(StaticJwtAuthenticator::new(&self.config.security.secret_key, &self.config.security.jwt_algorithm)),
            samples: self.samples.clone(),
            orders: self.orders.clone(),
            results: self.results.clone(),
            verification: self.verification.clone(),
            review: self.review.clone(),
            lis_config: self.lis_config.clone(),
            lis_integration: self.lis_integration.clone(),
            instruments: self.instruments.clone(),
            instrument_integration: self.instrument_integration.clone(),
            settings: self.settings.clone(),
        }
    }
}
