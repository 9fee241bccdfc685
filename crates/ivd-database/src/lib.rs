//! Postgres realizations of the repository ports, behind the `sqlx` runtime
//! query API. Parameterized against the same contract tests as the
//! in-memory realizations in `ivd-ports::memory`.

pub mod pool;
pub mod postgres;

pub use pool::PgClient;
pub use postgres::{
    PgInstrumentQueryRepository, PgInstrumentRepository, PgLisConfigRepository, PgOrderRepository,
    PgResultDecisionRepository, PgResultRepository, PgReviewRepository, PgRuleRepository, PgSampleRepository,
    PgSettingsRepository,
};
