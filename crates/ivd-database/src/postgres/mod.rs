pub mod instrument;
pub mod lis_config;
pub mod order;
pub mod result;
pub mod review;
pub mod sample;
pub mod settings;
mod util;

pub use instrument::{PgInstrumentQueryRepository, PgInstrumentRepository};
pub use lis_config::PgLisConfigRepository;
pub use order::PgOrderRepository;
pub use result::PgResultRepository;
pub use review::{PgResultDecisionRepository, PgReviewRepository};
pub use sample::PgSampleRepository;
pub use settings::{PgRuleRepository, PgSettingsRepository};
