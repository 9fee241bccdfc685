pub mod auth_placeholders;
pub mod instruments;
pub mod lis;
pub mod results;
pub mod reviews;
pub mod samples;
pub mod settings;
