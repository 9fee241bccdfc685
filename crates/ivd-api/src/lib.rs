//! IVD Middleware - HTTP Boundary
//!
//! Bearer JWT auth extraction, the `AuthContext` capability surface, route
//! table, and the single `IvdError -> StatusCode` mapping.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use auth::{AuthContext, AuthenticatedUser, Role, StaticJwtAuthenticator};
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
