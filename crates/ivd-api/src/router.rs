//! Route table: wires every handler to its method/path, per the HTTP
//! surface. CORS and request tracing are applied as layers.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth_placeholders, instruments, lis, results, reviews, samples, settings};
use crate::state::AppState;

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/auth/login", post(auth_placeholders::login))
        .route("/auth/me", get(auth_placeholders::me))
        .route("/tenants/with-admin", post(auth_placeholders::create_tenant_with_admin))
        .route("/users", post(auth_placeholders::create_user))
        .route("/samples", post(samples::create_sample).get(samples::list_samples))
        .route("/samples/:id", get(samples::get_sample).put(samples::update_sample))
        .route("/results", post(results::create_result).get(results::list_results))
        .route("/results/:id", get(results::get_result))
        .route("/lis/config", post(lis::create_lis_config).get(lis::get_lis_config))
        .route("/lis/connection-status", post(lis::test_connection))
        .route("/lis/config/upload-settings", put(lis::update_upload_settings))
        .route("/instruments/register", post(instruments::register_instrument))
        .route("/instruments", get(instruments::list_instruments))
        .route(
            "/instruments/:id",
            get(instruments::get_instrument).put(instruments::update_instrument).delete(instruments::delete_instrument),
        )
        .route("/instruments/:id/status", get(instruments::get_instrument_status))
        .route("/instruments/:id/regenerate-token", post(instruments::regenerate_token))
        .route("/instruments/query-host", post(instruments::query_host))
        .route("/instruments/results", post(instruments::submit_result))
        .route("/api/v1/verification", post(settings::create_settings).get(settings::list_settings))
        .route(
            "/api/v1/verification/:test_code",
            get(settings::get_settings).put(settings::update_settings).delete(settings::delete_settings),
        )
        .route("/api/v1/verification/rules", put(settings::toggle_rule))
        .route("/api/v1/reviews/queue", get(reviews::list_queue))
        .route("/api/v1/reviews", post(reviews::create_review))
        .route("/api/v1/reviews/:id", get(reviews::get_review))
        .route("/api/v1/reviews/:id/approve", post(reviews::approve_sample))
        .route("/api/v1/reviews/:id/reject", post(reviews::reject_sample))
        .route("/api/v1/reviews/:id/approve-result", post(reviews::approve_result))
        .route("/api/v1/reviews/:id/reject-result", post(reviews::reject_result))
        .route("/api/v1/reviews/:id/escalate", post(reviews::escalate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
