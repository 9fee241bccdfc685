use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ivd_api::{build_router, AppState, Role, StaticJwtAuthenticator};
use ivd_instrument::{InstrumentIntegrationService, InstrumentRegistry, RepositoryInstrumentAdapter};
use ivd_lis::{LisConfigService, LisIntegrationService};
use ivd_ports::memory::{
    InMemoryInstrumentQueryRepository, InMemoryInstrumentRepository, InMemoryLisConfigRepository,
    InMemoryOrderRepository, InMemoryResultDecisionRepository, InMemoryResultRepository, InMemoryReviewRepository,
    InMemoryRuleRepository, InMemorySampleRepository, InMemorySettingsRepository,
};
use ivd_ports::MockLisAdapter;
use ivd_review::ReviewService;
use ivd_settings::SettingsService;
use ivd_verification::VerificationService;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "router-test-secret-key-value";

fn bearer_token(tenant_id: &str, role: Role) -> String {
    #[derive(serde::Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        tenant_id: &'a str,
        role: &'a str,
        iat: i64,
        exp: i64,
    }
    let role = match role {
        Role::Technician => "technician",
        Role::Reviewer => "reviewer",
        Role::Pathologist => "pathologist",
        Role::Admin => "admin",
    };
    let claims = Claims {
        sub: "user-1",
        tenant_id,
        role,
        iat: chrono::Utc::now().timestamp(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn test_app() -> axum::Router {
    let samples = InMemorySampleRepository::new();
    let orders = InMemoryOrderRepository::new();
    let results = InMemoryResultRepository::new();
    let reviews = InMemoryReviewRepository::new();
    let decisions = InMemoryResultDecisionRepository::new();
    let settings_repo = InMemorySettingsRepository::new();
    let rules = InMemoryRuleRepository::new();
    let lis_configs = InMemoryLisConfigRepository::new();
    let instruments_repo = InMemoryInstrumentRepository::new();
    let instrument_queries = InMemoryInstrumentQueryRepository::new();

    let verification = Arc::new(VerificationService::new(results.clone(), settings_repo.clone(), rules.clone()));
    let review = Arc::new(ReviewService::new(reviews, decisions, results.clone(), samples.clone()));
    let settings = Arc::new(SettingsService::new(settings_repo, rules));

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

    let state = AppState {
        authenticator: Arc::new(StaticJwtAuthenticator::new(SECRET, "HS256")),
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
    };

    build_router(state, tower_http::cors::CorsLayer::permissive())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_does_not_require_auth() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn sample_routes_reject_missing_bearer_token() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/samples").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_and_fetch_sample_round_trip() {
    let app = test_app();
    let token = bearer_token("tenant-1", Role::Technician);

    let create_body = json!({
        "external_lis_id": "LIS-100",
        "patient_id": "patient-1",
        "specimen_type": "blood",
        "collection_date": "2026-01-01T00:00:00Z",
        "received_date": "2026-01-01T01:00:00Z",
    });
    let create_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/samples")
                .header("authorization", format!("Bearer {token}"))
                .header("content-type", "application/json")
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create_response.status(), StatusCode::CREATED);
    let created = body_json(create_response).await;
    let sample_id = created["id"].as_str().unwrap().to_string();

    let get_response = app
        .oneshot(
            Request::builder()
                .uri(format!("/samples/{sample_id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);
    let fetched = body_json(get_response).await;
    assert_eq!(fetched["external_lis_id"], "LIS-100");
}

#[tokio::test]
async fn sample_from_other_tenant_is_not_found() {
    let app = test_app();
    let owner_token = bearer_token("tenant-1", Role::Technician);
    let intruder_token = bearer_token("tenant-2", Role::Technician);

    let create_body = json!({
        "external_lis_id": "LIS-200",
        "patient_id": "patient-2",
        "specimen_type": "urine",
        "collection_date": "2026-01-01T00:00:00Z",
        "received_date": "2026-01-01T01:00:00Z",
    });
    let create_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/samples")
                .header("authorization", format!("Bearer {owner_token}"))
                .header("content-type", "application/json")
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let created = body_json(create_response).await;
    let sample_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/samples/{sample_id}"))
                .header("authorization", format!("Bearer {intruder_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verification_settings_write_requires_admin() {
    let app = test_app();
    let technician_token = bearer_token("tenant-1", Role::Technician);

    let body = json!({
        "test_code": "GLU",
        "test_name": "Glucose",
        "reference_range_low": 70.0,
        "reference_range_high": 110.0,
        "critical_range_low": 40.0,
        "critical_range_high": 400.0,
        "delta_check_threshold_percent": 25.0,
        "delta_check_lookback_days": 7,
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/verification")
                .header("authorization", format!("Bearer {technician_token}"))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_create_verification_settings() {
    let app = test_app();
    let admin_token = bearer_token("tenant-1", Role::Admin);

    let body = json!({
        "test_code": "GLU",
        "test_name": "Glucose",
        "reference_range_low": 70.0,
        "reference_range_high": 110.0,
        "critical_range_low": 40.0,
        "critical_range_high": 400.0,
        "delta_check_threshold_percent": 25.0,
        "delta_check_lookback_days": 7,
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/verification")
                .header("authorization", format!("Bearer {admin_token}"))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn instrument_host_query_rejects_missing_token_header() {
    let app = test_app();
    let body = json!({ "instrument_id": "some-id" });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/instruments/query-host")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
