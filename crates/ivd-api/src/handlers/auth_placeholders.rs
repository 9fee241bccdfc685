//! `/auth/*`, `/tenants/with-admin`, `/users` — documented placeholders.
//! Issuance and tenant/user persistence stay out of scope; these exist so
//! the route table is complete and testable without claiming ownership of
//! a capability this crate doesn't implement.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{AuthContext, AuthenticatedUser};

async fn not_implemented() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_IMPLEMENTED, Json(json!({ "error": "not implemented: issuance is out of scope" })))
}

pub async fn login() -> (StatusCode, Json<Value>) {
    not_implemented().await
}

pub async fn me(user: AuthenticatedUser) -> Json<Value> {
    Json(json!({
        "tenant_id": user.tenant_id(),
        "user_id": user.user_id(),
        "role": user.role(),
    }))
}

pub async fn create_tenant_with_admin() -> (StatusCode, Json<Value>) {
    not_implemented().await
}

pub async fn create_user() -> (StatusCode, Json<Value>) {
    not_implemented().await
}
