//! Review workflow routes — every action requires reviewer-or-higher.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use ivd_domain::review::{Review, ReviewState};
use ivd_ports::ReviewFilter;
use serde::Deserialize;

use crate::auth::{AuthContext, AuthenticatedUser, Role};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQueueQuery {
    pub state: Option<ReviewState>,
    pub reviewer_user_id: Option<String>,
    #[serde(default)]
    pub escalated_only: bool,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub async fn list_queue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListQueueQuery>,
) -> Result<Json<Vec<Review>>, ApiError> {
    user.require_role(Role::Reviewer)?;
    let reviews = state
        .review
        .list_queue(
            &user.tenant_id,
            ReviewFilter {
                state: query.state,
                reviewer_user_id: query.reviewer_user_id,
                escalated_only: query.escalated_only,
                created_after: None,
                created_before: None,
                limit: query.limit,
                offset: query.offset,
            },
        )
        .await?;
    Ok(Json(reviews))
}

pub async fn get_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Review>, ApiError> {
    user.require_role(Role::Reviewer)?;
    let review = state.review.get_review(&user.tenant_id, &id).await?;
    Ok(Json(review))
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub sample_id: String,
    pub reviewer_user_id: Option<String>,
}

pub async fn create_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    user.require_role(Role::Reviewer)?;
    let review = state.review.create_review(&user.tenant_id, &req.sample_id, req.reviewer_user_id).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[derive(Debug, Deserialize, Default)]
pub struct CommentsBody {
    pub comments: Option<String>,
}

pub async fn approve_sample(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<CommentsBody>,
) -> Result<Json<Review>, ApiError> {
    user.require_role(Role::Reviewer)?;
    let review = state.review.approve_sample(&user.tenant_id, &id, &user.user_id, body.comments).await?;
    Ok(Json(review))
}

#[derive(Debug, Deserialize)]
pub struct RequiredCommentsBody {
    pub comments: String,
}

pub async fn reject_sample(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<RequiredCommentsBody>,
) -> Result<Json<Review>, ApiError> {
    user.require_role(Role::Reviewer)?;
    let review = state.review.reject_sample(&user.tenant_id, &id, &user.user_id, body.comments).await?;
    Ok(Json(review))
}

#[derive(Debug, Deserialize)]
pub struct ResultDecisionBody {
    pub result_id: String,
    pub comments: Option<String>,
}

pub async fn approve_result(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<ResultDecisionBody>,
) -> Result<Json<Review>, ApiError> {
    user.require_role(Role::Reviewer)?;
    let review = state
        .review
        .approve_result(&user.tenant_id, &id, &body.result_id, &user.user_id, body.comments)
        .await?;
    Ok(Json(review))
}

#[derive(Debug, Deserialize)]
pub struct RejectResultBody {
    pub result_id: String,
    pub comments: String,
}

pub async fn reject_result(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<RejectResultBody>,
) -> Result<Json<Review>, ApiError> {
    user.require_role(Role::Reviewer)?;
    let review = state
        .review
        .reject_result(&user.tenant_id, &id, &body.result_id, &user.user_id, body.comments)
        .await?;
    Ok(Json(review))
}

#[derive(Debug, Deserialize)]
pub struct EscalateBody {
    pub reason: String,
}

pub async fn escalate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<EscalateBody>,
) -> Result<Json<Review>, ApiError> {
    user.require_role(Role::Reviewer)?;
    let review = state.review.escalate_review(&user.tenant_id, &id, &user.user_id, body.reason).await?;
    Ok(Json(review))
}
