use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::review::{Review, ReviewDecisionKind, ReviewState, ResultDecision, ResultDecisionKind};
use ivd_domain::{Id, IvdError, IvdResult};
use ivd_ports::{ResultDecisionRepository, ReviewFilter, ReviewRepository};
use sqlx::{FromRow, PgPool};

use super::util::map_err;

#[derive(FromRow)]
struct ReviewRow {
    id: String,
    tenant_id: String,
    sample_id: String,
    reviewer_user_id: Option<String>,
    state: String,
    decision: Option<String>,
    comments: Option<String>,
    escalation_reason: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn state_to_str(state: ReviewState) -> &'static str {
    match state {
        ReviewState::Pending => "pending",
        ReviewState::InProgress => "in_progress",
        ReviewState::Approved => "approved",
        ReviewState::Rejected => "rejected",
        ReviewState::Escalated => "escalated",
    }
}

fn state_from_str(s: &str) -> IvdResult<ReviewState> {
    match s {
        "pending" => Ok(ReviewState::Pending),
        "in_progress" => Ok(ReviewState::InProgress),
        "approved" => Ok(ReviewState::Approved),
        "rejected" => Ok(ReviewState::Rejected),
        "escalated" => Ok(ReviewState::Escalated),
        other => Err(IvdError::Upstream(format!("unknown review state '{other}'"))),
    }
}

fn decision_to_str(decision: ReviewDecisionKind) -> &'static str {
    match decision {
        ReviewDecisionKind::ApproveAll => "approve_all",
        ReviewDecisionKind::RejectAll => "reject_all",
        ReviewDecisionKind::Partial => "partial",
    }
}

fn decision_from_str(s: &str) -> IvdResult<ReviewDecisionKind> {
    match s {
        "approve_all" => Ok(ReviewDecisionKind::ApproveAll),
        "reject_all" => Ok(ReviewDecisionKind::RejectAll),
        "partial" => Ok(ReviewDecisionKind::Partial),
        other => Err(IvdError::Upstream(format!("unknown review decision '{other}'"))),
    }
}

impl ReviewRow {
    fn into_domain(self) -> IvdResult<Review> {
        Ok(Review {
            id: self.id,
            tenant_id: self.tenant_id,
            sample_id: self.sample_id,
            state: state_from_str(&self.state)?,
            decision: self.decision.as_deref().map(decision_from_str).transpose()?,
            reviewer_user_id: self.reviewer_user_id,
            comments: self.comments,
            escalation_reason: self.escalation_reason,
            submitted_at: self.submitted_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn create(&self, tenant_id: Id, sample_id: Id, reviewer_user_id: Option<Id>) -> IvdResult<Review> {
        let review = Review::new(tenant_id, sample_id, reviewer_user_id);
        sqlx::query(
            "INSERT INTO reviews (id, tenant_id, sample_id, reviewer_user_id, state, decision, comments,
                                   escalation_reason, submitted_at, completed_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&review.id)
        .bind(&review.tenant_id)
        .bind(&review.sample_id)
        .bind(&review.reviewer_user_id)
        .bind(state_to_str(review.state))
        .bind(review.decision.map(decision_to_str))
        .bind(&review.comments)
        .bind(&review.escalation_reason)
        .bind(review.submitted_at)
        .bind(review.completed_at)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("review", e))?;
        Ok(review)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Review> {
        let row: Option<ReviewRow> = sqlx::query_as("SELECT * FROM reviews WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err("review", e))?;
        row.ok_or_else(|| IvdError::not_found("review", id))?.into_domain()
    }

    async fn get_by_sample_id(&self, tenant_id: &Id, sample_id: &Id) -> IvdResult<Option<Review>> {
        let row: Option<ReviewRow> = sqlx::query_as("SELECT * FROM reviews WHERE tenant_id = $1 AND sample_id = $2")
            .bind(tenant_id)
            .bind(sample_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err("review", e))?;
        row.map(ReviewRow::into_domain).transpose()
    }

    async fn list(&self, tenant_id: &Id, filter: ReviewFilter) -> IvdResult<Vec<Review>> {
        let limit = if filter.limit > 0 { filter.limit } else { i64::MAX };
        let rows: Vec<ReviewRow> = sqlx::query_as(
            "SELECT * FROM reviews WHERE tenant_id = $1
               AND ($2::TEXT IS NULL OR state = $2)
               AND ($3::TEXT IS NULL OR reviewer_user_id = $3)
               AND ($4 = FALSE OR state = 'escalated')
               AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
               AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
             ORDER BY created_at DESC
             LIMIT $7 OFFSET $8",
        )
        .bind(tenant_id)
        .bind(filter.state.map(state_to_str))
        .bind(&filter.reviewer_user_id)
        .bind(filter.escalated_only)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .bind(limit)
        .bind(filter.offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("review", e))?;
        rows.into_iter().map(ReviewRow::into_domain).collect()
    }

    async fn update(&self, review: Review) -> IvdResult<Review> {
        sqlx::query(
            "UPDATE reviews SET reviewer_user_id = $1, state = $2, decision = $3, comments = $4, escalation_reason = $5,
                                 submitted_at = $6, completed_at = $7, updated_at = $8
             WHERE id = $9 AND tenant_id = $10",
        )
        .bind(&review.reviewer_user_id)
        .bind(state_to_str(review.state))
        .bind(review.decision.map(decision_to_str))
        .bind(&review.comments)
        .bind(&review.escalation_reason)
        .bind(review.submitted_at)
        .bind(review.completed_at)
        .bind(review.updated_at)
        .bind(&review.id)
        .bind(&review.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("review", e))?;
        Ok(review)
    }
}

#[derive(FromRow)]
struct ResultDecisionRow {
    id: String,
    tenant_id: String,
    review_id: String,
    result_id: String,
    decision: String,
    comments: Option<String>,
    decided_by: String,
    created_at: DateTime<Utc>,
}

fn result_decision_kind_to_str(kind: ResultDecisionKind) -> &'static str {
    match kind {
        ResultDecisionKind::Approved => "approved",
        ResultDecisionKind::Rejected => "rejected",
    }
}

fn result_decision_kind_from_str(s: &str) -> IvdResult<ResultDecisionKind> {
    match s {
        "approved" => Ok(ResultDecisionKind::Approved),
        "rejected" => Ok(ResultDecisionKind::Rejected),
        other => Err(IvdError::Upstream(format!("unknown result decision '{other}'"))),
    }
}

impl ResultDecisionRow {
    fn into_domain(self) -> IvdResult<ResultDecision> {
        Ok(ResultDecision {
            id: self.id,
            tenant_id: self.tenant_id,
            review_id: self.review_id,
            result_id: self.result_id,
            decision: result_decision_kind_from_str(&self.decision)?,
            comments: self.comments,
            decided_by: self.decided_by,
            decided_at: self.created_at,
        })
    }
}

pub struct PgResultDecisionRepository {
    pool: PgPool,
}

impl PgResultDecisionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultDecisionRepository for PgResultDecisionRepository {
    async fn create(&self, decision: ResultDecision) -> IvdResult<ResultDecision> {
        sqlx::query(
            "INSERT INTO result_decisions (id, tenant_id, review_id, result_id, decision, comments, decided_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&decision.id)
        .bind(&decision.tenant_id)
        .bind(&decision.review_id)
        .bind(&decision.result_id)
        .bind(result_decision_kind_to_str(decision.decision))
        .bind(&decision.comments)
        .bind(&decision.decided_by)
        .bind(decision.decided_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("result_decision", e))?;
        Ok(decision)
    }

    async fn list_by_review(&self, tenant_id: &Id, review_id: &Id) -> IvdResult<Vec<ResultDecision>> {
        let rows: Vec<ResultDecisionRow> = sqlx::query_as(
            "SELECT * FROM result_decisions WHERE tenant_id = $1 AND review_id = $2 ORDER BY created_at",
        )
        .bind(tenant_id)
        .bind(review_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("result_decision", e))?;
        rows.into_iter().map(ResultDecisionRow::into_domain).collect()
    }
}
