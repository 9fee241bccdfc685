//! Review and ResultDecision entities — the sample-scoped human workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IvdError, IvdResult};
use crate::ids::{new_id, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Pending,
    InProgress,
    Approved,
    Rejected,
    Escalated,
}

impl ReviewState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReviewState::Approved | ReviewState::Rejected)
    }

    /// `pending -> {in_progress, approved, rejected, escalated}`,
    /// `in_progress -> {approved, rejected, escalated}`,
    /// `escalated -> {approved, rejected}`, both terminal states have no
    /// outgoing transitions.
    pub fn can_transition_to(self, next: ReviewState) -> bool {
        use ReviewState::*;
        match self {
            Pending => matches!(next, InProgress | Approved | Rejected | Escalated),
            InProgress => matches!(next, Approved | Rejected | Escalated),
            Escalated => matches!(next, Approved | Rejected),
            Approved | Rejected => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecisionKind {
    ApproveAll,
    RejectAll,
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Id,
    pub tenant_id: Id,
    pub sample_id: Id,
    pub state: ReviewState,
    pub decision: Option<ReviewDecisionKind>,
    pub reviewer_user_id: Option<Id>,
    pub comments: Option<String>,
    pub escalation_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(tenant_id: Id, sample_id: Id, reviewer_user_id: Option<Id>) -> Self {
        let now = Utc::now();
        let state = if reviewer_user_id.is_some() {
            ReviewState::InProgress
        } else {
            ReviewState::Pending
        };
        Self {
            id: new_id(),
            tenant_id,
            sample_id,
            state,
            decision: None,
            reviewer_user_id,
            comments: None,
            escalation_reason: None,
            submitted_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Any mutation on a terminal review must fail with
    /// `cannot-be-modified`, independent of which transition was requested.
    pub fn ensure_mutable(&self) -> IvdResult<()> {
        if self.state.is_terminal() {
            return Err(IvdError::Immutable(format!(
                "review {} is {:?} and cannot be modified",
                self.id, self.state
            )));
        }
        Ok(())
    }

    pub fn transition_to(&mut self, next: ReviewState) -> IvdResult<()> {
        self.ensure_mutable()?;
        if !self.state.can_transition_to(next) {
            return Err(IvdError::InvalidTransition(format!(
                "cannot transition review from {:?} to {:?}",
                self.state, next
            )));
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultDecisionKind {
    Approved,
    Rejected,
}

/// Immutable per-result verdict inside a Review. The repository exposes no
/// update operation — once written, only readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDecision {
    pub id: Id,
    pub tenant_id: Id,
    pub review_id: Id,
    pub result_id: Id,
    pub decision: ResultDecisionKind,
    pub comments: Option<String>,
    pub decided_by: Id,
    pub decided_at: DateTime<Utc>,
}

impl ResultDecision {
    pub fn new(
        tenant_id: Id,
        review_id: Id,
        result_id: Id,
        decision: ResultDecisionKind,
        comments: Option<String>,
        decided_by: Id,
    ) -> Self {
        Self {
            id: new_id(),
            tenant_id,
            review_id,
            result_id,
            decision,
            comments,
            decided_by,
            decided_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_without_reviewer() {
        let review = Review::new("t1".into(), "s1".into(), None);
        assert_eq!(review.state, ReviewState::Pending);
    }

    #[test]
    fn in_progress_with_reviewer() {
        let review = Review::new("t1".into(), "s1".into(), Some("u1".into()));
        assert_eq!(review.state, ReviewState::InProgress);
    }

    #[test]
    fn escalated_can_still_terminate() {
        let mut review = Review::new("t1".into(), "s1".into(), Some("u1".into()));
        review.transition_to(ReviewState::Escalated).unwrap();
        review.transition_to(ReviewState::Approved).unwrap();
        assert!(review.transition_to(ReviewState::Rejected).is_err());
    }

    #[test]
    fn terminal_review_rejects_any_mutation() {
        let mut review = Review::new("t1".into(), "s1".into(), Some("u1".into()));
        review.transition_to(ReviewState::Approved).unwrap();
        let err = review.transition_to(ReviewState::Escalated).unwrap_err();
        assert!(matches!(err, IvdError::Immutable(_)));
    }
}
