//! Review Workflow: the sample-scoped review state machine, per-result
//! decisions, escalation, and auto-completion on full decision coverage.

use std::sync::Arc;

use chrono::Utc;
use ivd_domain::result::VerificationStatus;
use ivd_domain::review::{ReviewDecisionKind, ReviewState};
use ivd_domain::sample::SampleStatus;
use ivd_domain::{Id, IvdError, IvdResult, Review, ResultDecision, ResultDecisionKind, VerificationMethod};
use ivd_ports::{ResultDecisionRepository, ResultFilter, ResultRepository, ReviewFilter, ReviewRepository, SampleRepository};
use tracing::{info, instrument, warn};

pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    decisions: Arc<dyn ResultDecisionRepository>,
    results: Arc<dyn ResultRepository>,
    samples: Arc<dyn SampleRepository>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        decisions: Arc<dyn ResultDecisionRepository>,
        results: Arc<dyn ResultRepository>,
        samples: Arc<dyn SampleRepository>,
    ) -> Self {
        Self { reviews, decisions, results, samples }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, sample_id = %sample_id))]
    pub async fn create_review(
        &self,
        tenant_id: &Id,
        sample_id: &Id,
        reviewer_user_id: Option<Id>,
    ) -> IvdResult<Review> {
        self.samples.get_by_id(tenant_id, sample_id).await?;
        if self.reviews.get_by_sample_id(tenant_id, sample_id).await?.is_some() {
            return Err(IvdError::Conflict(format!("a review already exists for sample {sample_id}")));
        }
        self.reviews
            .create(tenant_id.clone(), sample_id.clone(), reviewer_user_id)
            .await
    }

    pub async fn get_review(&self, tenant_id: &Id, review_id: &Id) -> IvdResult<Review> {
        self.reviews.get_by_id(tenant_id, review_id).await
    }

    pub async fn list_queue(&self, tenant_id: &Id, filter: ReviewFilter) -> IvdResult<Vec<Review>> {
        self.reviews.list(tenant_id, filter).await
    }

    /// Approve every `needs_review` result of the review's sample in one pass.
    /// Preserves the source's behavior of completing the review even when no
    /// result needed manual review.
    pub async fn approve_sample(&self, tenant_id: &Id, review_id: &Id, user_id: &Id, comments: Option<String>) -> IvdResult<Review> {
        self.bulk_sample_decision(tenant_id, review_id, user_id, comments, ResultDecisionKind::Approved)
            .await
    }

    /// Symmetric to `approve_sample`; comments are required.
    pub async fn reject_sample(&self, tenant_id: &Id, review_id: &Id, user_id: &Id, comments: String) -> IvdResult<Review> {
        if comments.trim().is_empty() {
            return Err(IvdError::InvalidInput("comments are required to reject a sample".to_string()));
        }
        self.bulk_sample_decision(tenant_id, review_id, user_id, Some(comments), ResultDecisionKind::Rejected)
            .await
    }

    async fn bulk_sample_decision(
        &self,
        tenant_id: &Id,
        review_id: &Id,
        user_id: &Id,
        comments: Option<String>,
        decision_kind: ResultDecisionKind,
    ) -> IvdResult<Review> {
        let mut review = self.reviews.get_by_id(tenant_id, review_id).await?;
        review.ensure_mutable()?;

        let pending = self
            .results
            .list(
                tenant_id,
                ResultFilter {
                    verification_status: Some(VerificationStatus::NeedsReview),
                    sample_id: Some(review.sample_id.clone()),
                    ..Default::default()
                },
            )
            .await?;

        if pending.is_empty() {
            warn!("sample-wide decision recorded with zero needs_review results");
        }

        let new_status = match decision_kind {
            ResultDecisionKind::Approved => VerificationStatus::Verified,
            ResultDecisionKind::Rejected => VerificationStatus::Rejected,
        };

        for mut result in pending {
            let decision = ResultDecision::new(
                tenant_id.clone(),
                review_id.clone(),
                result.id.clone(),
                decision_kind,
                comments.clone(),
                user_id.clone(),
            );
            self.decisions.create(decision).await?;
            result.set_verification_status(new_status, Some(VerificationMethod::Manual))?;
            self.results.update(result).await?;
        }

        let (state, review_decision, sample_status) = match decision_kind {
            ResultDecisionKind::Approved => (ReviewState::Approved, ReviewDecisionKind::ApproveAll, SampleStatus::Verified),
            ResultDecisionKind::Rejected => (ReviewState::Rejected, ReviewDecisionKind::RejectAll, SampleStatus::Rejected),
        };

        let now = Utc::now();
        review.state = state;
        review.decision = Some(review_decision);
        review.comments = comments;
        if review.submitted_at.is_none() {
            review.submitted_at = Some(now);
        }
        review.completed_at = Some(now);
        review.updated_at = now;
        let review = self.reviews.update(review).await?;

        let mut sample = self.samples.get_by_id(tenant_id, &review.sample_id).await?;
        sample.set_status(sample_status);
        self.samples.update(sample).await?;

        info!(state = ?review.state, "review completed via sample-wide decision");
        Ok(review)
    }

    pub async fn approve_result(&self, tenant_id: &Id, review_id: &Id, result_id: &Id, user_id: &Id, comments: Option<String>) -> IvdResult<Review> {
        self.per_result_decision(tenant_id, review_id, result_id, user_id, comments, ResultDecisionKind::Approved)
            .await
    }

    pub async fn reject_result(&self, tenant_id: &Id, review_id: &Id, result_id: &Id, user_id: &Id, comments: String) -> IvdResult<Review> {
        if comments.trim().is_empty() {
            return Err(IvdError::InvalidInput("comments are required to reject a result".to_string()));
        }
        self.per_result_decision(tenant_id, review_id, result_id, user_id, Some(comments), ResultDecisionKind::Rejected)
            .await
    }

    async fn per_result_decision(
        &self,
        tenant_id: &Id,
        review_id: &Id,
        result_id: &Id,
        user_id: &Id,
        comments: Option<String>,
        decision_kind: ResultDecisionKind,
    ) -> IvdResult<Review> {
        let review = self.reviews.get_by_id(tenant_id, review_id).await?;
        review.ensure_mutable()?;

        let mut result = self.results.get_by_id(tenant_id, result_id).await?;
        if result.sample_id != review.sample_id {
            return Err(IvdError::InvalidInput(format!(
                "result {result_id} does not belong to review {review_id}'s sample"
            )));
        }

        let decision = ResultDecision::new(
            tenant_id.clone(),
            review_id.clone(),
            result_id.clone(),
            decision_kind,
            comments,
            user_id.clone(),
        );
        self.decisions.create(decision).await?;

        let new_status = match decision_kind {
            ResultDecisionKind::Approved => VerificationStatus::Verified,
            ResultDecisionKind::Rejected => VerificationStatus::Rejected,
        };
        result.set_verification_status(new_status, Some(VerificationMethod::Manual))?;
        self.results.update(result).await?;

        self.try_auto_complete(tenant_id, review_id).await
    }

    pub async fn escalate_review(&self, tenant_id: &Id, review_id: &Id, _user_id: &Id, reason: String) -> IvdResult<Review> {
        if reason.trim().is_empty() {
            return Err(IvdError::InvalidInput("an escalation reason is required".to_string()));
        }
        let mut review = self.reviews.get_by_id(tenant_id, review_id).await?;
        review.transition_to(ReviewState::Escalated)?;
        review.escalation_reason = Some(reason);
        if review.submitted_at.is_none() {
            review.submitted_at = Some(Utc::now());
        }
        self.reviews.update(review).await
    }

    /// After every per-result decision, re-scan the sample's results. If none
    /// are still `needs_review`, complete the review: all-approved ->
    /// `approve_all`, all-rejected -> `reject_all`, mixed -> `partial`
    /// (releasable as `verified`).
    async fn try_auto_complete(&self, tenant_id: &Id, review_id: &Id) -> IvdResult<Review> {
        let mut review = self.reviews.get_by_id(tenant_id, review_id).await?;

        let still_pending = self
            .results
            .list(
                tenant_id,
                ResultFilter {
                    verification_status: Some(VerificationStatus::NeedsReview),
                    sample_id: Some(review.sample_id.clone()),
                    ..Default::default()
                },
            )
            .await?;
        if !still_pending.is_empty() {
            return Ok(review);
        }

        let decisions = self.decisions.list_by_review(tenant_id, review_id).await?;
        let all_approved = decisions.iter().all(|d| d.decision == ResultDecisionKind::Approved);
        let all_rejected = decisions.iter().all(|d| d.decision == ResultDecisionKind::Rejected);

        let (state, decision_kind, sample_status) = if all_approved {
            (ReviewState::Approved, ReviewDecisionKind::ApproveAll, SampleStatus::Verified)
        } else if all_rejected {
            (ReviewState::Rejected, ReviewDecisionKind::RejectAll, SampleStatus::Rejected)
        } else {
            (ReviewState::Approved, ReviewDecisionKind::Partial, SampleStatus::Verified)
        };

        let now = Utc::now();
        review.state = state;
        review.decision = Some(decision_kind);
        if review.submitted_at.is_none() {
            review.submitted_at = Some(now);
        }
        review.completed_at = Some(now);
        review.updated_at = now;
        let review = self.reviews.update(review).await?;

        let mut sample = self.samples.get_by_id(tenant_id, &review.sample_id).await?;
        sample.set_status(sample_status);
        self.samples.update(sample).await?;

        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivd_domain::result::NewResult;
    use ivd_domain::sample::NewSample;
    use ivd_ports::memory::{InMemoryResultDecisionRepository, InMemoryResultRepository, InMemoryReviewRepository, InMemorySampleRepository};

    async fn harness() -> (ReviewService, Arc<InMemorySampleRepository>, Arc<InMemoryResultRepository>, Arc<InMemoryReviewRepository>) {
        let samples = InMemorySampleRepository::new();
        let results = InMemoryResultRepository::new();
        let reviews = InMemoryReviewRepository::new();
        let decisions = InMemoryResultDecisionRepository::new();
        let service = ReviewService::new(reviews.clone(), decisions, results.clone(), samples.clone());
        (service, samples, results, reviews)
    }

    async fn make_sample(samples: &InMemorySampleRepository) -> ivd_domain::Sample {
        let now = Utc::now();
        samples
            .create(NewSample {
                tenant_id: "t1".into(),
                external_lis_id: "LIS-1".into(),
                patient_id: "p1".into(),
                specimen_type: "blood".into(),
                collection_date: now,
                received_date: now,
            })
            .await
            .unwrap()
    }

    async fn make_needs_review_result(results: &InMemoryResultRepository, sample_id: &Id, external_id: &str) -> ivd_domain::LabResult {
        let mut result = results
            .create(NewResult {
                tenant_id: "t1".into(),
                sample_id: sample_id.clone(),
                external_lis_result_id: external_id.into(),
                test_code: "GLU".into(),
                test_name: "Glucose".into(),
                value: Some("85".into()),
                unit: None,
                reference_range_low: None,
                reference_range_high: None,
                lis_flags: None,
            })
            .await
            .unwrap();
        result.set_verification_status(VerificationStatus::NeedsReview, None).unwrap();
        results.update(result).await.unwrap()
    }

    #[tokio::test]
    async fn partial_decisions_auto_complete_as_partial() {
        let (service, samples, results, _reviews) = harness().await;
        let sample = make_sample(&samples).await;
        let r1 = make_needs_review_result(&results, &sample.id, "R1").await;
        let r2 = make_needs_review_result(&results, &sample.id, "R2").await;
        let r3 = make_needs_review_result(&results, &sample.id, "R3").await;

        let review = service.create_review(&"t1".to_string(), &sample.id, None).await.unwrap();
        service
            .approve_result(&"t1".to_string(), &review.id, &r1.id, &"u1".to_string(), None)
            .await
            .unwrap();
        service
            .approve_result(&"t1".to_string(), &review.id, &r2.id, &"u1".to_string(), None)
            .await
            .unwrap();
        let completed = service
            .reject_result(&"t1".to_string(), &review.id, &r3.id, &"u1".to_string(), "flagged".to_string())
            .await
            .unwrap();

        assert_eq!(completed.state, ReviewState::Approved);
        assert_eq!(completed.decision, Some(ReviewDecisionKind::Partial));
    }

    #[tokio::test]
    async fn escalated_review_can_still_be_approved() {
        let (service, samples, _results, _reviews) = harness().await;
        let sample = make_sample(&samples).await;
        let review = service.create_review(&"t1".to_string(), &sample.id, None).await.unwrap();
        service
            .escalate_review(&"t1".to_string(), &review.id, &"u1".to_string(), "pathologist review".to_string())
            .await
            .unwrap();
        let approved = service
            .approve_sample(&"t1".to_string(), &review.id, &"u1".to_string(), None)
            .await
            .unwrap();
        assert_eq!(approved.state, ReviewState::Approved);

        let err = service
            .approve_sample(&"t1".to_string(), &review.id, &"u1".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IvdError::Immutable(_)));
    }

    #[tokio::test]
    async fn reject_sample_requires_comments() {
        let (service, samples, _results, _reviews) = harness().await;
        let sample = make_sample(&samples).await;
        let review = service.create_review(&"t1".to_string(), &sample.id, None).await.unwrap();
        let err = service
            .reject_sample(&"t1".to_string(), &review.id, &"u1".to_string(), "".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, IvdError::InvalidInput(_)));
    }
}
