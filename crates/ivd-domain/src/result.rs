//! Result entity — one measurement for one test code belonging to a Sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IvdError, IvdResult};
use crate::ids::{new_id, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    NeedsReview,
    Rejected,
}

impl VerificationStatus {
    /// `verified` and `rejected` are terminal: mutators must fail.
    pub fn is_terminal(self) -> bool {
        matches!(self, VerificationStatus::Verified | VerificationStatus::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Result {
    pub id: Id,
    pub tenant_id: Id,
    pub sample_id: Id,
    pub external_lis_result_id: String,
    pub test_code: String,
    pub test_name: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub lis_flags: Option<String>,
    pub verification_status: VerificationStatus,
    pub verification_method: Option<VerificationMethod>,
    pub upload_status: UploadStatus,
    pub upload_failure_count: i32,
    pub upload_failure_reason: Option<String>,
    pub sent_to_lis_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewResult {
    pub tenant_id: Id,
    pub sample_id: Id,
    pub external_lis_result_id: String,
    pub test_code: String,
    pub test_name: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub lis_flags: Option<String>,
}

impl Result {
    pub fn new(input: NewResult) -> IvdResult<Self> {
        if let (Some(low), Some(high)) = (input.reference_range_low, input.reference_range_high) {
            if low > high {
                return Err(IvdError::InvalidInput(
                    "reference_range_low cannot be greater than reference_range_high".to_string(),
                ));
            }
        }
        let now = Utc::now();
        Ok(Self {
            id: new_id(),
            tenant_id: input.tenant_id,
            sample_id: input.sample_id,
            external_lis_result_id: input.external_lis_result_id,
            test_code: input.test_code,
            test_name: input.test_name,
            value: input.value,
            unit: input.unit,
            reference_range_low: input.reference_range_low,
            reference_range_high: input.reference_range_high,
            lis_flags: input.lis_flags,
            verification_status: VerificationStatus::Pending,
            verification_method: None,
            upload_status: UploadStatus::Pending,
            upload_failure_count: 0,
            upload_failure_reason: None,
            sent_to_lis_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Numeric parse of `value`, used by the verification engine's numeric rules.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_deref().and_then(|v| v.trim().parse::<f64>().ok())
    }

    fn ensure_mutable(&self) -> IvdResult<()> {
        if self.verification_status.is_terminal() {
            return Err(IvdError::Immutable(format!(
                "result {} is {:?} and cannot be modified",
                self.id, self.verification_status
            )));
        }
        Ok(())
    }

    /// Transition out of `pending` with the given method. Fails if the
    /// result is already in a terminal verification state.
    pub fn set_verification_status(
        &mut self,
        status: VerificationStatus,
        method: Option<VerificationMethod>,
    ) -> IvdResult<()> {
        self.ensure_mutable()?;
        self.verification_status = status;
        if status != VerificationStatus::Pending {
            self.verification_method = method;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the result as successfully sent to the LIS. Resets the
    /// failure-streak counter.
    pub fn mark_sent(&mut self) {
        self.upload_status = UploadStatus::Sent;
        self.sent_to_lis_at = Some(Utc::now());
        self.upload_failure_count = 0;
        self.upload_failure_reason = None;
        self.updated_at = Utc::now();
    }

    /// Mark an upload attempt as failed. The failure counter is monotonic
    /// within a failed streak and only resets on the next `mark_sent`.
    pub fn mark_upload_failed(&mut self, reason: impl Into<String>) {
        self.upload_status = UploadStatus::Failed;
        self.upload_failure_count += 1;
        self.upload_failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    /// Whether `other` differs from `self` only in upload bookkeeping
    /// (`upload_status`, `upload_failure_count`, `upload_failure_reason`,
    /// `sent_to_lis_at`, `updated_at`). Repositories use this to honor the
    /// immutability carve-out: a terminal result's upload fields still move
    /// through the upload loop even though every other field is frozen.
    pub fn differs_only_in_upload_fields(&self, other: &Self) -> bool {
        self.id == other.id
            && self.tenant_id == other.tenant_id
            && self.sample_id == other.sample_id
            && self.external_lis_result_id == other.external_lis_result_id
            && self.test_code == other.test_code
            && self.test_name == other.test_name
            && self.value == other.value
            && self.unit == other.unit
            && self.reference_range_low == other.reference_range_low
            && self.reference_range_high == other.reference_range_high
            && self.lis_flags == other.lis_flags
            && self.verification_status == other.verification_status
            && self.verification_method == other.verification_method
            && self.created_at == other.created_at
    }

    /// Whether this result is currently eligible for the upload loop, per
    /// the tenant's upload settings.
    pub fn is_upload_eligible(&self, upload_verified: bool, upload_rejected: bool) -> bool {
        if self.upload_status != UploadStatus::Pending {
            return false;
        }
        match self.verification_status {
            VerificationStatus::Verified => upload_verified,
            VerificationStatus::Rejected => upload_rejected,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_result_input() -> NewResult {
        NewResult {
            tenant_id: "tenant-1".into(),
            sample_id: "sample-1".into(),
            external_lis_result_id: "RES-1".into(),
            test_code: "GLU".into(),
            test_name: "Glucose".into(),
            value: Some("85".into()),
            unit: Some("mg/dL".into()),
            reference_range_low: Some(70.0),
            reference_range_high: Some(100.0),
            lis_flags: None,
        }
    }

    #[test]
    fn rejects_inverted_reference_range() {
        let mut input = new_result_input();
        input.reference_range_low = Some(100.0);
        input.reference_range_high = Some(70.0);
        assert!(Result::new(input).is_err());
    }

    #[test]
    fn terminal_status_is_immutable() {
        let mut result = Result::new(new_result_input()).unwrap();
        result
            .set_verification_status(VerificationStatus::Verified, Some(VerificationMethod::Auto))
            .unwrap();
        let err = result
            .set_verification_status(VerificationStatus::NeedsReview, None)
            .unwrap_err();
        assert!(matches!(err, IvdError::Immutable(_)));
    }

    #[test]
    fn upload_failure_count_resets_on_sent() {
        let mut result = Result::new(new_result_input()).unwrap();
        result.mark_upload_failed("timeout");
        result.mark_upload_failed("timeout");
        assert_eq!(result.upload_failure_count, 2);
        result.mark_sent();
        assert_eq!(result.upload_failure_count, 0);
        assert!(result.upload_failure_reason.is_none());
    }

    #[test]
    fn upload_only_diff_is_detected() {
        let result = Result::new(new_result_input()).unwrap();
        let mut uploaded = result.clone();
        uploaded.mark_sent();
        assert!(uploaded.differs_only_in_upload_fields(&result));

        let mut edited = result.clone();
        edited.test_name = "Different test".to_string();
        assert!(!edited.differs_only_in_upload_fields(&result));
    }

    #[test]
    fn upload_eligibility_respects_settings() {
        let mut result = Result::new(new_result_input()).unwrap();
        result
            .set_verification_status(VerificationStatus::Verified, Some(VerificationMethod::Auto))
            .unwrap();
        assert!(result.is_upload_eligible(true, false));
        assert!(!result.is_upload_eligible(false, false));
    }
}
