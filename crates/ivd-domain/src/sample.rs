//! Sample entity — a physical specimen received from the LIS.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IvdError, IvdResult};
use crate::ids::{new_id, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Pending,
    Verified,
    NeedsReview,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub id: Id,
    pub tenant_id: Id,
    pub external_lis_id: String,
    pub patient_id: String,
    pub specimen_type: String,
    pub collection_date: DateTime<Utc>,
    pub received_date: DateTime<Utc>,
    pub status: SampleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs needed to register a new Sample from LIS ingestion.
pub struct NewSample {
    pub tenant_id: Id,
    pub external_lis_id: String,
    pub patient_id: String,
    pub specimen_type: String,
    pub collection_date: DateTime<Utc>,
    pub received_date: DateTime<Utc>,
}

impl Sample {
    pub fn new(input: NewSample) -> IvdResult<Self> {
        if input.collection_date > input.received_date {
            return Err(IvdError::InvalidInput(
                "collection_date must not be after received_date".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: new_id(),
            tenant_id: input.tenant_id,
            external_lis_id: input.external_lis_id,
            patient_id: input.patient_id,
            specimen_type: input.specimen_type,
            collection_date: input.collection_date,
            received_date: input.received_date,
            status: SampleStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_status(&mut self, status: SampleStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_sample_input() -> NewSample {
        NewSample {
            tenant_id: "tenant-1".into(),
            external_lis_id: "LIS-001".into(),
            patient_id: "PAT-1".into(),
            specimen_type: "blood".into(),
            collection_date: Utc::now(),
            received_date: Utc::now(),
        }
    }

    #[test]
    fn rejects_collection_after_received() {
        let mut input = new_sample_input();
        input.collection_date = Utc::now() + chrono::Duration::days(1);
        input.received_date = Utc::now();
        assert!(Sample::new(input).is_err());
    }

    #[test]
    fn accepts_equal_collection_and_received() {
        let now = Utc::now();
        let mut input = new_sample_input();
        input.collection_date = now;
        input.received_date = now;
        assert!(Sample::new(input).is_ok());
    }
}
