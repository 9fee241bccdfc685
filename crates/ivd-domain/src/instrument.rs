//! Instrument and InstrumentQuery entities.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::ids::{new_id, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Chemistry,
    Hematology,
    Immunoassay,
    Microbiology,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentStatus {
    Active,
    Inactive,
    Disconnected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: Id,
    pub tenant_id: Id,
    pub name: String,
    pub instrument_type: InstrumentType,
    pub api_token: String,
    pub api_token_created_at: DateTime<Utc>,
    pub status: InstrumentStatus,
    pub connection_failure_count: i32,
    pub last_successful_query_at: Option<DateTime<Utc>>,
    pub last_successful_result_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cryptographically random, URL-safe, >= 32 bytes of entropy.
pub fn generate_api_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(43) // base62 over 43 chars exceeds 256 bits of entropy
        .map(char::from)
        .collect()
}

impl Instrument {
    pub fn new(tenant_id: Id, name: String, instrument_type: InstrumentType, api_token: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            tenant_id,
            name,
            instrument_type,
            api_token: api_token.unwrap_or_else(generate_api_token),
            api_token_created_at: now,
            status: InstrumentStatus::Inactive,
            connection_failure_count: 0,
            last_successful_query_at: None,
            last_successful_result_at: None,
            last_failure_at: None,
            last_failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.connection_failure_count < 3
    }

    pub fn record_successful_query(&mut self) {
        self.last_successful_query_at = Some(Utc::now());
        self.connection_failure_count = 0;
        self.last_failure_at = None;
        self.last_failure_reason = None;
        self.status = InstrumentStatus::Active;
        self.updated_at = Utc::now();
    }

    pub fn record_query_failure(&mut self, reason: impl Into<String>) {
        self.connection_failure_count += 1;
        self.last_failure_at = Some(Utc::now());
        self.last_failure_reason = Some(reason.into());
        if self.connection_failure_count >= 3 {
            self.status = InstrumentStatus::Disconnected;
        }
        self.updated_at = Utc::now();
    }

    pub fn record_successful_result(&mut self) {
        self.last_successful_result_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn regenerate_api_token(&mut self) {
        self.api_token = generate_api_token();
        self.api_token_created_at = Utc::now();
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.status = InstrumentStatus::Inactive;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
    Timeout,
}

/// Immutable audit row per host-query from an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentQuery {
    pub id: Id,
    pub tenant_id: Id,
    pub instrument_id: Id,
    pub query_timestamp: DateTime<Utc>,
    pub response_timestamp: DateTime<Utc>,
    pub response_time_ms: i64,
    pub orders_returned_count: i32,
    pub response_status: ResponseStatus,
    pub query_patient_id: Option<String>,
    pub query_sample_barcode: Option<String>,
    pub error_reason: Option<String>,
}

impl InstrumentQuery {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: Id,
        instrument_id: Id,
        query_timestamp: DateTime<Utc>,
        response_timestamp: DateTime<Utc>,
        orders_returned_count: i32,
        response_status: ResponseStatus,
        query_patient_id: Option<String>,
        query_sample_barcode: Option<String>,
        error_reason: Option<String>,
    ) -> Self {
        let response_time_ms = (response_timestamp - query_timestamp).num_milliseconds().max(0);
        Self {
            id: new_id(),
            tenant_id,
            instrument_id,
            query_timestamp,
            response_timestamp,
            response_time_ms,
            orders_returned_count,
            response_status,
            query_patient_id,
            query_sample_barcode,
            error_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_failures_disconnect() {
        let mut instrument = Instrument::new("t1".into(), "Analyzer 1".into(), InstrumentType::Chemistry, None);
        instrument.record_query_failure("timeout");
        instrument.record_query_failure("timeout");
        assert!(instrument.is_healthy());
        instrument.record_query_failure("timeout");
        assert!(!instrument.is_healthy());
        assert_eq!(instrument.status, InstrumentStatus::Disconnected);
    }

    #[test]
    fn generated_token_is_long_enough() {
        let token = generate_api_token();
        assert!(token.len() >= 32);
    }

    #[test]
    fn success_resets_failure_streak() {
        let mut instrument = Instrument::new("t1".into(), "Analyzer 1".into(), InstrumentType::Chemistry, None);
        instrument.record_query_failure("timeout");
        instrument.record_successful_query();
        assert_eq!(instrument.connection_failure_count, 0);
        assert_eq!(instrument.status, InstrumentStatus::Active);
    }
}
