//! Order entity — a request that certain tests be run on a Sample.
//!
//! Canonical entity shared between the LIS and Instrument sides: LIS
//! integration owns/writes orders, instrument integration reads and
//! updates assignment/status fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IvdError, IvdResult};
use crate::ids::{new_id, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    Routine,
    Stat,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Id,
    pub tenant_id: Id,
    pub external_lis_order_id: String,
    pub sample_id: Id,
    pub patient_id: String,
    pub test_codes: Vec<String>,
    pub priority: OrderPriority,
    pub assigned_instrument_id: Option<Id>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewOrder {
    pub tenant_id: Id,
    pub external_lis_order_id: String,
    pub sample_id: Id,
    pub patient_id: String,
    pub test_codes: Vec<String>,
    pub priority: OrderPriority,
}

impl Order {
    pub fn new(input: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            tenant_id: input.tenant_id,
            external_lis_order_id: input.external_lis_order_id,
            sample_id: input.sample_id,
            patient_id: input.patient_id,
            test_codes: input.test_codes,
            priority: input.priority,
            assigned_instrument_id: None,
            assigned_at: None,
            completed_at: None,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Assign this order to an instrument. Only `pending` orders may be assigned.
    pub fn assign_to(&mut self, instrument_id: Id) -> IvdResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(IvdError::InvalidTransition(format!(
                "order {} is {:?}, only pending orders may be assigned",
                self.id, self.status
            )));
        }
        self.assigned_instrument_id = Some(instrument_id);
        self.assigned_at = Some(Utc::now());
        self.status = OrderStatus::InProgress;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self) -> IvdResult<()> {
        if self.status != OrderStatus::InProgress {
            return Err(IvdError::InvalidTransition(format!(
                "order {} is {:?}, cannot complete",
                self.id, self.status
            )));
        }
        self.status = OrderStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn fail(&mut self) -> IvdResult<()> {
        if self.status != OrderStatus::InProgress {
            return Err(IvdError::InvalidTransition(format!(
                "order {} is {:?}, cannot fail",
                self.id, self.status
            )));
        }
        self.status = OrderStatus::Failed;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel(&mut self) -> IvdResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(IvdError::InvalidTransition(format!(
                "order {} is {:?}, only pending orders may be cancelled",
                self.id, self.status
            )));
        }
        self.status = OrderStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order::new(NewOrder {
            tenant_id: "tenant-1".into(),
            external_lis_order_id: "ORD-1".into(),
            sample_id: "sample-1".into(),
            patient_id: "PAT-1".into(),
            test_codes: vec!["GLU".into()],
            priority: OrderPriority::Routine,
        })
    }

    #[test]
    fn only_pending_orders_assign() {
        let mut order = sample_order();
        order.assign_to("inst-1".into()).unwrap();
        assert_eq!(order.status, OrderStatus::InProgress);
        assert!(order.assign_to("inst-2".into()).is_err());
    }

    #[test]
    fn cancel_requires_pending() {
        let mut order = sample_order();
        order.assign_to("inst-1".into()).unwrap();
        assert!(order.cancel().is_err());
    }
}
