use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivd_domain::order::{NewOrder, Order, OrderPriority, OrderStatus};
use ivd_domain::{Id, IvdError, IvdResult};
use ivd_ports::OrderRepository;
use sqlx::{FromRow, PgPool};

use super::util::map_err;

#[derive(FromRow)]
struct OrderRow {
    id: String,
    tenant_id: String,
    external_lis_order_id: String,
    sample_id: String,
    patient_id: String,
    test_codes: Vec<String>,
    priority: String,
    assigned_instrument_id: Option<String>,
    assigned_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn priority_to_str(priority: OrderPriority) -> &'static str {
    match priority {
        OrderPriority::Routine => "routine",
        OrderPriority::Stat => "stat",
        OrderPriority::Critical => "critical",
    }
}

fn priority_from_str(s: &str) -> IvdResult<OrderPriority> {
    match s {
        "routine" => Ok(OrderPriority::Routine),
        "stat" => Ok(OrderPriority::Stat),
        "critical" => Ok(OrderPriority::Critical),
        other => Err(IvdError::Upstream(format!("unknown order priority '{other}'"))),
    }
}

fn status_to_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::InProgress => "in_progress",
        OrderStatus::Completed => "completed",
        OrderStatus::Failed => "failed",
        OrderStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> IvdResult<OrderStatus> {
    match s {
        "pending" => Ok(OrderStatus::Pending),
        "in_progress" => Ok(OrderStatus::InProgress),
        "completed" => Ok(OrderStatus::Completed),
        "failed" => Ok(OrderStatus::Failed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(IvdError::Upstream(format!("unknown order status '{other}'"))),
    }
}

impl OrderRow {
    fn into_domain(self) -> IvdResult<Order> {
        Ok(Order {
            id: self.id,
            tenant_id: self.tenant_id,
            external_lis_order_id: self.external_lis_order_id,
            sample_id: self.sample_id,
            patient_id: self.patient_id,
            test_codes: self.test_codes,
            priority: priority_from_str(&self.priority)?,
            assigned_instrument_id: self.assigned_instrument_id,
            assigned_at: self.assigned_at,
            completed_at: self.completed_at,
            status: status_from_str(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, input: NewOrder) -> IvdResult<Order> {
        let order = Order::new(input);
        sqlx::query(
            "INSERT INTO orders (id, tenant_id, external_lis_order_id, sample_id, patient_id, test_codes, priority,
                                  assigned_instrument_id, assigned_at, completed_at, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&order.id)
        .bind(&order.tenant_id)
        .bind(&order.external_lis_order_id)
        .bind(&order.sample_id)
        .bind(&order.patient_id)
        .bind(&order.test_codes)
        .bind(priority_to_str(order.priority))
        .bind(&order.assigned_instrument_id)
        .bind(order.assigned_at)
        .bind(order.completed_at)
        .bind(status_to_str(order.status))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("order", e))?;
        Ok(order)
    }

    async fn get_by_id(&self, tenant_id: &Id, id: &Id) -> IvdResult<Order> {
        let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err("order", e))?;
        row.ok_or_else(|| IvdError::not_found("order", id))?.into_domain()
    }

    async fn list_pending_for_tenant(&self, tenant_id: &Id) -> IvdResult<Vec<Order>> {
        self.list_by_status(tenant_id, OrderStatus::Pending).await
    }

    async fn list_by_status(&self, tenant_id: &Id, status: OrderStatus) -> IvdResult<Vec<Order>> {
        let rows: Vec<OrderRow> =
            sqlx::query_as("SELECT * FROM orders WHERE tenant_id = $1 AND status = $2 ORDER BY created_at")
                .bind(tenant_id)
                .bind(status_to_str(status))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_err("order", e))?;
        rows.into_iter().map(OrderRow::into_domain).collect()
    }

    async fn update(&self, order: Order) -> IvdResult<Order> {
        sqlx::query(
            "UPDATE orders SET assigned_instrument_id = $1, assigned_at = $2, completed_at = $3, status = $4, updated_at = $5
             WHERE id = $6 AND tenant_id = $7",
        )
        .bind(&order.assigned_instrument_id)
        .bind(order.assigned_at)
        .bind(order.completed_at)
        .bind(status_to_str(order.status))
        .bind(order.updated_at)
        .bind(&order.id)
        .bind(&order.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("order", e))?;
        Ok(order)
    }
}
