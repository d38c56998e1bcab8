//! PostgreSQL implementation of SubscriptionStore.
//!
//! Each [`PostgresSubscriptionTransaction`] wraps one sqlx transaction. The
//! version-checked UPDATE and the partial unique index on active lines turn
//! lost updates and racing inserts into `ConcurrentModification`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, SubscriptionId, Timestamp, UserId,
};
use crate::domain::outbox::OutboxEvent;
use crate::domain::subscription::{Plan, Subscription, SubscriptionStatus};
use crate::ports::{SubscriptionStore, SubscriptionTransaction};

const ONE_ACTIVE_PER_USER: &str = "subscriptions_one_active_per_user";

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, plan, status, trial_ends_at, current_period_start,
           current_period_end, cancel_at_period_end, canceled_at, version,
           created_at, updated_at
    FROM subscriptions
"#;

/// PostgreSQL implementation of the SubscriptionStore port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
#[derive(Clone)]
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Creates a new PostgresSubscriptionStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan: String,
    status: String,
    trial_ends_at: Option<DateTime<Utc>>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    canceled_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            plan: parse_plan(&row.plan)?,
            status: parse_status(&row.status)?,
            trial_ends_at: row.trial_ends_at.map(Timestamp::from_datetime),
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_plan(s: &str) -> Result<Plan, DomainError> {
    s.parse::<Plan>().map_err(|_| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid plan value: {}", s))
    })
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse::<SubscriptionStatus>().map_err(|_| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid status value: {}", s))
    })
}

fn to_datetime(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(Timestamp::into_datetime)
}

/// Maps a write failure, turning the one-active-line index into a conflict.
fn write_error(action: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some(ONE_ACTIVE_PER_USER) {
            return DomainError::concurrent_modification(
                "User already has an active subscription",
            );
        }
    }
    DomainError::database(format!("Failed to {}: {}", action, e))
}

fn into_subscription(row: Option<SubscriptionRow>) -> Result<Option<Subscription>, DomainError> {
    row.map(Subscription::try_from).transpose()
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn begin(&self) -> Result<Box<dyn SubscriptionTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(|e| {
            DomainError::database(format!("Failed to start transaction: {}", e))
        })?;
        Ok(Box::new(PostgresSubscriptionTransaction { tx }))
    }

    async fn find_latest_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?;

        into_subscription(row)
    }
}

/// One sqlx transaction. Dropping it rolls back.
pub struct PostgresSubscriptionTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SubscriptionTransaction for PostgresSubscriptionTransaction {
    async fn find_active_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{} WHERE user_id = $1 AND status NOT IN ('CANCELED', 'EXPIRED') \
             ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?;

        into_subscription(row)
    }

    async fn find_latest_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?;

        into_subscription(row)
    }

    async fn lock_by_id(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{} WHERE id = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to lock subscription: {}", e)))?;

        into_subscription(row)
    }

    async fn insert(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan, status, trial_ends_at, current_period_start,
                current_period_end, cancel_at_period_end, canceled_at, version,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_uuid())
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(to_datetime(subscription.trial_ends_at))
        .bind(to_datetime(subscription.current_period_start))
        .bind(to_datetime(subscription.current_period_end))
        .bind(subscription.cancel_at_period_end)
        .bind(to_datetime(subscription.canceled_at))
        .bind(subscription.version)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("insert subscription", e))?;

        Ok(())
    }

    async fn update(&mut self, subscription: &Subscription) -> Result<i64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan = $3,
                status = $4,
                trial_ends_at = $5,
                current_period_start = $6,
                current_period_end = $7,
                cancel_at_period_end = $8,
                canceled_at = $9,
                updated_at = $10,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.version)
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(to_datetime(subscription.trial_ends_at))
        .bind(to_datetime(subscription.current_period_start))
        .bind(to_datetime(subscription.current_period_end))
        .bind(subscription.cancel_at_period_end)
        .bind(to_datetime(subscription.canceled_at))
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::concurrent_modification(format!(
                "Subscription {} is no longer at version {}",
                subscription.id, subscription.version
            )));
        }

        Ok(subscription.version + 1)
    }

    async fn append_outbox(&mut self, event: &OutboxEvent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO outbox_events (
                id, topic, event_type, aggregate_type, aggregate_id, payload, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.topic)
        .bind(&event.event_type)
        .bind(&event.aggregate_type)
        .bind(&event.aggregate_id)
        .bind(&event.payload)
        .bind(event.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append outbox event: {}", e)))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(|e| {
            DomainError::database(format!("Failed to commit transaction: {}", e))
        })
    }
}
