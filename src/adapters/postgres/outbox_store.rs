//! PostgreSQL implementation of OutboxStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, OutboxEventId, Timestamp};
use crate::domain::outbox::OutboxEvent;
use crate::ports::OutboxStore;

/// Name of the lease row shared by every relay instance.
const RELAY_LEASE_NAME: &str = "outbox_relay";

/// PostgreSQL implementation of the OutboxStore port.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    /// Creates a new PostgresOutboxStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an outbox event.
#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    topic: String,
    event_type: String,
    aggregate_type: String,
    aggregate_id: String,
    payload: String,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl From<OutboxRow> for OutboxEvent {
    fn from(row: OutboxRow) -> Self {
        OutboxEvent {
            id: OutboxEventId::from_uuid(row.id),
            topic: row.topic,
            event_type: row.event_type,
            aggregate_type: row.aggregate_type,
            aggregate_id: row.aggregate_id,
            payload: row.payload,
            created_at: Timestamp::from_datetime(row.created_at),
            sent_at: row.sent_at.map(Timestamp::from_datetime),
        }
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn find_unsent(&self, limit: Option<u32>) -> Result<Vec<OutboxEvent>, DomainError> {
        // LIMIT NULL means no limit.
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, topic, event_type, aggregate_type, aggregate_id, payload,
                   created_at, sent_at
            FROM outbox_events
            WHERE sent_at IS NULL
            ORDER BY created_at ASC, seq ASC
            LIMIT $1
            "#,
        )
        .bind(limit.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load unsent outbox events: {}", e)))?;

        Ok(rows.into_iter().map(OutboxEvent::from).collect())
    }

    async fn mark_sent(&self, id: OutboxEventId, sent_at: Timestamp) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events SET sent_at = $2
            WHERE id = $1 AND sent_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(sent_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark outbox event sent: {}", e)))?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM outbox_events WHERE id = $1)")
                    .bind(id.as_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| {
                        DomainError::database(format!("Failed to check outbox event: {}", e))
                    })?;
            if !exists {
                return Err(DomainError::new(
                    ErrorCode::OutboxEventNotFound,
                    format!("Outbox event not found: {}", id),
                ));
            }
        }

        Ok(())
    }

    async fn try_acquire_relay_lease(
        &self,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        let acquired: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO outbox_relay_lease (name, holder, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (name) DO UPDATE
                SET holder = EXCLUDED.holder, expires_at = EXCLUDED.expires_at
                WHERE outbox_relay_lease.holder = EXCLUDED.holder
                   OR outbox_relay_lease.expires_at < now()
            RETURNING holder
            "#,
        )
        .bind(RELAY_LEASE_NAME)
        .bind(holder)
        .bind(ttl.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to acquire relay lease: {}", e)))?;

        Ok(acquired.is_some())
    }

    async fn release_relay_lease(&self, holder: &str) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM outbox_relay_lease WHERE name = $1 AND holder = $2")
            .bind(RELAY_LEASE_NAME)
            .bind(holder)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to release relay lease: {}", e)))?;

        Ok(())
    }
}
