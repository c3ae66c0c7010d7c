use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::{EventQuery, EventStore, StoreError, StoreResult};
use crate::models::{Event, EventFields, Rsvp};

const FOREIGN_KEY_VIOLATION: &str = "23503";

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, location, event_date, \
                             category, image_url, created_at, updated_at";

/// Postgres-backed store. Ownership rules live in the `WHERE` clauses so that a
/// write by a non-organizer never touches a row.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn event_exists(&self, id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Tells a missing row apart from one the actor may not write.
    async fn rejected_write(&self, id: Uuid) -> StoreError {
        match self.event_exists(id).await {
            Ok(true) => StoreError::Forbidden,
            Ok(false) => StoreError::NotFound,
            Err(e) => e,
        }
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION))
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list_events(&self, query: EventQuery) -> StoreResult<Vec<Event>> {
        if matches!(&query.id_in, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));
        if let Some(min_date) = query.min_date {
            builder.push(" AND event_date >= ").push_bind(min_date);
        }
        if let Some(organizer_id) = query.organizer_id {
            builder.push(" AND organizer_id = ").push_bind(organizer_id);
        }
        if let Some(ids) = query.id_in {
            builder.push(" AND id = ANY(").push_bind(ids).push(")");
        }
        builder.push(" ORDER BY event_date ASC, created_at ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let events = builder
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await?;
        debug!(rows = events.len(), "Listed events");
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn create_event(&self, fields: EventFields, organizer_id: Uuid) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
                INSERT INTO events (organizer_id, title, description, location, event_date, category, image_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(organizer_id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.location)
        .bind(fields.event_date)
        .bind(fields.category)
        .bind(fields.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn update_event(
        &self,
        actor: Uuid,
        id: Uuid,
        fields: EventFields,
    ) -> StoreResult<Event> {
        let updated = sqlx::query_as::<_, Event>(&format!(
            r#"
                UPDATE events
                SET title = $1,
                    description = $2,
                    location = $3,
                    event_date = $4,
                    category = $5,
                    image_url = $6,
                    updated_at = now()
                WHERE id = $7 AND organizer_id = $8
                RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.location)
        .bind(fields.event_date)
        .bind(fields.category)
        .bind(fields.image_url)
        .bind(id)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(event) => Ok(event),
            None => Err(self.rejected_write(id).await),
        }
    }

    async fn delete_event(&self, actor: Uuid, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND organizer_id = $2")
            .bind(id)
            .bind(actor)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.rejected_write(id).await);
        }
        Ok(())
    }

    async fn count_rsvps(&self, event_id: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rsvps WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn get_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Rsvp>> {
        let rsvp = sqlx::query_as::<_, Rsvp>(
            "SELECT event_id, user_id, created_at FROM rsvps WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rsvp)
    }

    async fn insert_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO rsvps (event_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::NotFound
            } else {
                StoreError::Database(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "rsvp for event {event_id} and user {user_id} already exists"
            )));
        }
        Ok(())
    }

    async fn delete_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM rsvps WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_rsvp_event_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT event_id FROM rsvps WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
