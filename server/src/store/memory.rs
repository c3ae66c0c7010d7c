use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventQuery, EventStore, StoreError, StoreResult};
use crate::models::{Event, EventFields, Rsvp};

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    rsvps: BTreeMap<(Uuid, Uuid), Rsvp>,
}

/// In-process store used when no `DATABASE_URL` is configured, and by tests.
///
/// Applies the same access policy as the Postgres schema: organizer-only event
/// writes, one RSVP per `(event, user)` pair, and RSVPs removed with their event.
#[derive(Default)]
pub struct MemoryEventStore {
    tables: RwLock<Tables>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list_events(&self, query: EventQuery) -> StoreResult<Vec<Event>> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|event| query.matches(event))
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            a.event_date
                .cmp(&b.event_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        if let Some(limit) = query.limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn create_event(&self, fields: EventFields, organizer_id: Uuid) -> StoreResult<Event> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id,
            title: fields.title,
            description: fields.description,
            location: fields.location,
            event_date: fields.event_date,
            category: fields.category,
            image_url: fields.image_url,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .events
            .insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        actor: Uuid,
        id: Uuid,
        fields: EventFields,
    ) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        let event = tables.events.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !event.is_organized_by(actor) {
            return Err(StoreError::Forbidden);
        }

        event.title = fields.title;
        event.description = fields.description;
        event.location = fields.location;
        event.event_date = fields.event_date;
        event.category = fields.category;
        event.image_url = fields.image_url;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, actor: Uuid, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let event = tables.events.get(&id).ok_or(StoreError::NotFound)?;
        if !event.is_organized_by(actor) {
            return Err(StoreError::Forbidden);
        }

        tables.events.remove(&id);
        tables.rsvps.retain(|(event_id, _), _| *event_id != id);
        Ok(())
    }

    async fn count_rsvps(&self, event_id: Uuid) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .rsvps
            .range((event_id, Uuid::nil())..=(event_id, Uuid::from_u128(u128::MAX)))
            .count();
        Ok(count as u64)
    }

    async fn get_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Rsvp>> {
        Ok(self
            .tables
            .read()
            .await
            .rsvps
            .get(&(event_id, user_id))
            .cloned())
    }

    async fn insert_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event_id) {
            return Err(StoreError::NotFound);
        }
        if tables.rsvps.contains_key(&(event_id, user_id)) {
            return Err(StoreError::Conflict(format!(
                "rsvp for event {event_id} and user {user_id} already exists"
            )));
        }

        tables.rsvps.insert(
            (event_id, user_id),
            Rsvp {
                event_id,
                user_id,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .rsvps
            .remove(&(event_id, user_id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_rsvp_event_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(tables
            .rsvps
            .values()
            .filter(|rsvp| rsvp.user_id == user_id)
            .map(|rsvp| rsvp.event_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::{Duration, TimeZone};

    fn fields(title: &str, event_date: chrono::DateTime<Utc>) -> EventFields {
        EventFields {
            title: title.to_string(),
            description: "An evening of talks and pizza".to_string(),
            location: "Main Street 1".to_string(),
            event_date,
            category: Category::Meetup,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_list_events_orders_by_date_and_applies_limit() {
        let store = MemoryEventStore::new();
        let organizer = Uuid::new_v4();
        let base = Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap();

        store
            .create_event(fields("Third", base + Duration::days(2)), organizer)
            .await
            .unwrap();
        store.create_event(fields("First", base), organizer).await.unwrap();
        store
            .create_event(fields("Second", base + Duration::days(1)), organizer)
            .await
            .unwrap();

        let all = store.list_events(EventQuery::default()).await.unwrap();
        let titles: Vec<_> = all.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);

        let limited = store
            .list_events(EventQuery::default().with_limit(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].title, "First");
    }

    #[tokio::test]
    async fn test_non_organizer_cannot_update_or_delete() {
        let store = MemoryEventStore::new();
        let organizer = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let date = Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap();
        let event = store
            .create_event(fields("Rust Night", date), organizer)
            .await
            .unwrap();

        let update = store
            .update_event(stranger, event.id, fields("Hijacked", date))
            .await;
        assert!(matches!(update, Err(StoreError::Forbidden)));

        let delete = store.delete_event(stranger, event.id).await;
        assert!(matches!(delete, Err(StoreError::Forbidden)));

        let unchanged = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(unchanged.title, "Rust Night");
    }

    #[tokio::test]
    async fn test_rsvp_is_unique_per_user_and_event() {
        let store = MemoryEventStore::new();
        let user = Uuid::new_v4();
        let date = Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap();
        let event = store
            .create_event(fields("Rust Night", date), Uuid::new_v4())
            .await
            .unwrap();

        store.insert_rsvp(event.id, user).await.unwrap();
        let duplicate = store.insert_rsvp(event.id, user).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
        assert_eq!(store.count_rsvps(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_is_scoped_to_event() {
        let store = MemoryEventStore::new();
        let date = Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap();
        let a = store
            .create_event(fields("A", date), Uuid::new_v4())
            .await
            .unwrap();
        let b = store
            .create_event(fields("B", date), Uuid::new_v4())
            .await
            .unwrap();

        store.insert_rsvp(a.id, Uuid::new_v4()).await.unwrap();
        store.insert_rsvp(a.id, Uuid::new_v4()).await.unwrap();
        store.insert_rsvp(b.id, Uuid::new_v4()).await.unwrap();

        assert_eq!(store.count_rsvps(a.id).await.unwrap(), 2);
        assert_eq!(store.count_rsvps(b.id).await.unwrap(), 1);
        assert_eq!(store.count_rsvps(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_event_removes_its_rsvps() {
        let store = MemoryEventStore::new();
        let organizer = Uuid::new_v4();
        let user = Uuid::new_v4();
        let date = Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap();
        let event = store
            .create_event(fields("Rust Night", date), organizer)
            .await
            .unwrap();
        store.insert_rsvp(event.id, user).await.unwrap();

        store.delete_event(organizer, event.id).await.unwrap();

        assert!(store.get_event(event.id).await.unwrap().is_none());
        assert!(store.list_rsvp_event_ids(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rsvp_on_missing_event_is_not_found() {
        let store = MemoryEventStore::new();
        let result = store.insert_rsvp(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound)));

        let result = store.delete_rsvp(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }
}
