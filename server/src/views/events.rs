use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Ticket, ViewContext, ViewSlot, ViewState};
use crate::identity::Session;
use crate::presentation::{cards, EventCard};
use crate::services::{filter_events, CategoryFilter, EnrichedEvent};
use crate::store::EventQuery;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsModel {
    pub query: String,
    pub category: CategoryFilter,
    pub categories: Vec<CategoryFilter>,
    /// Upcoming events before filtering.
    pub total: usize,
    pub events: Vec<EventCard>,
}

/// Browse page. Fetches every upcoming event once, then filters in memory so
/// the search box can re-run [`EventsView::filter`] on each keystroke.
pub struct EventsView {
    ctx: ViewContext,
    viewer: Option<Session>,
    /// Last accepted fetch and the ticket it settled under.
    fetched: std::sync::Mutex<(Option<Ticket>, Vec<EnrichedEvent>)>,
    slot: ViewSlot<EventsModel>,
}

impl EventsView {
    pub fn new(ctx: ViewContext, viewer: Option<Session>) -> Self {
        Self {
            ctx,
            viewer,
            fetched: std::sync::Mutex::new((None, Vec::new())),
            slot: ViewSlot::new(),
        }
    }

    pub fn state(&self) -> ViewState<EventsModel> {
        self.slot.current()
    }

    pub async fn load(
        &self,
        now: DateTime<Utc>,
        query: &str,
        category: CategoryFilter,
    ) -> ViewState<EventsModel> {
        let viewer = self.viewer.as_ref().map(|s| s.user_id);
        let ctx = &self.ctx;

        let ticket = self.slot.begin();
        let fetched = ctx
            .fetch
            .run("upcoming events", || async move {
                let events = ctx.store.list_events(EventQuery::upcoming(now)).await?;
                Ok::<_, AppError>(ctx.attendance.enrich(events, viewer).await)
            })
            .await;

        match fetched {
            Ok(events) => {
                let state = render(&events, query, category);
                if self.slot.settle(ticket, state) {
                    self.remember(ticket, events);
                }
            }
            Err(e) => {
                self.slot.settle(ticket, ViewState::failed(&e));
            }
        }
        self.slot.current()
    }

    /// Re-filters the last accepted fetch without touching the store.
    pub fn filter(&self, query: &str, category: CategoryFilter) -> ViewState<EventsModel> {
        let ticket = self.slot.begin();
        let state = render(&self.lock_fetched().1, query, category);
        self.slot.settle(ticket, state);
        self.slot.current()
    }

    // A newer accepted fetch may already have landed between settle and here.
    fn remember(&self, ticket: Ticket, events: Vec<EnrichedEvent>) {
        let mut fetched = self.lock_fetched();
        if fetched.0.map_or(true, |held| held < ticket) {
            *fetched = (Some(ticket), events);
        }
    }

    fn lock_fetched(&self) -> std::sync::MutexGuard<'_, (Option<Ticket>, Vec<EnrichedEvent>)> {
        self.fetched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn render(events: &[EnrichedEvent], query: &str, category: CategoryFilter) -> ViewState<EventsModel> {
    let visible = filter_events(events, query, category);
    if visible.is_empty() {
        return ViewState::Empty;
    }
    ViewState::Ready(EventsModel {
        query: query.to_string(),
        category,
        categories: CategoryFilter::options(),
        total: events.len(),
        events: cards(&visible),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, EventFields};
    use crate::store::{EventStore, MemoryEventStore};
    use crate::views::FetchPolicy;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn fields(title: &str, event_date: DateTime<Utc>, category: Category) -> EventFields {
        EventFields {
            title: title.to_string(),
            description: "Come along and meet the community".to_string(),
            location: "Harbour Hall".to_string(),
            event_date,
            category,
            image_url: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_upcoming_excludes_past_and_orders_ascending() {
        let store = Arc::new(MemoryEventStore::new());
        let organizer = Uuid::new_v4();
        store
            .create_event(
                fields("Later", Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(), Category::Meetup),
                organizer,
            )
            .await
            .unwrap();
        store
            .create_event(
                fields("Yesterday", Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap(), Category::Meetup),
                organizer,
            )
            .await
            .unwrap();
        store
            .create_event(
                fields("Tomorrow", Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(), Category::Meetup),
                organizer,
            )
            .await
            .unwrap();

        let view = EventsView::new(ViewContext::new(store), None);
        let ViewState::Ready(model) = view.load(now(), "", CategoryFilter::All).await else {
            panic!("expected ready state");
        };

        let titles: Vec<_> = model.events.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Tomorrow", "Later"]);
        assert_eq!(model.total, 2);
    }

    #[tokio::test]
    async fn test_filter_reuses_fetched_events() {
        let store = Arc::new(MemoryEventStore::new());
        let date = Utc.with_ymd_and_hms(2025, 2, 1, 18, 0, 0).unwrap();
        store
            .create_event(fields("Tech Meetup", date, Category::Meetup), Uuid::new_v4())
            .await
            .unwrap();
        store
            .create_event(fields("Board Games", date, Category::Social), Uuid::new_v4())
            .await
            .unwrap();

        let view = EventsView::new(ViewContext::new(store), None);
        view.load(now(), "", CategoryFilter::All).await;

        let ViewState::Ready(model) = view.filter("TECH", CategoryFilter::All) else {
            panic!("expected ready state");
        };
        assert_eq!(model.events.len(), 1);
        assert_eq!(model.events[0].title, "Tech Meetup");

        assert_eq!(
            view.filter("tech", CategoryFilter::Only(Category::Social)),
            ViewState::Empty
        );
    }

    #[tokio::test]
    async fn test_slow_store_settles_to_failed() {
        let store = Arc::new(crate::store::testing::FaultyStore::new());
        store.delay_listing(Duration::from_millis(200));
        let ctx = ViewContext::new(store).with_fetch_policy(FetchPolicy {
            timeout: Duration::from_millis(20),
            retries: 1,
        });

        let view = EventsView::new(ctx, None);
        let state = view.load(now(), "", CategoryFilter::All).await;

        assert!(matches!(state, ViewState::Failed { code: "TIMEOUT", .. }));
    }

    #[tokio::test]
    async fn test_superseded_load_does_not_replace_filter_source() {
        let store = Arc::new(crate::store::testing::FaultyStore::new());
        let date = Utc.with_ymd_and_hms(2025, 2, 1, 18, 0, 0).unwrap();
        for title in ["Tech Meetup", "Tech Talks"] {
            store
                .create_event(fields(title, date, Category::Meetup), Uuid::new_v4())
                .await
                .unwrap();
        }
        let view = EventsView::new(ViewContext::new(store.clone()), None);

        // Issued first, answers last, and sees nothing upcoming.
        store.delay_listing(Duration::from_millis(50));
        let later = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut slow = Box::pin(view.load(later, "", CategoryFilter::All));
        assert!(futures::poll!(slow.as_mut()).is_pending());

        store.delay_listing(Duration::ZERO);
        let ViewState::Ready(model) = view.load(now(), "", CategoryFilter::All).await else {
            panic!("expected ready state");
        };
        assert_eq!(model.total, 2);

        slow.await;

        let ViewState::Ready(model) = view.filter("tech", CategoryFilter::All) else {
            panic!("expected ready state after the stale response");
        };
        assert_eq!(model.events.len(), 2);
    }
}
