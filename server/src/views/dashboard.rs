use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ViewContext, ViewSlot, ViewState};
use crate::identity::Session;
use crate::presentation::{cards, EventCard};
use crate::services::EnrichedEvent;
use crate::store::EventQuery;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub events_created: usize,
    /// Sum over organized events whose count could be read.
    pub rsvps_received: u64,
    pub events_attending: usize,
}

impl DashboardStats {
    fn collect(organized: &[EnrichedEvent], attending: &[EnrichedEvent]) -> Self {
        Self {
            events_created: organized.len(),
            rsvps_received: organized.iter().filter_map(|e| e.attending_count).sum(),
            events_attending: attending.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardModel {
    pub stats: DashboardStats,
    pub organized: ViewState<Vec<EventCard>>,
    pub attending: ViewState<Vec<EventCard>>,
}

/// Organizer dashboard. Only constructed for a signed-in viewer.
pub struct DashboardView {
    ctx: ViewContext,
    session: Session,
    slot: ViewSlot<DashboardModel>,
}

impl DashboardView {
    pub fn new(ctx: ViewContext, session: Session) -> Self {
        Self {
            ctx,
            session,
            slot: ViewSlot::new(),
        }
    }

    pub fn state(&self) -> ViewState<DashboardModel> {
        self.slot.current()
    }

    pub async fn load(&self, now: DateTime<Utc>) -> ViewState<DashboardModel> {
        self.slot
            .load(async {
                let (organized, attending) =
                    tokio::join!(self.organized(), self.attending(now));
                match (organized, attending) {
                    (Ok(organized), Ok(attending)) => ViewState::Ready(DashboardModel {
                        stats: DashboardStats::collect(&organized, &attending),
                        organized: ViewState::from_items(cards(&organized)),
                        attending: ViewState::from_items(cards(&attending)),
                    }),
                    (Err(e), _) | (_, Err(e)) => ViewState::failed(&e),
                }
            })
            .await
    }

    /// Every event the viewer organizes, past ones included.
    async fn organized(&self) -> Result<Vec<EnrichedEvent>, AppError> {
        let ctx = &self.ctx;
        let user_id = self.session.user_id;
        ctx.fetch
            .run("organized events", || async move {
                let events = ctx
                    .store
                    .list_events(EventQuery::organized_by(user_id))
                    .await?;
                Ok::<_, AppError>(ctx.attendance.enrich(events, Some(user_id)).await)
            })
            .await
    }

    /// Upcoming events the viewer has an RSVP for.
    async fn attending(&self, now: DateTime<Utc>) -> Result<Vec<EnrichedEvent>, AppError> {
        let ctx = &self.ctx;
        let user_id = self.session.user_id;
        ctx.fetch
            .run("attending events", || async move {
                let ids = ctx.store.list_rsvp_event_ids(user_id).await?;
                if ids.is_empty() {
                    return Ok::<_, AppError>(Vec::new());
                }
                let events = ctx
                    .store
                    .list_events(EventQuery::upcoming(now).with_ids(ids))
                    .await?;
                Ok(ctx.attendance.enrich(events, Some(user_id)).await)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, EventFields};
    use crate::store::{EventStore, MemoryEventStore};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use uuid::Uuid;

    fn fields(title: &str, event_date: DateTime<Utc>) -> EventFields {
        EventFields {
            title: title.to_string(),
            description: "Quarterly planning and pizza".to_string(),
            location: "HQ, floor 3".to_string(),
            event_date,
            category: Category::Other,
            image_url: None,
        }
    }

    fn session(user_id: Uuid) -> Session {
        Session {
            user_id,
            token: "dashboard".to_string(),
            issued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_new_user_sees_empty_tabs() {
        let view = DashboardView::new(
            ViewContext::new(Arc::new(MemoryEventStore::new())),
            session(Uuid::new_v4()),
        );
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let ViewState::Ready(model) = view.load(now).await else {
            panic!("expected ready state");
        };
        assert_eq!(model.organized, ViewState::Empty);
        assert_eq!(model.attending, ViewState::Empty);
        assert_eq!(
            model.stats,
            DashboardStats {
                events_created: 0,
                rsvps_received: 0,
                events_attending: 0
            }
        );
    }

    #[tokio::test]
    async fn test_partitions_and_stats() {
        let store = Arc::new(MemoryEventStore::new());
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let past_mine = store
            .create_event(fields("Retro", now - Duration::days(3)), me)
            .await
            .unwrap();
        let future_mine = store
            .create_event(fields("Planning", now + Duration::days(3)), me)
            .await
            .unwrap();
        let theirs_upcoming = store
            .create_event(fields("Their Party", now + Duration::days(1)), other)
            .await
            .unwrap();
        let theirs_past = store
            .create_event(fields("Old Party", now - Duration::days(1)), other)
            .await
            .unwrap();

        store.insert_rsvp(future_mine.id, other).await.unwrap();
        store.insert_rsvp(past_mine.id, other).await.unwrap();
        store.insert_rsvp(future_mine.id, Uuid::new_v4()).await.unwrap();
        store.insert_rsvp(theirs_upcoming.id, me).await.unwrap();
        store.insert_rsvp(theirs_past.id, me).await.unwrap();

        let view = DashboardView::new(ViewContext::new(store), session(me));
        let ViewState::Ready(model) = view.load(now).await else {
            panic!("expected ready state");
        };

        let ViewState::Ready(organized) = &model.organized else {
            panic!("expected organized events");
        };
        let titles: Vec<_> = organized.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Retro", "Planning"]);

        let ViewState::Ready(attending) = &model.attending else {
            panic!("expected attending events");
        };
        assert_eq!(attending.len(), 1);
        assert_eq!(attending[0].title, "Their Party");

        assert_eq!(
            model.stats,
            DashboardStats {
                events_created: 2,
                rsvps_received: 3,
                events_attending: 1
            }
        );
    }
}
