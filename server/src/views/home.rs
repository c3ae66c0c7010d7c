use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ViewContext, ViewSlot, ViewState};
use crate::identity::Session;
use crate::presentation::{cards, EventCard};
use crate::store::EventQuery;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeModel {
    pub featured: Vec<EventCard>,
}

/// Landing page: the next few upcoming events.
pub struct HomeView {
    ctx: ViewContext,
    viewer: Option<Session>,
    slot: ViewSlot<HomeModel>,
}

impl HomeView {
    pub fn new(ctx: ViewContext, viewer: Option<Session>) -> Self {
        Self {
            ctx,
            viewer,
            slot: ViewSlot::new(),
        }
    }

    pub fn state(&self) -> ViewState<HomeModel> {
        self.slot.current()
    }

    pub async fn load(&self, now: DateTime<Utc>) -> ViewState<HomeModel> {
        let viewer = self.viewer.as_ref().map(|s| s.user_id);
        let query = EventQuery::upcoming(now).with_limit(self.ctx.featured_limit);
        let ctx = &self.ctx;

        self.slot
            .load(async {
                let fetched = ctx
                    .fetch
                    .run("featured events", || {
                        let query = query.clone();
                        async move {
                            let events = ctx.store.list_events(query).await?;
                            Ok::<_, AppError>(ctx.attendance.enrich(events, viewer).await)
                        }
                    })
                    .await;

                match fetched {
                    Ok(events) if events.is_empty() => ViewState::Empty,
                    Ok(events) => ViewState::Ready(HomeModel {
                        featured: cards(&events),
                    }),
                    Err(e) => ViewState::failed(&e),
                }
            })
            .await
    }
}
