use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Event;

const CALENDAR_BASE: &str = "https://calendar.google.com/calendar/render?action=TEMPLATE";
const DEFAULT_DURATION_HOURS: i64 = 2;
const SHARE_TEXT: &str = "Check out this event on Evently!";

fn calendar_stamp(date: DateTime<Utc>) -> String {
    date.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Google Calendar template link. Events have no end time, so two hours is assumed.
pub fn calendar_link(event: &Event) -> String {
    let start = calendar_stamp(event.event_date);
    let end = calendar_stamp(event.event_date + Duration::hours(DEFAULT_DURATION_HOURS));
    format!(
        "{CALENDAR_BASE}&text={}&dates={start}/{end}&details={}&location={}",
        urlencoding::encode(&event.title),
        urlencoding::encode(&event.description),
        urlencoding::encode(&event.location),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLink {
    pub title: String,
    pub text: &'static str,
    pub url: String,
}

pub fn share_link(event: &Event, base_url: &str) -> ShareLink {
    ShareLink {
        title: event.title.clone(),
        text: SHARE_TEXT,
        url: format!("{}/events/{}", base_url.trim_end_matches('/'), event.id),
    }
}
