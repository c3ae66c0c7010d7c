use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Category;
use crate::services::EnrichedEvent;

/// Display style for a category badge.
pub fn category_tone(category: Category) -> &'static str {
    match category {
        Category::Workshop => "primary",
        Category::Webinar => "accent",
        Category::Hackathon => "purple",
        Category::Conference => "blue",
        Category::Meetup => "green",
        Category::Social => "pink",
        Category::Other => "muted",
    }
}

/// `January 2, 2025 at 3:00 PM`
pub fn date_label(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y at %-I:%M %p").to_string()
}

pub fn attending_label(count: Option<u64>) -> String {
    match count {
        Some(count) => format!("{count} attending"),
        None => "attendance unavailable".to_string(),
    }
}

/// Long form used on the detail page.
pub fn attendees_label(count: Option<u64>) -> String {
    match count {
        Some(1) => "1 person attending".to_string(),
        Some(count) => format!("{count} people attending"),
        None => "attendance unavailable".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCard {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub category_tone: &'static str,
    pub event_date: DateTime<Utc>,
    pub date_label: String,
    pub location: String,
    pub image_url: Option<String>,
    pub attending_count: Option<u64>,
    pub attending_label: String,
    pub href: String,
}

impl From<&EnrichedEvent> for EventCard {
    fn from(enriched: &EnrichedEvent) -> Self {
        let event = &enriched.event;
        Self {
            id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            category: event.category,
            category_tone: category_tone(event.category),
            event_date: event.event_date,
            date_label: date_label(event.event_date),
            location: event.location.clone(),
            image_url: event.image_url.clone(),
            attending_count: enriched.attending_count,
            attending_label: attending_label(enriched.attending_count),
            href: format!("/events/{}", event.id),
        }
    }
}

pub fn cards(events: &[EnrichedEvent]) -> Vec<EventCard> {
    events.iter().map(EventCard::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_label_format() {
        let date = Utc.with_ymd_and_hms(2025, 1, 2, 15, 0, 0).unwrap();
        assert_eq!(date_label(date), "January 2, 2025 at 3:00 PM");
    }

    #[test]
    fn test_attendee_labels() {
        assert_eq!(attending_label(Some(0)), "0 attending");
        assert_eq!(attending_label(None), "attendance unavailable");
        assert_eq!(attendees_label(Some(1)), "1 person attending");
        assert_eq!(attendees_label(Some(3)), "3 people attending");
    }

    #[test]
    fn test_every_category_has_a_tone() {
        for category in Category::ALL {
            assert!(!category_tone(category).is_empty());
        }
        assert_eq!(category_tone(Category::Other), "muted");
    }
}
