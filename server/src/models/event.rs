use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fixed set of event categories. Stored as the `event_category` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "event_category", rename_all = "lowercase")]
pub enum Category {
    Workshop,
    Webinar,
    Hackathon,
    Conference,
    Meetup,
    Social,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Workshop,
        Category::Webinar,
        Category::Hackathon,
        Category::Conference,
        Category::Meetup,
        Category::Social,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Workshop => "workshop",
            Category::Webinar => "webinar",
            Category::Hackathon => "hackathon",
            Category::Conference => "conference",
            Category::Meetup => "meetup",
            Category::Social => "social",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub category: Category,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_organized_by(&self, user_id: Uuid) -> bool {
        self.organizer_id == user_id
    }
}

/// The mutable columns of an event, as written by the create and edit flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFields {
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub category: Category,
    pub image_url: Option<String>,
}
