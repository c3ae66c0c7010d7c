use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Category, Event, UnknownCategory};
use crate::services::attendance::EnrichedEvent;

const ALL_CATEGORIES: &str = "all";

/// Category selector for the events list; `All` disables the category filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn options() -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(Category::ALL.into_iter().map(CategoryFilter::Only))
            .collect()
    }

    pub fn admits(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => *wanted == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL_CATEGORIES),
            CategoryFilter::Only(category) => category.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL_CATEGORIES) {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.to_string()
    }
}

/// Anything the events list can filter.
pub trait Filterable {
    fn event(&self) -> &Event;
}

impl Filterable for Event {
    fn event(&self) -> &Event {
        self
    }
}

impl Filterable for EnrichedEvent {
    fn event(&self) -> &Event {
        &self.event
    }
}

pub fn matches_query(event: &Event, query: &str) -> bool {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [&event.title, &event.description, &event.location]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Keeps the events whose title, description or location contains `query`
/// (case-insensitively) and whose category passes `category`. Input order is
/// preserved.
pub fn filter_events<T>(events: &[T], query: &str, category: CategoryFilter) -> Vec<T>
where
    T: Filterable + Clone,
{
    events
        .iter()
        .filter(|item| {
            let event = item.event();
            category.admits(event.category) && matches_query(event, query)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn event(title: &str, description: &str, location: &str, category: Category, day: i64) -> Event {
        let date = Utc.with_ymd_and_hms(2030, 3, 1, 18, 0, 0).unwrap() + Duration::days(day);
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            location: location.to_string(),
            event_date: date,
            category,
            image_url: None,
            created_at: date,
            updated_at: date,
        }
    }

    fn sample() -> Vec<Event> {
        vec![
            event("Tech Meetup", "Talks about compilers", "Berlin", Category::Meetup, 0),
            event("Bake Off", "Friendly cake contest", "Tech Park Hall", Category::Social, 1),
            event("Rust Workshop", "Hands-on ownership", "Online", Category::Workshop, 2),
            event("Garden Party", "Bring snacks", "Rooftop", Category::Social, 3),
        ]
    }

    #[test]
    fn test_empty_query_and_all_is_identity() {
        let events = sample();
        assert_eq!(filter_events(&events, "", CategoryFilter::All), events);
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let events = sample();
        let found = filter_events(&events, "TECH", CategoryFilter::All);
        let titles: Vec<_> = found.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Tech Meetup", "Bake Off"]);
    }

    #[test]
    fn test_query_matches_description_or_location() {
        let events = sample();
        assert_eq!(
            filter_events(&events, "ownership", CategoryFilter::All)[0].title,
            "Rust Workshop"
        );
        assert_eq!(
            filter_events(&events, "rooftop", CategoryFilter::All)[0].title,
            "Garden Party"
        );
    }

    #[test]
    fn test_query_and_category_combine() {
        let events = sample();
        let found = filter_events(&events, "tech", CategoryFilter::Only(Category::Social));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Bake Off");

        let socials = filter_events(&events, "", CategoryFilter::Only(Category::Social));
        let titles: Vec<_> = socials.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Bake Off", "Garden Party"]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let events = sample();
        let category = CategoryFilter::Only(Category::Social);
        let once = filter_events(&events, "a", category);
        let twice = filter_events(&once, "a", category);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_match_yields_empty() {
        assert!(filter_events(&sample(), "quantum", CategoryFilter::All).is_empty());
    }

    #[test]
    fn test_category_filter_parsing() {
        assert_eq!("all".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!(
            "Webinar".parse::<CategoryFilter>(),
            Ok(CategoryFilter::Only(Category::Webinar))
        );
        assert!("everything".parse::<CategoryFilter>().is_err());
        assert_eq!(CategoryFilter::options().len(), 8);
        assert_eq!(CategoryFilter::default().to_string(), "all");
    }
}
