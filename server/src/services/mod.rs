pub mod attendance;
pub mod filter;
pub mod lifecycle;

pub use attendance::{Attendance, EnrichedEvent, ToggleOutcome};
pub use filter::{filter_events, CategoryFilter};
pub use lifecycle::{EventForm, EventLifecycle, Redirect};
