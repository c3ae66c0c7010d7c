pub mod event;
pub mod rsvp;

pub use event::{Category, Event, EventFields, UnknownCategory};
pub use rsvp::Rsvp;
