//! View-model builders. Nothing here touches the store.

pub mod card;
pub mod links;
pub mod navbar;

pub use card::{attendees_label, cards, EventCard};
pub use links::{calendar_link, share_link, ShareLink};
pub use navbar::Navbar;
