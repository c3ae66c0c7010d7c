use serde::Serialize;

use crate::identity::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navbar {
    pub brand: &'static str,
    pub signed_in: bool,
    pub items: Vec<NavItem>,
}

impl Navbar {
    pub fn for_viewer(session: Option<&Session>) -> Self {
        let mut items = vec![NavItem {
            label: "Events",
            href: "/events",
        }];
        match session {
            Some(_) => items.extend([
                NavItem {
                    label: "Dashboard",
                    href: "/dashboard",
                },
                NavItem {
                    label: "Create Event",
                    href: "/create-event",
                },
                NavItem {
                    label: "Sign out",
                    href: "/auth/sign-out",
                },
            ]),
            None => items.push(NavItem {
                label: "Sign in",
                href: "/auth",
            }),
        }

        Self {
            brand: "Evently",
            signed_in: session.is_some(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_anonymous_navbar_offers_sign_in() {
        let nav = Navbar::for_viewer(None);
        assert!(!nav.signed_in);
        let labels: Vec<_> = nav.items.iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["Events", "Sign in"]);
    }

    #[test]
    fn test_signed_in_navbar_offers_dashboard() {
        let session = Session {
            user_id: Uuid::new_v4(),
            token: "t".to_string(),
            issued_at: Utc::now(),
        };
        let nav = Navbar::for_viewer(Some(&session));
        assert!(nav.signed_in);
        let labels: Vec<_> = nav.items.iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["Events", "Dashboard", "Create Event", "Sign out"]);
    }
}
