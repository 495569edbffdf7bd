//! Declarative registration of entities for the external admin CRUD
//! interface.
//!
//! These registrations are pure metadata: the admin collaborator reads the
//! field lists to build its list/edit screens, and nothing here carries
//! behavior of its own.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminRegistration {
    pub entity: &'static str,
    pub list_display: &'static [&'static str],
}

const REGISTRATIONS: &[AdminRegistration] = &[
    AdminRegistration {
        entity: "Post",
        list_display: &["title", "author", "published_at"],
    },
    AdminRegistration {
        entity: "Tag",
        list_display: &["title"],
    },
    AdminRegistration {
        entity: "Comment",
        list_display: &["post", "author", "published_at"],
    },
];

pub fn registrations() -> &'static [AdminRegistration] {
    REGISTRATIONS
}
