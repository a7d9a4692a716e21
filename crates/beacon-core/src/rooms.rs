//! Room naming for the pub/sub channel space.
//!
//! A room is an opaque string key that partitions the broker's channel space:
//! independently-running producers and consumers agree on a channel purely by
//! computing the same name. All functions here are pure and deterministic —
//! identical inputs always yield byte-identical room strings.
//!
//! Malformed inputs (empty ids) still produce syntactically valid, merely
//! less-useful rooms; callers are responsible for supplying real ids.

/// Room for all subscribers of a doctype's list views.
pub fn doctype_room(site: &str, doctype: &str) -> String {
    format!("{site}:doctype:{doctype}")
}

/// Room for subscribers of a single document.
pub fn doc_room(site: &str, doctype: &str, docname: &str) -> String {
    format!("{site}:doc:{doctype}/{docname}")
}

/// Room for a specific user's sessions.
pub fn user_room(site: &str, user: &str) -> String {
    format!("{site}:user:{user}")
}

/// Room for progress updates of one background task.
pub fn task_progress_room(site: &str, task_id: &str) -> String {
    format!("{site}:task_progress:{task_id}")
}

/// Site-wide broadcast room (all desk users).
pub fn site_room(site: &str) -> String {
    format!("{site}:all")
}

/// Room for website (guest-facing) subscribers.
pub fn website_room(site: &str) -> String {
    format!("{site}:website")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_formats() {
        assert_eq!(doctype_room("site1", "Note"), "site1:doctype:Note");
        assert_eq!(doc_room("site1", "Note", "abc"), "site1:doc:Note/abc");
        assert_eq!(user_room("site1", "alice"), "site1:user:alice");
        assert_eq!(
            task_progress_room("site1", "t-9"),
            "site1:task_progress:t-9"
        );
        assert_eq!(site_room("site1"), "site1:all");
        assert_eq!(website_room("site1"), "site1:website");
    }

    #[test]
    fn test_room_naming_is_deterministic() {
        assert_eq!(
            doc_room("site1", "Note", "abc"),
            doc_room("site1", "Note", "abc")
        );
        assert_eq!(user_room("site1", "u"), user_room("site1", "u"));
    }

    #[test]
    fn test_empty_ids_still_valid() {
        // Less useful, but syntactically valid — the caller owns input quality.
        assert_eq!(doctype_room("site1", ""), "site1:doctype:");
        assert_eq!(doc_room("site1", "", ""), "site1:doc:/");
    }

    #[test]
    fn test_rooms_partition_by_site() {
        assert_ne!(site_room("site1"), site_room("site2"));
        assert_ne!(
            task_progress_room("site1", "t1"),
            task_progress_room("site2", "t1")
        );
    }
}
