//! Active-user presence tracking.
//!
//! Maps a user identity to its last heartbeat. Expiry is computed lazily on
//! read: a lapsed entry is simply excluded from the active set, no reaper
//! thread involved. The only consumer is the per-event roster push.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Recency threshold, in seconds, for counting a user as active.
pub const ACTIVE_WINDOW_SECS: i64 = 30;

#[derive(Default)]
pub struct PresenceTracker {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heartbeat. Concurrent sessions of one user collapse into a
    /// single entry, last heartbeat wins.
    pub fn heartbeat(&self, user: &str, now: DateTime<Utc>) {
        self.entries.write().insert(user.to_string(), now);
    }

    /// Drop the entry unconditionally. Returns whether it existed, so callers
    /// can skip the roster broadcast when nothing changed.
    pub fn remove(&self, user: &str) -> bool {
        self.entries.write().remove(user).is_some()
    }

    /// Every identity whose last heartbeat is within the active window of
    /// `now`. Sorted for deterministic output; the count clients display is
    /// the length of this list.
    pub fn active_users(&self, now: DateTime<Utc>) -> Vec<String> {
        let window = Duration::seconds(ACTIVE_WINDOW_SECS);
        let mut users: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, last)| now.signed_duration_since(**last) < window)
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        users
    }
}
