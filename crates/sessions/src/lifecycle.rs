//! Session reset lifecycle — pure idle timeout.
//!
//! This system has one channel (the VTT link) and no per-channel override
//! table: a session is stale exactly when it has sat idle past the
//! configured timeout.

use chrono::{DateTime, Utc};

/// The lifecycle manager evaluates whether a session has gone idle.
pub struct LifecycleManager {
    idle_timeout_minutes: u64,
}

impl LifecycleManager {
    pub fn new(idle_timeout_minutes: u64) -> Self {
        Self { idle_timeout_minutes }
    }

    pub fn is_expired(&self, last_activity_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(last_activity_at).num_minutes();
        elapsed >= self.idle_timeout_minutes as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_not_expired() {
        let mgr = LifecycleManager::new(30);
        assert!(!mgr.is_expired(Utc::now(), Utc::now()));
    }

    #[test]
    fn idle_past_timeout_is_expired() {
        let mgr = LifecycleManager::new(30);
        let last = Utc::now() - chrono::Duration::minutes(45);
        assert!(mgr.is_expired(last, Utc::now()));
    }

    #[test]
    fn idle_just_under_timeout_is_not_expired() {
        let mgr = LifecycleManager::new(30);
        let last = Utc::now() - chrono::Duration::minutes(10);
        assert!(!mgr.is_expired(last, Utc::now()));
    }
}
