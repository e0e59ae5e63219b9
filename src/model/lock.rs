use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Ephemeral claim of a node by one editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub node_id: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    /// End of the lease unless renewed by a heartbeat.
    pub expires_at: DateTime<Utc>,
}

impl Lock {
    pub fn new(node_id: impl Into<String>, holder: impl Into<String>, lease: Duration) -> Self {
        let acquired_at = Utc::now();
        Self {
            node_id: node_id.into(),
            holder: holder.into(),
            acquired_at,
            expires_at: acquired_at + lease,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Ordering used to settle competing claims: the earliest claim wins,
    /// ties go to the smaller holder id.
    pub fn precedes(&self, other: &Lock) -> bool {
        (self.acquired_at, &self.holder) < (other.acquired_at, &other.holder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earliest_claim_precedes() {
        let now = Utc::now();
        let early = Lock {
            node_id: "n".into(),
            holder: "zoe".into(),
            acquired_at: now,
            expires_at: now + Duration::seconds(30),
        };
        let late = Lock {
            node_id: "n".into(),
            holder: "adam".into(),
            acquired_at: now + Duration::milliseconds(5),
            expires_at: now + Duration::seconds(30),
        };
        assert!(early.precedes(&late));
        assert!(!late.precedes(&early));
    }

    #[test]
    fn test_tie_goes_to_smaller_holder() {
        let now = Utc::now();
        let a = Lock {
            node_id: "n".into(),
            holder: "alice".into(),
            acquired_at: now,
            expires_at: now + Duration::seconds(30),
        };
        let b = Lock {
            holder: "bob".into(),
            ..a.clone()
        };
        assert!(a.precedes(&b));
        assert!(!b.precedes(&a));
    }

    #[test]
    fn test_lease_expiry() {
        let lock = Lock::new("n", "alice", Duration::seconds(10));
        assert!(!lock.is_expired_at(lock.acquired_at + Duration::seconds(9)));
        assert!(lock.is_expired_at(lock.expires_at));
    }
}
