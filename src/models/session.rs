use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::user::SessionUser;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Client-persisted proof of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: SessionUser,
    pub login_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: SessionUser, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            user,
            login_time: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
